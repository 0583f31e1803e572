// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Plugin/Control Surface
 * Emulated ActiveX-like controls keyed by classid/progid
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::ControlError;
use crate::logging::EventSink;
use crate::navigator::Navigator;

pub mod aol_icq;
pub mod enjoy_sap;
pub mod office_ocx;
pub mod sina_dloader;
pub mod symantec_appstream;
pub mod vsm_ide;

pub use aol_icq::AolIcq;
pub use enjoy_sap::EnjoySap;
pub use office_ocx::OfficeOcx;
pub use sina_dloader::SinaDLoader;
pub use symantec_appstream::SymantecAppStream;
pub use vsm_ide::VsmIde;

/// Collaborators available to a control method invocation. Instantiating a
/// control never touches the network; invoking a method may.
pub struct ControlHost {
    /// URL of the page that instantiated the control.
    pub page_url: String,
    pub navigator: Arc<dyn Navigator>,
    pub sink: Arc<dyn EventSink>,
}

/// One emulated vulnerable control: a name plus a fixed method set. Method
/// invocations log structured exploit events and may fetch caller-supplied
/// URLs through the host.
#[async_trait]
pub trait VulnerableControl: Send + Sync {
    fn name(&self) -> &'static str;

    /// The emulated API surface.
    fn methods(&self) -> &'static [&'static str];

    async fn invoke(
        &self,
        host: &ControlHost,
        method: &str,
        args: &[String],
    ) -> Result<(), ControlError>;
}

/// A control bound into a browsing context under a document-supplied id.
pub struct ControlInstance {
    pub identifier: String,
    control: Box<dyn VulnerableControl>,
}

impl ControlInstance {
    pub fn name(&self) -> &'static str {
        self.control.name()
    }

    pub fn methods(&self) -> &'static [&'static str] {
        self.control.methods()
    }

    pub async fn invoke(
        &self,
        host: &ControlHost,
        method: &str,
        args: &[String],
    ) -> Result<(), ControlError> {
        if !self.control.methods().contains(&method) {
            return Err(ControlError::UnknownMethod {
                control: self.control.name().to_string(),
                method: method.to_string(),
            });
        }
        self.control.invoke(host, method, args).await
    }
}

pub type ControlCtor = fn() -> Box<dyn VulnerableControl>;

/// Maps normalized control identifiers (classids and progids) to control
/// constructors. Unknown identifiers yield a non-fatal instantiation
/// failure: the caller proceeds without binding.
pub struct ControlRegistry {
    controls: HashMap<String, ControlCtor>,
}

impl ControlRegistry {
    pub fn empty() -> Self {
        Self {
            controls: HashMap::new(),
        }
    }

    /// Registry pre-populated with the built-in catalog.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for (ids, ctor) in [
            sina_dloader::IDENTIFIERS,
            enjoy_sap::IDENTIFIERS,
            office_ocx::IDENTIFIERS,
            aol_icq::IDENTIFIERS,
            symantec_appstream::IDENTIFIERS,
            vsm_ide::IDENTIFIERS,
        ] {
            for id in ids {
                registry.register(id, ctor);
            }
        }
        registry
    }

    /// Register a control under an identifier. Open for extension: embedders
    /// add their own leaves the same way the built-ins are added.
    pub fn register(&mut self, identifier: &str, ctor: ControlCtor) {
        self.controls.insert(normalize_identifier(identifier), ctor);
    }

    /// Resolve an identifier to a fresh control instance.
    pub fn instantiate(&self, identifier: &str) -> Result<ControlInstance, ControlError> {
        let normalized = normalize_identifier(identifier);
        let ctor = self
            .controls
            .get(&normalized)
            .ok_or_else(|| ControlError::UnknownIdentifier(identifier.to_string()))?;
        Ok(ControlInstance {
            identifier: normalized,
            control: ctor(),
        })
    }
}

impl Default for ControlRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Classids arrive in many shapes: `clsid:...`, brace-wrapped, mixed case.
fn normalize_identifier(identifier: &str) -> String {
    identifier
        .trim()
        .trim_start_matches("clsid:")
        .trim_start_matches("CLSID:")
        .trim_matches(|c| c == '{' || c == '}')
        .to_ascii_lowercase()
}

/// Shared helper for the common "fetch attacker-supplied URL, warn on
/// failure" leaf shape.
pub(crate) async fn fetch_exploit_url(host: &ControlHost, module: &str, url: &str, kind: &str) {
    use crate::navigator::FetchOptions;
    use crate::types::AnalysisMethod;

    match host
        .navigator
        .fetch(&host.page_url, url, FetchOptions::kind(kind))
        .await
    {
        Ok(response) if response.is_not_found() => {
            host.sink.add_behavior_warning(
                &format!("[{}] FileNotFoundError: {}", module, url),
                None,
                AnalysisMethod::DynamicAnalysis,
            );
        }
        Ok(_) => {}
        Err(_) => {
            host.sink.add_behavior_warning(
                &format!("[{}] Fetch failed", module),
                None,
                AnalysisMethod::DynamicAnalysis,
            );
        }
    }
}

pub(crate) fn first_arg<'a>(
    control: &str,
    method: &str,
    args: &'a [String],
) -> Result<&'a str, ControlError> {
    args.first().map(String::as_str).ok_or_else(|| {
        ControlError::MissingArgument {
            control: control.to_string(),
            method: method.to_string(),
            expected: 1,
        }
    })
}
