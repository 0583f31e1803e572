// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - VsmIDE DTE Control
 * Visual Studio automation object CreateObject emulation
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use async_trait::async_trait;
use serde_json::json;

use super::{first_arg, ControlCtor, ControlHost, VulnerableControl};
use crate::errors::ControlError;
use crate::types::AnalysisMethod;

const MODULE: &str = "VsmIDE.DTE ActiveX";

pub const IDENTIFIERS: (&[&str], ControlCtor) = (&["VsmIDE.DTE"], || Box::new(VsmIde));

/// Visual Studio `VsmIDE.DTE` automation object. Its `CreateObject` method
/// hands a page arbitrary further automation objects; the requested progid
/// is what matters for analysis.
pub struct VsmIde;

#[async_trait]
impl VulnerableControl for VsmIde {
    fn name(&self) -> &'static str {
        "VsmIDE.DTE"
    }

    fn methods(&self) -> &'static [&'static str] {
        &["CreateObject"]
    }

    async fn invoke(
        &self,
        host: &ControlHost,
        method: &str,
        args: &[String],
    ) -> Result<(), ControlError> {
        let object = first_arg(self.name(), method, args)?;

        host.sink.add_behavior_warning(
            &format!("[{}] CreateObject ({})", MODULE, object),
            None,
            AnalysisMethod::DynamicAnalysis,
        );
        host.sink.log_exploit_event(
            &host.page_url,
            MODULE,
            "CreateObject",
            None,
            Some(json!({ "object": object })),
            false,
        );

        Ok(())
    }
}
