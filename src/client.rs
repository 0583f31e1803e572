// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Honeyclient
 * Top-level analysis entry point and collaborator wiring
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::sync::Arc;

use anyhow::Context as _;
use tracing::{info, warn};

use crate::config::AnalysisOptions;
use crate::controls::ControlRegistry;
use crate::engine::{BrowsingContext, Collaborators, ContextEngine, RunState};
use crate::errors::SetupError;
use crate::handlers::MimeHandlerRegistry;
use crate::logging::{EventSink, TraceSink};
use crate::navigator::{FetchOptions, HttpNavigator, Navigator};
use crate::parser::{DomParser, HtmlDomParser};
use crate::personality::Personality;
use crate::script::{NullScriptEngine, ScriptEngine, VbsTranspiler};
use crate::shellcode::{CpuEmulator, NullEmulator};

/// The low-interaction honeyclient. Wires a personality, an event sink and
/// the collaborator set together and drives one analysis run per URL.
///
/// Collaborators default to the passive implementations; embedders swap in
/// real script engines or CPU emulators through the `with_*` methods.
pub struct Honeyclient {
    deps: Collaborators,
    personality: Arc<Personality>,
}

impl Honeyclient {
    /// Build a client reporting through the `tracing` subscriber.
    pub fn new(personality: Personality, options: AnalysisOptions) -> Result<Self, SetupError> {
        Self::with_sink(personality, options, Arc::new(TraceSink))
    }

    /// Build a client reporting into the given sink.
    pub fn with_sink(
        personality: Personality,
        options: AnalysisOptions,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, SetupError> {
        let personality = Arc::new(personality);
        let navigator = Arc::new(HttpNavigator::new(
            Arc::clone(&personality),
            Arc::clone(&sink),
            options.fetch_timeout_secs,
        )?);

        let deps = Collaborators {
            navigator,
            parser: Arc::new(HtmlDomParser::new()),
            script: Arc::new(NullScriptEngine::new()),
            emulator: Arc::new(NullEmulator),
            sink,
            controls: Arc::new(ControlRegistry::with_defaults()),
            mime_handlers: Arc::new(MimeHandlerRegistry::new()),
            vbs_transpiler: None,
            options: Arc::new(options),
        };

        Ok(Self { deps, personality })
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.deps.navigator = navigator;
        self
    }

    pub fn with_script_engine(mut self, engine: Arc<dyn ScriptEngine>) -> Self {
        self.deps.script = engine;
        self
    }

    pub fn with_emulator(mut self, emulator: Arc<dyn CpuEmulator>) -> Self {
        self.deps.emulator = emulator;
        self
    }

    pub fn with_vbs_transpiler(mut self, transpiler: Arc<dyn VbsTranspiler>) -> Self {
        self.deps.vbs_transpiler = Some(transpiler);
        self
    }

    pub fn with_controls(mut self, controls: ControlRegistry) -> Self {
        self.deps.controls = Arc::new(controls);
        self
    }

    pub fn with_mime_handlers(mut self, handlers: MimeHandlerRegistry) -> Self {
        self.deps.mime_handlers = Arc::new(handlers);
        self
    }

    pub fn personality(&self) -> &Personality {
        &self.personality
    }

    /// Fetch and analyze one URL to completion, including every navigation
    /// branch the page forks.
    pub async fn analyze_url(&self, url: &str) -> anyhow::Result<()> {
        info!(url, personality = %self.personality.id, "starting analysis");

        let response = self
            .deps
            .navigator
            .fetch(url, url, FetchOptions::kind("initial"))
            .await
            .with_context(|| format!("fetching {}", url))?;
        if response.is_not_found() {
            anyhow::bail!("initial page not found: {}", url);
        }

        let final_url = response.final_url.clone();
        self.analyze_response(&final_url, &response.text()).await
    }

    /// Analyze an already-retrieved document as if fetched from `url`.
    pub async fn analyze_response(&self, url: &str, body: &str) -> anyhow::Result<()> {
        let run = Arc::new(RunState::new());
        let document = self.deps.parser.parse(body);
        let context =
            BrowsingContext::new(url.to_string(), document, Arc::clone(&self.personality));

        ContextEngine::new(self.deps.clone(), Arc::clone(&run), context, 0)
            .run()
            .await;

        // Branches may fork further branches while being joined.
        loop {
            let branches = run.take_branches();
            if branches.is_empty() {
                break;
            }
            for result in futures::future::join_all(branches).await {
                if let Err(e) = result {
                    warn!("navigation branch failed: {}", e);
                }
            }
        }

        info!(url, "analysis finished");
        Ok(())
    }
}
