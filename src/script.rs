// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Script Engine Seam
 * Evaluation context and the pluggable script-execution contract
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::controls::ControlInstance;
use crate::dom::{Document, ListenerHook};
use crate::engine::RunState;
use crate::errors::EvalError;
use crate::events::SyntheticEvent;
use crate::personality::Personality;

/// Opaque handle to a compiled event handler. The source is retained so
/// doubles and diagnostics can identify what a handle refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerRef {
    pub id: u64,
    pub source: String,
}

/// The scoped evaluation environment a script runs against. Borrowed from
/// the owning engine for the duration of one evaluate/invoke call; dropping
/// it releases the scope.
pub struct ScriptContext<'a> {
    pub document: &'a mut Document,
    /// URL of the page being analyzed.
    pub url: &'a str,
    pub personality: &'a Personality,
    pub run: &'a RunState,
    /// The `window.event` slot used by the legacy-IE calling convention.
    pub event: &'a mut Option<SyntheticEvent>,
    /// Script-driven location changes, drained by the engine right after
    /// evaluation returns (navigation is async, evaluation is not).
    pub pending_locations: &'a mut Vec<String>,
    /// Document-scoped `on*` handler slots (`document.onclick = f`).
    pub document_handlers: &'a mut HashMap<String, HandlerRef>,
    /// Runtime listeners registered on the document itself.
    pub document_listeners: &'a mut Vec<ListenerHook>,
    /// Controls bound under document-supplied ids, window namespace.
    pub window_controls: &'a HashMap<String, Arc<ControlInstance>>,
    /// The same bindings on the document namespace.
    pub document_controls: &'a HashMap<String, Arc<ControlInstance>>,
}

impl ScriptContext<'_> {
    /// Queue a captured eval-like fragment for the shellcode sweep.
    pub fn capture_code_fragment(&self, fragment: &str) {
        self.run.push_shellcode(fragment);
    }

    /// Queue a `location.href` style navigation.
    pub fn set_location(&mut self, url: &str) {
        self.pending_locations.push(url.to_string());
    }

    /// Assign a document-scoped handler slot, fired during the
    /// document-scoped dispatch pass.
    pub fn set_document_handler(&mut self, on_event: &str, handler: HandlerRef) {
        self.document_handlers
            .insert(on_event.to_string(), handler);
    }

    /// Register a runtime listener on the document itself.
    pub fn add_document_listener(&mut self, hook: ListenerHook) {
        self.document_listeners.push(hook);
    }

    /// Look up a control bound under a document-supplied id; the window
    /// namespace shadows the document namespace.
    pub fn control(&self, id: &str) -> Option<&Arc<ControlInstance>> {
        self.window_controls
            .get(id)
            .or_else(|| self.document_controls.get(id))
    }
}

/// Script execution collaborator. Evaluation is synchronous; faults
/// propagate as [`EvalError`] and are caught at the dispatch or
/// script-handler boundary.
pub trait ScriptEngine: Send + Sync {
    fn evaluate(&self, ctx: &mut ScriptContext<'_>, source: &str) -> Result<(), EvalError>;

    /// Compile an event-handler function body into an invokable handle.
    fn compile_handler(
        &self,
        ctx: &mut ScriptContext<'_>,
        source: &str,
    ) -> Result<HandlerRef, EvalError>;

    /// Invoke a compiled handler. `args` carries the synthesized event for
    /// modern personalities; legacy IE passes no arguments and publishes the
    /// event through `ctx.event` instead.
    fn invoke_handler(
        &self,
        ctx: &mut ScriptContext<'_>,
        handler: &HandlerRef,
        args: &[SyntheticEvent],
    ) -> Result<(), EvalError>;
}

/// Default engine: accepts every script without executing anything, so the
/// surrounding analysis (snippet capture, shellcode sweep, navigation
/// processing) still runs when no real interpreter is wired in.
#[derive(Debug, Default)]
pub struct NullScriptEngine {
    next_handler: AtomicU64,
}

impl NullScriptEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScriptEngine for NullScriptEngine {
    fn evaluate(&self, _ctx: &mut ScriptContext<'_>, source: &str) -> Result<(), EvalError> {
        debug!("null script engine: skipping evaluation ({} bytes)", source.len());
        Ok(())
    }

    fn compile_handler(
        &self,
        _ctx: &mut ScriptContext<'_>,
        source: &str,
    ) -> Result<HandlerRef, EvalError> {
        Ok(HandlerRef {
            id: self.next_handler.fetch_add(1, Ordering::Relaxed),
            source: source.to_string(),
        })
    }

    fn invoke_handler(
        &self,
        _ctx: &mut ScriptContext<'_>,
        handler: &HandlerRef,
        _args: &[SyntheticEvent],
    ) -> Result<(), EvalError> {
        debug!("null script engine: skipping handler {}", handler.id);
        Ok(())
    }
}

/// Optional VBScript-to-JavaScript transpiler hook. When absent, VBScript
/// content is logged and skipped.
pub trait VbsTranspiler: Send + Sync {
    fn transpile(&self, source: &str) -> Result<String, EvalError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_engine_compiles_distinct_handles() {
        let engine = NullScriptEngine::new();
        let mut doc = Document::new();
        let run = RunState::new();
        let mut event = None;
        let mut pending = Vec::new();
        let mut document_handlers = HashMap::new();
        let mut document_listeners = Vec::new();
        let window_controls = HashMap::new();
        let document_controls = HashMap::new();
        let personality = Personality::default();
        let mut ctx = ScriptContext {
            document: &mut doc,
            url: "http://example.test/",
            personality: &personality,
            run: &run,
            event: &mut event,
            pending_locations: &mut pending,
            document_handlers: &mut document_handlers,
            document_listeners: &mut document_listeners,
            window_controls: &window_controls,
            document_controls: &document_controls,
        };

        let a = engine.compile_handler(&mut ctx, "x=1").unwrap();
        let b = engine.compile_handler(&mut ctx, "x=1").unwrap();
        assert_ne!(a.id, b.id);
        assert!(engine.evaluate(&mut ctx, "anything").is_ok());
        assert!(engine.invoke_handler(&mut ctx, &a, &[]).is_ok());
    }
}
