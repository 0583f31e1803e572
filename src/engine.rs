// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Context Engine
 * Per-browsing-context orchestration of the analysis passes
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::AnalysisOptions;
use crate::controls::{ControlInstance, ControlRegistry};
use crate::dom::{Document, ListenerHook, NodeId};
use crate::errors::EvalError;
use crate::events::{is_window_event, EventRegistry, SyntheticEvent};
use crate::handlers::{MimeHandlerRegistry, TagHandler};
use crate::logging::EventSink;
use crate::navigator::Navigator;
use crate::parser::DomParser;
use crate::personality::Personality;
use crate::script::{HandlerRef, ScriptContext, ScriptEngine, VbsTranspiler};
use crate::shellcode::CpuEmulator;

/// A browsing context spawned for a frame carrying a document-supplied id:
/// the URL it was opened on and the run-unique id of the context engine
/// that ran it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRef {
    pub url: String,
    pub context: u64,
}

/// Run-scoped shared state, threaded through every nested context of one
/// analysis run. Execution is single-threaded apart from the documented
/// anchor-branch fork point, so the mutexes only arbitrate that seam.
pub struct RunState {
    visited_urls: Mutex<HashSet<String>>,
    shellcodes: Mutex<Vec<String>>,
    meta_visits: Mutex<HashMap<String, u32>>,
    windows: Mutex<HashMap<String, WindowRef>>,
    branches: Arc<Mutex<Vec<JoinHandle<()>>>>,
    next_context: AtomicU64,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            visited_urls: Mutex::new(HashSet::new()),
            shellcodes: Mutex::new(Vec::new()),
            meta_visits: Mutex::new(HashMap::new()),
            windows: Mutex::new(HashMap::new()),
            branches: Arc::new(Mutex::new(Vec::new())),
            next_context: AtomicU64::new(0),
        }
    }

    /// Fork for a concurrent navigation branch: the child sees a snapshot of
    /// the visited set but its writes do not propagate back. The branch
    /// ledger stays shared so the top-level run can join everything.
    pub fn fork(&self) -> Self {
        Self {
            visited_urls: Mutex::new(self.visited_urls.lock().expect("run state poisoned").clone()),
            shellcodes: Mutex::new(Vec::new()),
            meta_visits: Mutex::new(HashMap::new()),
            windows: Mutex::new(HashMap::new()),
            branches: Arc::clone(&self.branches),
            next_context: AtomicU64::new(0),
        }
    }

    /// Run-unique id for a freshly constructed context engine.
    pub fn allocate_context_id(&self) -> u64 {
        self.next_context.fetch_add(1, Ordering::Relaxed)
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited_urls.lock().expect("run state poisoned").contains(url)
    }

    pub fn mark_visited(&self, url: &str) -> bool {
        self.visited_urls
            .lock()
            .expect("run state poisoned")
            .insert(url.to_string())
    }

    /// Queue a captured eval-like code fragment for the shellcode sweep.
    pub fn push_shellcode(&self, fragment: &str) {
        self.shellcodes
            .lock()
            .expect("run state poisoned")
            .push(fragment.to_string());
    }

    pub fn pop_shellcode(&self) -> Option<String> {
        self.shellcodes.lock().expect("run state poisoned").pop()
    }

    pub fn meta_revisits(&self, url: &str) -> u32 {
        self.meta_visits
            .lock()
            .expect("run state poisoned")
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    pub fn record_meta_visit(&self, url: &str) {
        *self
            .meta_visits
            .lock()
            .expect("run state poisoned")
            .entry(url.to_string())
            .or_insert(0) += 1;
    }

    /// Register a spawned frame context under its element id.
    pub fn register_window(&self, id: &str, window: WindowRef) {
        self.windows
            .lock()
            .expect("run state poisoned")
            .insert(id.to_string(), window);
    }

    pub fn window(&self, id: &str) -> Option<WindowRef> {
        self.windows.lock().expect("run state poisoned").get(id).cloned()
    }

    pub fn add_branch(&self, handle: JoinHandle<()>) {
        self.branches.lock().expect("run state poisoned").push(handle);
    }

    /// Drain the branch ledger. Branches may spawn further branches, so
    /// joining loops until this comes back empty.
    pub fn take_branches(&self) -> Vec<JoinHandle<()>> {
        std::mem::take(&mut *self.branches.lock().expect("run state poisoned"))
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

/// The collaborator bundle every engine instance works against. Cloning is
/// cheap: everything is reference-counted.
#[derive(Clone)]
pub struct Collaborators {
    pub navigator: Arc<dyn Navigator>,
    pub parser: Arc<dyn DomParser>,
    pub script: Arc<dyn ScriptEngine>,
    pub emulator: Arc<dyn CpuEmulator>,
    pub sink: Arc<dyn EventSink>,
    pub controls: Arc<ControlRegistry>,
    pub mime_handlers: Arc<MimeHandlerRegistry>,
    pub vbs_transpiler: Option<Arc<dyn VbsTranspiler>>,
    pub options: Arc<AnalysisOptions>,
}

/// One emulated page/frame: URL, document, personality, and the window- and
/// document-scoped bindings scripts and attributes install on it.
pub struct BrowsingContext {
    pub url: String,
    pub document: Document,
    pub personality: Arc<Personality>,
    /// Window-scoped `on*` handlers (body-level attributes route here).
    pub window_handlers: HashMap<String, HandlerRef>,
    /// Document-scoped `on*` handlers.
    pub document_handlers: HashMap<String, HandlerRef>,
    /// Runtime listeners registered on the document itself.
    pub document_listeners: Vec<ListenerHook>,
    /// Controls bound under document-supplied ids, visible on the window
    /// namespace.
    pub window_controls: HashMap<String, Arc<ControlInstance>>,
    /// The same bindings, visible on the document namespace.
    pub document_controls: HashMap<String, Arc<ControlInstance>>,
}

impl BrowsingContext {
    pub fn new(url: String, document: Document, personality: Arc<Personality>) -> Self {
        Self {
            url,
            document,
            personality,
            window_handlers: HashMap::new(),
            document_handlers: HashMap::new(),
            document_listeners: Vec::new(),
            window_controls: HashMap::new(),
            document_controls: HashMap::new(),
        }
    }
}

/// Drives the fixed analysis-pass order over one browsing context. Each
/// navigation constructs a fresh engine; run-scoped state travels through
/// the shared [`RunState`].
pub struct ContextEngine {
    pub(crate) deps: Collaborators,
    pub(crate) run: Arc<RunState>,
    pub(crate) context: BrowsingContext,
    pub(crate) registry: EventRegistry,
    /// Anchors queued for later click resolution, in document order.
    pub(crate) anchors: Vec<NodeId>,
    /// Nodes already statically handled this run.
    pub(crate) analyzed: HashSet<NodeId>,
    /// Script-driven location changes awaiting navigation.
    pub(crate) pending_locations: Vec<String>,
    /// The `window.event` slot for the legacy-IE calling convention.
    pub(crate) event_global: Option<SyntheticEvent>,
    pub(crate) depth: u32,
    /// Run-unique id, recorded in the windows map for spawned frames.
    pub(crate) context_id: u64,
}

impl ContextEngine {
    pub fn new(
        deps: Collaborators,
        run: Arc<RunState>,
        context: BrowsingContext,
        depth: u32,
    ) -> Self {
        let registry = EventRegistry::configure(&deps.options.events);
        let context_id = run.allocate_context_id();
        Self {
            deps,
            run,
            context,
            registry,
            anchors: Vec::new(),
            analyzed: HashSet::new(),
            pending_locations: Vec::new(),
            event_global: None,
            depth,
            context_id,
        }
    }

    /// Run the context to completion. All results land in the sink.
    pub async fn run(mut self) {
        self.run_passes().await;
        self.check_shellcodes().await;
    }

    /// Boxed entry point used by every recursive navigation.
    pub fn run_boxed(self) -> BoxFuture<'static, ()> {
        Box::pin(self.run())
    }

    async fn run_passes(&mut self) {
        debug!(url = %self.context.url, depth = self.depth, "analyzing browsing context");

        // Plugins are resolved before general traversal, regardless of tree
        // position: scripts probe for them by id immediately.
        for node in self.context.document.elements_by_tag("object") {
            self.analyzed.insert(node);
            self.handle_object(node).await;
        }
        for node in self.context.document.elements_by_tag("applet") {
            self.analyzed.insert(node);
            self.handle_applet(node).await;
        }

        // Static pass over the live tree. Script execution may grow or
        // shrink the document at any point; newly created nodes are swept
        // up by the watermark rescan below, nodes the traversal itself has
        // not reached yet are picked up as the walk continues.
        let mut visited: HashSet<NodeId> = HashSet::new();
        loop {
            let next = self
                .context
                .document
                .elements()
                .into_iter()
                .find(|n| !visited.contains(n));
            let Some(node) = next else {
                break;
            };
            visited.insert(node);

            self.set_event_handler_attributes(node);

            let mark = self.context.document.watermark();
            if !self.do_handle(node, true).await {
                continue;
            }

            // Mutation rescan: statically handle every node created since
            // the pre-dispatch watermark, repeating until a fixpoint.
            let mut rescanned: HashSet<NodeId> = HashSet::new();
            loop {
                let fresh: Vec<NodeId> = self
                    .context
                    .document
                    .elements_since(mark)
                    .into_iter()
                    .filter(|n| !rescanned.contains(n))
                    .collect();
                if fresh.is_empty() {
                    break;
                }
                for n in fresh {
                    rescanned.insert(n);
                    visited.insert(n);
                    self.set_event_handler_attributes(n);
                    self.do_handle(n, false).await;
                }
            }
        }

        // Listener attachment pass.
        for node in self.context.document.elements() {
            self.set_event_listeners(node);
        }

        // Window-, document-, then element-scoped dispatch.
        self.dispatch_events();

        // Handlers may have queued navigations of their own.
        self.drain_pending_locations().await;
        self.check_anchors().await;
    }

    /// Static handling of one element through the tag dispatch table.
    /// Returns true when a handler ran. Every node is statically handled at
    /// most once per run.
    pub(crate) async fn do_handle(&mut self, node: NodeId, skip_plugins: bool) -> bool {
        let Some(tag) = self.context.document.tag(node).map(str::to_string) else {
            return false;
        };
        if skip_plugins && matches!(tag.as_str(), "object" | "applet") {
            return false;
        }
        if self.analyzed.contains(&node) {
            return false;
        }

        let handler = TagHandler::resolve(&tag);
        if handler == TagHandler::NoOp {
            return false;
        }

        self.analyzed.insert(node);
        self.dispatch_tag(handler, node).await;
        true
    }

    /// Compile `on*` attributes into handlers. A `language` attribute other
    /// than `javascript` disables attribute handlers on the element.
    pub(crate) fn set_event_handler_attributes(&mut self, node: NodeId) {
        if let Some(language) = self.context.document.attr(node, "language") {
            if !language.eq_ignore_ascii_case("javascript") {
                return;
            }
        }

        let attrs: Vec<(String, String)> = self.context.document.attrs(node).to_vec();
        for (name, value) in attrs {
            let name = name.to_ascii_lowercase();
            if self.registry.honors_on(&name) {
                self.attach_event(node, &name, &value);
            }
        }
    }

    /// Compile and attach one handler. Body-level window events are routed
    /// to the window handler slots; everything else lands on the element.
    pub(crate) fn attach_event(&mut self, node: NodeId, on_event: &str, source: &str) {
        let handler = match self.build_event_handler(source) {
            Ok(h) => h,
            Err(e) => {
                warn!("failed to compile {} handler: {}", on_event, e);
                return;
            }
        };

        let is_body = self
            .context
            .document
            .tag(node)
            .is_some_and(|t| t == "body");
        if is_body && is_window_event(&on_event[2..]) {
            self.context
                .window_handlers
                .insert(on_event.to_string(), handler);
            return;
        }

        self.context
            .document
            .node_mut(node)
            .handlers
            .push((on_event.to_string(), handler));
    }

    /// Convert an attribute string into a function the way browsers do:
    /// IE builds a zero-argument function reading `window.event`, everyone
    /// else builds a single-argument function named `event`.
    pub(crate) fn build_event_handler(&mut self, body: &str) -> Result<HandlerRef, EvalError> {
        let source = if self.context.personality.is_ie() {
            format!(
                "(function() {{ with(document) {{ with(this.form || {{}}) {{ with(this) {{ event = window.event; {} }} }} }} }})",
                body
            )
        } else {
            format!(
                "(function(event) {{ with(document) {{ with(this.form || {{}}) {{ with(this) {{ {} }} }} }} }})",
                body
            )
        };
        let engine = self.deps.script.clone();
        let mut ctx = self.script_context();
        engine.compile_handler(&mut ctx, &source)
    }

    /// Collect an element's compiled handlers and runtime listeners into
    /// the registry for the dispatch pass.
    pub(crate) fn set_event_listeners(&mut self, node: NodeId) {
        let handlers = self.context.document.node(node).handlers.clone();
        for (on_event, handler) in handlers {
            if self.registry.honors_on(&on_event) {
                self.registry
                    .attach_listener(node, &on_event[2..], handler, true);
            }
        }

        let listeners = self.context.document.node(node).listeners.clone();
        for hook in listeners {
            if self.registry.honors(&hook.event_type) {
                self.registry
                    .attach_listener(node, &hook.event_type, hook.handler, hook.capture);
            }
        }
    }

    /// Borrow the scoped evaluation environment for one script call.
    pub(crate) fn script_context(&mut self) -> ScriptContext<'_> {
        ScriptContext {
            document: &mut self.context.document,
            url: self.context.url.as_str(),
            personality: self.context.personality.as_ref(),
            run: &self.run,
            event: &mut self.event_global,
            pending_locations: &mut self.pending_locations,
            document_handlers: &mut self.context.document_handlers,
            document_listeners: &mut self.context.document_listeners,
            window_controls: &self.context.window_controls,
            document_controls: &self.context.document_controls,
        }
    }

    /// Evaluate script source, logging faults instead of propagating them,
    /// then process any navigations the script queued.
    pub(crate) async fn evaluate_script(&mut self, source: &str) {
        let engine = self.deps.script.clone();
        let mut ctx = self.script_context();
        if let Err(e) = engine.evaluate(&mut ctx, source) {
            warn!("script evaluation failed: {}", e);
        }
        drop(ctx);
        self.drain_pending_locations().await;
    }

    /// Evaluate without navigation processing, for engine-internal seeding.
    pub(crate) fn evaluate_quiet(&mut self, source: &str) {
        let engine = self.deps.script.clone();
        let mut ctx = self.script_context();
        if let Err(e) = engine.evaluate(&mut ctx, source) {
            debug!("seed evaluation failed: {}", e);
        }
    }

    pub(crate) async fn drain_pending_locations(&mut self) {
        while !self.pending_locations.is_empty() {
            let pending = std::mem::take(&mut self.pending_locations);
            for url in pending {
                self.location_change(&url).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fork_snapshots_visited_urls() {
        let run = RunState::new();
        run.mark_visited("http://a.example/");
        let fork = run.fork();

        assert!(fork.is_visited("http://a.example/"));
        fork.mark_visited("http://b.example/");
        assert!(!run.is_visited("http://b.example/"));
    }

    #[test]
    fn fork_starts_with_empty_queues() {
        let run = RunState::new();
        run.push_shellcode("%u9090");
        run.record_meta_visit("http://a.example/");
        let fork = run.fork();

        assert!(fork.pop_shellcode().is_none());
        assert_eq!(fork.meta_revisits("http://a.example/"), 0);
        assert_eq!(run.meta_revisits("http://a.example/"), 1);
    }

    #[test]
    fn shellcode_queue_is_lifo() {
        let run = RunState::new();
        run.push_shellcode("first");
        run.push_shellcode("second");
        assert_eq!(run.pop_shellcode().as_deref(), Some("second"));
        assert_eq!(run.pop_shellcode().as_deref(), Some("first"));
        assert!(run.pop_shellcode().is_none());
    }

    #[test]
    fn windows_map_registers_frames() {
        let run = RunState::new();
        let context = run.allocate_context_id();
        run.register_window(
            "payload",
            WindowRef {
                url: "http://evil.example/frame".to_string(),
                context,
            },
        );

        let window = run.window("payload").unwrap();
        assert_eq!(window.url, "http://evil.example/frame");
        assert_eq!(window.context, context);
        assert!(run.window("missing").is_none());
    }
}
