// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Event Registry & Dispatch
 * Honored-event sequencing, listener records, personality-aware dispatch
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::dom::NodeId;
use crate::engine::ContextEngine;
use crate::errors::EvalError;
use crate::script::HandlerRef;

/// Event types directed at the browser as a whole rather than any document
/// element. In HTML they are placed on `<body>`, but the browser registers
/// them on the window (per the HTML5 draft list).
pub const WINDOW_EVENTS: &[&str] = &[
    "afterprint",
    "beforeprint",
    "beforeunload",
    "blur",
    "error",
    "focus",
    "hashchange",
    "load",
    "message",
    "offline",
    "online",
    "pagehide",
    "pageshow",
    "popstate",
    "redo",
    "resize",
    "storage",
    "undo",
    "unload",
];

pub const MOUSE_EVENT_TYPES: &[&str] = &[
    "click",
    "dblclick",
    "mousedown",
    "mouseup",
    "mouseover",
    "mousemove",
    "mouseout",
];

pub const HTML_EVENT_TYPES: &[&str] = &[
    "load", "unload", "abort", "error", "select", "change", "submit", "reset", "focus", "blur",
    "resize", "scroll",
];

pub fn is_window_event(event_type: &str) -> bool {
    WINDOW_EVENTS.contains(&event_type)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTarget {
    Window,
    Document,
    Element(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    AtTarget,
}

/// A synthesized DOM event, delivered either as the sole handler argument or
/// through the `event` context global depending on personality.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticEvent {
    pub event_type: String,
    pub target: EventTarget,
    pub current_target: EventTarget,
    pub phase: EventPhase,
}

/// Synthesize an event object for a type the emulation understands. Types
/// outside the mouse/HTML classes synthesize nothing and their dispatch is a
/// no-op.
pub fn synthesize_event(event_type: &str, target: EventTarget) -> Option<SyntheticEvent> {
    if MOUSE_EVENT_TYPES.contains(&event_type) || HTML_EVENT_TYPES.contains(&event_type) {
        Some(SyntheticEvent {
            event_type: event_type.to_string(),
            target,
            current_target: target,
            phase: EventPhase::AtTarget,
        })
    } else {
        None
    }
}

/// One registered element listener. Bounded by the engine run.
#[derive(Debug, Clone)]
pub struct ListenerRecord {
    pub element: NodeId,
    pub event_type: String,
    pub handler: HandlerRef,
    pub capture: bool,
}

/// Owns the honored-event sequence, element listener records, and the
/// dispatched-key idempotence guard for one engine run.
#[derive(Debug, Default)]
pub struct EventRegistry {
    handled_events: Vec<String>,
    listeners: Vec<ListenerRecord>,
    dispatched: HashSet<(NodeId, String)>,
}

impl EventRegistry {
    /// Fix the honored event types for a run: always `load` and `mousemove`
    /// first, in that order, followed by the configured extras. Order drives
    /// both duplicate suppression and dispatch order.
    pub fn configure(extra_events: &[String]) -> Self {
        let mut handled_events = vec!["load".to_string(), "mousemove".to_string()];
        for event in extra_events {
            if !handled_events.contains(event) {
                handled_events.push(event.clone());
            }
        }
        debug!("handling DOM events: {}", handled_events.join(","));
        Self {
            handled_events,
            listeners: Vec::new(),
            dispatched: HashSet::new(),
        }
    }

    pub fn handled_events(&self) -> &[String] {
        &self.handled_events
    }

    /// `on`-prefixed honored names, in honored order.
    pub fn handled_on_events(&self) -> Vec<String> {
        self.handled_events.iter().map(|e| format!("on{}", e)).collect()
    }

    pub fn honors(&self, event_type: &str) -> bool {
        self.handled_events.iter().any(|e| e == event_type)
    }

    pub fn honors_on(&self, on_event: &str) -> bool {
        on_event
            .strip_prefix("on")
            .is_some_and(|bare| self.honors(bare))
    }

    /// Register a listener. Duplicates are deliberately not collapsed here:
    /// browser semantics allow multiple handlers per (element, type).
    pub fn attach_listener(
        &mut self,
        element: NodeId,
        event_type: &str,
        handler: HandlerRef,
        capture: bool,
    ) {
        self.listeners.push(ListenerRecord {
            element,
            event_type: event_type.to_string(),
            handler,
            capture,
        });
    }

    pub fn listeners_for(&self, event_type: &str) -> Vec<ListenerRecord> {
        self.listeners
            .iter()
            .filter(|l| l.event_type == event_type)
            .cloned()
            .collect()
    }

    /// Idempotence guard: returns true the first time a key is dispatched.
    pub fn mark_dispatched(&mut self, element: NodeId, event_type: &str) -> bool {
        self.dispatched.insert((element, event_type.to_string()))
    }

    pub fn was_dispatched(&self, element: NodeId, event_type: &str) -> bool {
        self.dispatched.contains(&(element, event_type.to_string()))
    }
}

impl ContextEngine {
    /// Fire window-scoped handlers for one honored `on*` name.
    pub(crate) fn handle_window_event(&mut self, on_event: &str) -> Result<(), EvalError> {
        if !self.registry.honors_on(on_event) {
            return Ok(());
        }
        let Some(handler) = self.context.window_handlers.get(on_event).cloned() else {
            return Ok(());
        };
        let bare = &on_event[2..];
        let Some(event) = synthesize_event(bare, EventTarget::Window) else {
            return Ok(());
        };
        self.invoke_with_convention(&handler, event)
    }

    /// Fire document-scoped handlers and document listeners for one honored
    /// `on*` name.
    pub(crate) fn handle_document_event(&mut self, on_event: &str) -> Result<(), EvalError> {
        if self.registry.honors_on(on_event) {
            if let Some(handler) = self.context.document_handlers.get(on_event).cloned() {
                if let Some(event) = synthesize_event(&on_event[2..], EventTarget::Document) {
                    self.invoke_with_convention(&handler, event)?;
                }
            }
        }

        let bare = &on_event[2..];
        let listeners: Vec<_> = self
            .context
            .document_listeners
            .iter()
            .filter(|l| l.event_type == bare)
            .cloned()
            .collect();
        for listener in listeners {
            if let Some(event) = synthesize_event(&listener.event_type, EventTarget::Document) {
                self.invoke_with_convention(&listener.handler, event)?;
            }
        }
        Ok(())
    }

    /// Fire element-scoped listeners for one honored event type. Page-root
    /// wrapper elements are skipped (their events route through the window
    /// and document paths), and each (node, type) key fires at most once per
    /// run.
    pub(crate) fn handle_element_event(&mut self, event_type: &str) -> Result<(), EvalError> {
        for record in self.registry.listeners_for(event_type) {
            let Some(tag) = self.context.document.tag(record.element).map(str::to_string) else {
                continue;
            };
            if tag == "body" {
                continue;
            }
            if self.registry.was_dispatched(record.element, event_type) {
                continue;
            }
            let Some(event) =
                synthesize_event(event_type, EventTarget::Element(record.element))
            else {
                continue;
            };
            self.registry.mark_dispatched(record.element, event_type);
            self.invoke_with_convention(&record.handler, event)?;
        }
        Ok(())
    }

    /// Dispatch every honored event: window-scoped first, then
    /// document-scoped, then element-scoped, each in honored order. A
    /// failure in one event type is logged and does not abort later types.
    pub(crate) fn dispatch_events(&mut self) {
        let on_events = self.registry.handled_on_events();

        for on_event in &on_events {
            if let Err(e) = self.handle_window_event(on_event) {
                warn!("window event {} not properly handled: {}", on_event, e);
            }
        }

        for on_event in &on_events {
            if let Err(e) = self.handle_document_event(on_event) {
                warn!("document event {} not properly handled: {}", on_event, e);
            }
        }

        let events: Vec<String> = self.registry.handled_events().to_vec();
        for event_type in &events {
            if let Err(e) = self.handle_element_event(event_type) {
                warn!("element event {} not properly handled: {}", event_type, e);
            }
        }
    }

    /// Invoke a handler under the active personality's calling convention.
    /// Legacy IE (below major version 9) receives zero arguments with the
    /// event published through the `event` context global; everything else
    /// receives the event object as the sole argument.
    pub(crate) fn invoke_with_convention(
        &mut self,
        handler: &HandlerRef,
        event: SyntheticEvent,
    ) -> Result<(), EvalError> {
        let engine = self.deps.script.clone();
        let legacy = self.context.personality.is_legacy_ie();
        let mut ctx = self.script_context();
        let result = if legacy {
            *ctx.event = Some(event);
            engine.invoke_handler(&mut ctx, handler, &[])
        } else {
            engine.invoke_handler(&mut ctx, handler, &[event])
        };
        drop(ctx);
        result
    }
}
