// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Document Arena
 * Mutable document tree with stable node identity
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use crate::script::HandlerRef;

/// Stable node identity. Arena indices are never reused within a document,
/// which makes "created after watermark W" a reliable mutation signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Document,
    Element { tag: String },
    Text(String),
}

/// A listener registered at runtime (addEventListener-style).
#[derive(Debug, Clone)]
pub struct ListenerHook {
    pub event_type: String,
    pub handler: HandlerRef,
    pub capture: bool,
}

#[derive(Debug, Clone)]
pub struct DocumentNode {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: NodeKind,
    /// Insertion-ordered attribute map.
    attrs: Vec<(String, String)>,
    /// Compiled `on*` attribute handlers.
    pub handlers: Vec<(String, HandlerRef)>,
    /// Runtime listeners queued by scripts.
    pub listeners: Vec<ListenerHook>,
    /// Simulated click ordinal, ascending across the document.
    pub clicked: Option<u64>,
}

impl DocumentNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            kind,
            attrs: Vec::new(),
            handlers: Vec::new(),
            listeners: Vec::new(),
            clicked: None,
        }
    }
}

/// Mutable document tree. Invariants: acyclic, every node has at most one
/// parent, node ids are never reused.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<DocumentNode>,
    root: NodeId,
    next_click: u64,
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![DocumentNode::new(NodeKind::Document)],
            root: NodeId(0),
            next_click: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &DocumentNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut DocumentNode {
        &mut self.nodes[id.0]
    }

    /// Number of nodes ever created. Nodes with an index at or above a saved
    /// watermark were created after it.
    pub fn watermark(&self) -> usize {
        self.nodes.len()
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(DocumentNode::new(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
        }));
        id
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(DocumentNode::new(NodeKind::Text(text.to_string())));
        id
    }

    /// Append `child` under `parent`, detaching it from any previous parent.
    /// Appending a node under its own descendant is rejected to keep the
    /// tree acyclic.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if parent == child || self.is_ancestor(child, parent) {
            return false;
        }
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        true
    }

    /// Remove a node from its parent. The node and its subtree keep their
    /// ids but are no longer connected.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    fn is_ancestor(&self, candidate: NodeId, of: NodeId) -> bool {
        let mut cursor = self.nodes[of.0].parent;
        while let Some(p) = cursor {
            if p == candidate {
                return true;
            }
            cursor = self.nodes[p.0].parent;
        }
        false
    }

    /// A node is connected when walking parents reaches the document root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut cursor = id;
        loop {
            if cursor == self.root {
                return true;
            }
            match self.nodes[cursor.0].parent {
                Some(p) => cursor = p,
                None => return false,
            }
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { tag } => Some(tag),
            _ => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes[id.0]
            .attrs
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn attrs(&self, id: NodeId) -> &[(String, String)] {
        &self.nodes[id.0].attrs
    }

    /// Set an attribute, replacing in place to preserve attribute order.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let node = &mut self.nodes[id.0];
        if let Some(entry) = node.attrs.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            entry.1 = value.to_string();
        } else {
            node.attrs.push((name.to_string(), value.to_string()));
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        self.nodes[id.0].attrs.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// Concatenated text of the node's descendants.
    pub fn text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        if let NodeKind::Text(t) = &self.nodes[id.0].kind {
            out.push_str(t);
        }
        for child in self.nodes[id.0].children.clone() {
            self.collect_text(child, out);
        }
    }

    /// Replace the node's children with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        for child in self.nodes[id.0].children.clone() {
            self.detach(child);
        }
        let t = self.create_text(text);
        self.append_child(id, t);
    }

    /// All connected nodes in document order, root excluded.
    pub fn descendants(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.walk(self.root, &mut out);
        out
    }

    fn walk(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for &child in &self.nodes[id.0].children {
            out.push(child);
            self.walk(child, out);
        }
    }

    /// Connected element nodes in document order.
    pub fn elements(&self) -> Vec<NodeId> {
        self.descendants()
            .into_iter()
            .filter(|&id| matches!(self.nodes[id.0].kind, NodeKind::Element { .. }))
            .collect()
    }

    /// Connected elements with the given tag, in document order.
    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|&id| self.tag(id).is_some_and(|t| t.eq_ignore_ascii_case(tag)))
            .collect()
    }

    pub fn body(&self) -> Option<NodeId> {
        self.elements_by_tag("body").into_iter().next()
    }

    /// Connected elements created at or after the watermark, in document
    /// order. The mutation signal behind the engine's rescan loop.
    pub fn elements_since(&self, watermark: usize) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|id| id.0 >= watermark)
            .collect()
    }

    /// Record a simulated click, assigning the next ascending ordinal.
    pub fn mark_clicked(&mut self, id: NodeId) {
        let ordinal = self.next_click;
        self.next_click += 1;
        self.nodes[id.0].clicked = Some(ordinal);
    }

    pub fn click_ordinal(&self, id: NodeId) -> Option<u64> {
        self.nodes[id.0].clicked
    }

    pub fn clear_clicked(&mut self, id: NodeId) {
        self.nodes[id.0].clicked = None;
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
