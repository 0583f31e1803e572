// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - DOM Parser
 * Bridges parsed HTML into the mutable document arena
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use scraper::Html;

use crate::dom::{Document, NodeId};

/// HTML parsing collaborator. Parsing never fails: malformed markup degrades
/// to whatever tree the parser can recover, possibly empty.
pub trait DomParser: Send + Sync {
    fn parse(&self, html: &str) -> Document;
}

/// Default parser backed by the `scraper` crate's html5ever tree, copied
/// into the arena so the engine can mutate it freely.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlDomParser;

impl HtmlDomParser {
    pub fn new() -> Self {
        Self
    }

    fn copy_children(
        source: ego_tree::NodeRef<'_, scraper::Node>,
        doc: &mut Document,
        parent: NodeId,
    ) {
        for child in source.children() {
            match child.value() {
                scraper::Node::Element(element) => {
                    let id = doc.create_element(element.name());
                    for (name, value) in element.attrs() {
                        doc.set_attr(id, name, value);
                    }
                    doc.append_child(parent, id);
                    Self::copy_children(child, doc, id);
                }
                scraper::Node::Text(text) => {
                    let id = doc.create_text(&text.text);
                    doc.append_child(parent, id);
                }
                // doctype, comments and processing instructions carry no
                // analyzable behavior
                _ => {}
            }
        }
    }
}

impl DomParser for HtmlDomParser {
    fn parse(&self, html: &str) -> Document {
        let parsed = Html::parse_document(html);
        let mut doc = Document::new();
        let root = doc.root();
        Self::copy_children(parsed.tree.root(), &mut doc, root);
        doc
    }
}
