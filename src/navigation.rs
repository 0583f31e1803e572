// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Navigation
 * Frame descent, anchor clicks, location changes and branch forking
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::sync::Arc;

use tracing::warn;

use crate::dom::NodeId;
use crate::engine::{BrowsingContext, ContextEngine};
use crate::navigator::FetchOptions;
use crate::types::AnalysisMethod;

/// How a navigation was initiated. Doubles as the connection-log tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    Frame,
    IFrame,
    MetaRefresh,
    Anchor,
    Location,
}

impl NavigationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Frame => "frame",
            Self::IFrame => "iframe",
            Self::MetaRefresh => "meta",
            Self::Anchor => "anchor",
            Self::Location => "href",
        }
    }
}

/// One pending navigation: where to go, from where, and why.
#[derive(Debug, Clone)]
pub struct NavigationRequest {
    pub url: String,
    pub origin: String,
    pub kind: NavigationKind,
}

impl ContextEngine {
    /// Resolve queued anchor clicks in click order. Anchors targeting
    /// another window fork a concurrent branch; everything else navigates
    /// within this branch.
    pub(crate) async fn check_anchors(&mut self) {
        let mut clicked: Vec<(u64, NodeId)> = self
            .anchors
            .iter()
            .filter_map(|&n| self.context.document.click_ordinal(n).map(|o| (o, n)))
            .collect();
        if clicked.is_empty() {
            return;
        }
        clicked.sort_by_key(|&(ordinal, _)| ordinal);

        for (_, node) in clicked {
            let href = self.context.document.attr(node, "href").map(str::to_string);
            self.context.document.clear_clicked(node);
            let Some(href) = href else {
                continue;
            };

            let target = self.context.document.attr(node, "target").map(str::to_string);
            match target {
                Some(t) if t != "_self" => self.spawn_branch(&href),
                _ => self.follow_href(&href, NavigationKind::Anchor).await,
            }
        }
    }

    /// A script assigned `location.href` (or an equivalent).
    pub(crate) async fn location_change(&mut self, url: &str) {
        self.follow_href(url, NavigationKind::Location).await;
    }

    /// Navigate this branch to `href`: resolve, fetch, parse, and run a
    /// child context one level deeper.
    pub(crate) async fn follow_href(&mut self, href: &str, kind: NavigationKind) {
        let base = self.context.url.clone();
        let target = self
            .deps
            .navigator
            .normalize_url(&base, href)
            .unwrap_or_else(|| href.to_string());

        if target == base {
            warn!("detected redirection to the current page ({}), skipping", target);
            return;
        }

        if kind == NavigationKind::Location {
            self.deps.sink.add_behavior_warning(
                &format!(
                    "[HREF Redirection (document.location)] Content-Location: {} --> Location: {}",
                    base, target
                ),
                None,
                AnalysisMethod::DynamicAnalysis,
            );
            self.deps.sink.log_connection(&base, &target, "href", None);
        }

        let request = NavigationRequest {
            url: target,
            origin: base,
            kind,
        };
        if self.depth_exceeded(&request) {
            return;
        }

        let Ok(response) = self
            .deps
            .navigator
            .fetch(&request.origin, &request.url, FetchOptions::kind(kind.as_str()))
            .await
        else {
            return;
        };
        if response.is_not_found() {
            return;
        }

        let body = response.text();
        let child = self.spawn_engine(response.final_url, &body);
        child.run_boxed().await;
    }

    /// Run a fetched document as a child context one level deeper.
    pub(crate) async fn descend_into(&mut self, url: String, body: String, kind: NavigationKind) {
        let request = NavigationRequest {
            url,
            origin: self.context.url.clone(),
            kind,
        };
        if self.depth_exceeded(&request) {
            return;
        }
        let child = self.spawn_engine(request.url, &body);
        child.run_boxed().await;
    }

    /// Fork a detached branch for an anchor that targets another window.
    /// The branch runs on a forked [`crate::engine::RunState`] and is joined
    /// by the top-level run through the shared branch ledger.
    pub(crate) fn spawn_branch(&self, href: &str) {
        let request = NavigationRequest {
            url: href.to_string(),
            origin: self.context.url.clone(),
            kind: NavigationKind::Anchor,
        };
        if self.depth_exceeded(&request) {
            return;
        }

        let deps = self.deps.clone();
        let run = Arc::new(self.run.fork());
        let personality = Arc::clone(&self.context.personality);
        let depth = self.depth + 1;

        let handle = tokio::spawn(async move {
            let target = deps
                .navigator
                .normalize_url(&request.origin, &request.url)
                .unwrap_or_else(|| request.url.clone());
            let Ok(response) = deps
                .navigator
                .fetch(&request.origin, &target, FetchOptions::kind("anchor"))
                .await
            else {
                return;
            };
            if response.is_not_found() {
                return;
            }

            let document = deps.parser.parse(&response.text());
            let context = BrowsingContext::new(response.final_url.clone(), document, personality);
            ContextEngine::new(deps, run, context, depth).run_boxed().await;
        });
        self.run.add_branch(handle);
    }

    pub(crate) fn spawn_engine(&self, url: String, body: &str) -> ContextEngine {
        let document = self.deps.parser.parse(body);
        let context = BrowsingContext::new(url, document, Arc::clone(&self.context.personality));
        ContextEngine::new(self.deps.clone(), Arc::clone(&self.run), context, self.depth + 1)
    }

    pub(crate) fn depth_exceeded(&self, request: &NavigationRequest) -> bool {
        if self.depth + 1 > self.deps.options.max_navigation_depth {
            warn!(
                url = %request.url,
                kind = request.kind.as_str(),
                depth = self.depth,
                "navigation depth limit reached, not following"
            );
            return true;
        }
        false
    }
}
