// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Tag Handlers
 * Static element handling: scripts, plugins, frames, meta refresh, styles
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::dom::NodeId;
use crate::engine::{ContextEngine, WindowRef};
use crate::navigation::{NavigationKind, NavigationRequest};
use crate::navigator::FetchOptions;
use crate::types::AnalysisMethod;

/// Content type sent for Java archives when the markup names none.
const JAVA_ARCHIVE_CONTENT_TYPE: &str = "application/x-java-archive";

/// Param names that are plugin configuration rather than fetchable payload
/// candidates.
const RESERVED_PARAM_NAMES: &[&str] = &["filename", "movie", "archive", "code"];

/// The static handling a tag name resolves to. Unknown tags resolve to
/// [`TagHandler::NoOp`] and are left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagHandler {
    Script,
    Object,
    Applet,
    Embed,
    Param,
    Meta,
    Link,
    Anchor,
    Frame,
    IFrame,
    Style,
    Body,
    NoScript,
    NoOp,
}

impl TagHandler {
    pub fn resolve(tag: &str) -> Self {
        match tag {
            "script" => Self::Script,
            "object" => Self::Object,
            "applet" => Self::Applet,
            "embed" => Self::Embed,
            "param" => Self::Param,
            "meta" => Self::Meta,
            "link" => Self::Link,
            "a" => Self::Anchor,
            "frame" => Self::Frame,
            "iframe" => Self::IFrame,
            "style" => Self::Style,
            "body" => Self::Body,
            "noscript" => Self::NoScript,
            _ => Self::NoOp,
        }
    }
}

type MimeHandler = Box<dyn Fn(&[u8]) -> bool + Send + Sync>;

/// Content-type interceptors for frame payloads. A handler returning true
/// consumes the response and stops the frame from being parsed as markup.
#[derive(Default)]
pub struct MimeHandlerRegistry {
    handlers: HashMap<String, MimeHandler>,
}

impl MimeHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, content_type: &str, handler: MimeHandler) {
        self.handlers
            .insert(normalize_content_type(content_type), handler);
    }

    /// Run the handler registered for a content type, if any. Returns true
    /// when the payload was consumed.
    pub fn handle(&self, content_type: &str, body: &[u8]) -> bool {
        self.handlers
            .get(&normalize_content_type(content_type))
            .is_some_and(|h| h(body))
    }
}

fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Split a `for`/`event` script binding such as `player(newState, oldState)`
/// into its parameter names.
pub(crate) fn script_for_event_params(attr_event: &str) -> Option<Vec<String>> {
    let (_, rest) = attr_event.split_once('(')?;
    let inner = rest.split(')').next().unwrap_or("");
    Some(inner.split(',').map(str::to_string).collect())
}

/// Parse a meta-refresh `content` attribute: `;`-separated list carrying an
/// integer timeout and a `url=` entry, the URL optionally single-quoted.
pub(crate) fn parse_meta_refresh(content: &str) -> (u32, Option<String>) {
    let mut timeout = 0;
    let mut url = None;

    for part in content.split(';') {
        let part = part.trim();
        if part.len() >= 4 && part[..4].eq_ignore_ascii_case("url=") {
            url = Some(part[4..].to_string());
        }
        if let Ok(t) = part.parse::<u32>() {
            timeout = t;
        }
    }

    if let Some(u) = url.as_mut() {
        if u.len() >= 2 && u.starts_with('\'') && u.ends_with('\'') {
            *u = u[1..u.len() - 1].to_string();
        }
    }

    (timeout, url)
}

static FONT_FACE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)@font-face\s*\{([^}]*)\}").expect("static regex"));
static FONT_FACE_SRC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"src\s*:\s*([^;]+)").expect("static regex"));

/// `src` URLs of every `@font-face` rule in a stylesheet.
pub(crate) fn font_face_urls(css: &str) -> Vec<String> {
    let mut urls = Vec::new();

    for block in FONT_FACE_BLOCK.captures_iter(css) {
        for src in FONT_FACE_SRC.captures_iter(&block[1]) {
            let mut value = src[1].trim();
            if let Some(inner) = value.strip_prefix("url(") {
                value = inner.split(')').next().unwrap_or("");
            }
            let value = value.trim_matches(|c| c == '"' || c == '\'').trim();
            if !value.is_empty() {
                urls.push(value.to_string());
            }
        }
    }

    urls
}

impl ContextEngine {
    pub(crate) async fn dispatch_tag(&mut self, handler: TagHandler, node: NodeId) {
        match handler {
            TagHandler::Script => self.handle_script(node).await,
            TagHandler::Object => self.handle_object(node).await,
            TagHandler::Applet => self.handle_applet(node).await,
            TagHandler::Embed => self.handle_embed(node).await,
            TagHandler::Param => self.handle_param(node),
            TagHandler::Meta => self.handle_meta(node).await,
            TagHandler::Link => self.handle_link(node).await,
            TagHandler::Anchor => self.handle_anchor(node).await,
            TagHandler::Frame => self.handle_frame(node, NavigationKind::Frame).await,
            TagHandler::IFrame => self.handle_frame(node, NavigationKind::IFrame).await,
            TagHandler::Style => self.handle_style(node).await,
            TagHandler::Body | TagHandler::NoScript | TagHandler::NoOp => {}
        }
    }

    async fn handle_script(&mut self, node: NodeId) {
        let language = self
            .context
            .document
            .attr(node, "language")
            .map(|l| l.to_ascii_lowercase())
            .unwrap_or_else(|| "javascript".to_string());

        let javascript = language.contains("javascript");
        let vbscript = matches!(language.as_str(), "vbscript" | "vbs" | "visualbasic");
        if !javascript && !vbscript {
            warn!("unhandled script language: {}", language);
            return;
        }

        if self.context.personality.is_ie() {
            self.handle_script_for_event(node);
        }

        if javascript {
            self.handle_javascript(node).await;
        } else {
            self.handle_vbscript(node).await;
        }
    }

    /// IE `for`/`event` script bindings. Media playstatechange handlers are
    /// seeded by assigning the final state (0) to the last parameter and the
    /// previous state (3) to the one before it.
    fn handle_script_for_event(&mut self, node: NodeId) {
        let attr_for = self.context.document.attr(node, "for").map(str::to_string);
        let attr_event = self.context.document.attr(node, "event").map(str::to_string);
        let (Some(_), Some(event)) = (attr_for, attr_event) else {
            return;
        };

        let Some(mut params) = script_for_event_params(&event) else {
            return;
        };

        if event.to_ascii_lowercase().contains("playstatechange") {
            if let Some(new_state) = params.pop() {
                self.evaluate_quiet(&format!("{} = 0;", new_state.trim()));
                if let Some(old_state) = params.pop() {
                    self.evaluate_quiet(&format!("{} = 3;", old_state.trim()));
                }
            }
        }
    }

    async fn handle_javascript(&mut self, node: NodeId) {
        self.handle_external_javascript(node).await;

        let js = self.context.document.text(node);
        if !js.is_empty() {
            self.deps.sink.add_code_snippet(
                &js,
                "Javascript",
                "Contained_Inside",
                AnalysisMethod::DynamicAnalysis,
                false,
            );
            self.evaluate_script(&js).await;
        }

        self.check_shellcodes().await;
        self.check_anchors().await;
    }

    /// Fetch a script's `src` and splice the retrieved source back into the
    /// document as an inline script under the body, mirroring how the
    /// retrieved code becomes part of the page.
    async fn handle_external_javascript(&mut self, node: NodeId) {
        let Some(src) = self.context.document.attr(node, "src").map(str::to_string) else {
            return;
        };

        let base = self.context.url.clone();
        let Ok(response) = self
            .deps
            .navigator
            .fetch(&base, &src, FetchOptions::kind("script src"))
            .await
        else {
            return;
        };
        if response.is_not_found() || response.body.is_empty() {
            return;
        }

        let js = response.text();
        self.deps.sink.add_code_snippet(
            &js,
            "Javascript",
            "External",
            AnalysisMethod::DynamicAnalysis,
            false,
        );

        let attrs: Vec<(String, String)> = self.context.document.attrs(node).to_vec();
        let spliced = self.context.document.create_element("script");
        for (name, value) in attrs {
            if name.eq_ignore_ascii_case("src") {
                continue;
            }
            self.context.document.set_attr(spliced, &name, &value);
        }
        self.context.document.set_text(spliced, &js);
        let parent = self.context.document.body().unwrap_or_else(|| self.context.document.root());
        self.context.document.append_child(parent, spliced);
        // The spliced copy is evaluated here, not by the rescan loop.
        self.analyzed.insert(spliced);

        self.evaluate_script(&js).await;
    }

    async fn handle_vbscript(&mut self, node: NodeId) {
        let source = self.context.document.text(node);
        self.deps.sink.add_code_snippet(
            &source,
            "VBScript",
            "Contained_Inside",
            AnalysisMethod::DynamicAnalysis,
            false,
        );

        let Some(transpiler) = self.deps.vbs_transpiler.clone() else {
            warn!("VBScript transpiling not enabled");
            return;
        };

        match transpiler.transpile(&source) {
            Ok(js) => self.evaluate_script(&js).await,
            Err(e) => warn!("VBScript transpiling failed: {}", e),
        }
    }

    pub(crate) async fn handle_object(&mut self, node: NodeId) {
        self.do_handle_params(node).await;

        let classid = self.context.document.attr(node, "classid").map(str::to_string);
        let id = self.context.document.attr(node, "id").map(str::to_string);
        let codebase = self.context.document.attr(node, "codebase").map(str::to_string);
        let data = self.context.document.attr(node, "data").map(str::to_string);

        let base = self.context.url.clone();
        if let Some(codebase) = codebase {
            let _ = self
                .deps
                .navigator
                .fetch(&base, &codebase, FetchOptions::kind("object codebase"))
                .await;
        }
        if let Some(data) = data {
            let _ = self
                .deps
                .navigator
                .fetch(&base, &data, FetchOptions::kind("object data"))
                .await;
        }

        if !self.context.personality.is_ie() {
            return;
        }

        let Some(classid) = classid else {
            return;
        };
        let instance = match self.deps.controls.instantiate(&classid) {
            Ok(instance) => instance,
            Err(e) => {
                debug!("object instantiation skipped: {}", e);
                return;
            }
        };

        let Some(id) = id else {
            return;
        };
        let instance = Arc::new(instance);
        self.context.window_controls.insert(id.clone(), Arc::clone(&instance));
        self.context.document_controls.insert(id, instance);
    }

    pub(crate) async fn handle_applet(&mut self, node: NodeId) {
        self.do_handle_params(node).await;

        let Some(archive) = self.context.document.attr(node, "archive").map(str::to_string)
        else {
            return;
        };

        let mut options = FetchOptions::kind("applet")
            .with_header("Connection", "keep-alive")
            .with_header("Content-Type", JAVA_ARCHIVE_CONTENT_TYPE);
        if let Some(ua) = self.context.personality.java_user_agent() {
            options = options.with_header("User-Agent", &ua);
        }

        let base = self.context.url.clone();
        let _ = self.deps.navigator.fetch(&base, &archive, options).await;
    }

    /// Shared `param` child handling for object and applet elements: collect
    /// the name/value pairs, fetch the payload-bearing ones, and sniff JNLP
    /// descriptors in anything that comes back.
    async fn do_handle_params(&mut self, node: NodeId) {
        let mut params: HashMap<String, String> = HashMap::new();
        let mut embeds = Vec::new();

        for child in self.context.document.node(node).children.clone() {
            let Some(tag) = self.context.document.tag(child) else {
                continue;
            };
            match tag {
                "param" => {
                    let name = self.context.document.attr(child, "name");
                    let value = self.context.document.attr(child, "value");
                    if let (Some(name), Some(value)) = (name, value) {
                        params.insert(name.to_ascii_lowercase(), value.to_string());
                    }
                }
                "embed" => embeds.push(child),
                _ => {}
            }
        }

        for embed in embeds {
            // handled here, not again by the main traversal
            self.analyzed.insert(embed);
            self.handle_embed(embed).await;
        }

        if params.is_empty() {
            return;
        }

        let mut options = FetchOptions::kind("params").with_header("Connection", "keep-alive");
        let content_type = match params.get("type") {
            Some(t) => Some(t.clone()),
            None if self.context.document.tag(node) == Some("applet") => {
                Some(JAVA_ARCHIVE_CONTENT_TYPE.to_string())
            }
            None => None,
        };
        if let Some(content_type) = &content_type {
            options = options.with_header("Content-Type", content_type);
            if content_type.contains("java") {
                if let Some(ua) = self.context.personality.java_user_agent() {
                    options = options.with_header("User-Agent", &ua);
                }
            }
        }

        let base = self.context.url.clone();
        for key in ["filename", "movie"] {
            if let Some(value) = params.get(key) {
                let _ = self.deps.navigator.fetch(&base, value, options.clone()).await;
            }
        }

        for (key, value) in &params {
            if RESERVED_PARAM_NAMES.contains(&key.as_str()) {
                continue;
            }
            if !value.starts_with("http") {
                continue;
            }
            if let Ok(response) = self.deps.navigator.fetch(&base, value, options.clone()).await
            {
                self.handle_jnlp(&response.text(), &options).await;
            }
        }

        if let Some(archive) = params.get("archive") {
            let archive = match params.get("codebase") {
                Some(codebase) => format!("{}{}", codebase, archive),
                None => archive.clone(),
            };
            let _ = self.deps.navigator.fetch(&base, &archive, options).await;
        }
    }

    /// Detect a Java Web Start descriptor in a fetched param payload and
    /// pull in the JAR it points to.
    async fn handle_jnlp(&mut self, data: &str, options: &FetchOptions) {
        let jar_href = {
            let doc = Html::parse_document(data);
            let jnlp = Selector::parse("jnlp").expect("static selector");
            if doc.select(&jnlp).next().is_none() {
                return;
            }

            self.deps.sink.add_behavior_warning(
                "[JNLP Detected]",
                None,
                AnalysisMethod::DynamicAnalysis,
            );

            let param = Selector::parse("param").expect("static selector");
            for p in doc.select(&param) {
                let name = p.value().attr("name").unwrap_or_default();
                let value = p.value().attr("value").unwrap_or_default();
                self.deps.sink.add_behavior_warning(
                    &format!("[JNLP] <param name=\"{}\" value=\"{}\">", name, value),
                    None,
                    AnalysisMethod::DynamicAnalysis,
                );
                if name == "__applet_ssv_validated" && value.eq_ignore_ascii_case("true") {
                    self.deps.sink.log_exploit_event(
                        &self.context.url,
                        "Java WebStart",
                        "Java Security Warning Bypass (CVE-2013-2423)",
                        Some("CVE-2013-2423"),
                        None,
                        true,
                    );
                }
            }

            let jar = Selector::parse("jar").expect("static selector");
            doc.select(&jar)
                .next()
                .and_then(|j| j.value().attr("href"))
                .map(str::to_string)
        };

        if let Some(href) = jar_href {
            let base = self.context.url.clone();
            let mut jar_options = FetchOptions::kind("JNLP");
            jar_options.headers = options.headers.clone();
            let _ = self.deps.navigator.fetch(&base, &href, jar_options).await;
        }
    }

    async fn handle_embed(&mut self, node: NodeId) {
        let Some(src) = self.context.document.attr(node, "src").map(str::to_string) else {
            return;
        };

        let mut options = FetchOptions::kind("embed");
        if let Some(embed_type) = self.context.document.attr(node, "type") {
            options = options.with_header("Content-Type", embed_type);
        }

        let base = self.context.url.clone();
        let _ = self.deps.navigator.fetch(&base, &src, options).await;
    }

    fn handle_param(&mut self, node: NodeId) {
        let name = self.context.document.attr(node, "name").unwrap_or_default();
        let value = self.context.document.attr(node, "value").unwrap_or_default();
        debug!(name, value, "param element");
    }

    async fn handle_meta(&mut self, node: NodeId) {
        if let Some(name) = self.context.document.attr(node, "name") {
            if name.eq_ignore_ascii_case("generator") {
                if let Some(content) = self.context.document.attr(node, "content") {
                    self.deps.sink.add_behavior_warning(
                        &format!("[Meta] Generator: {}", content),
                        None,
                        AnalysisMethod::DynamicAnalysis,
                    );
                }
            }
        }

        let Some(http_equiv) = self.context.document.attr(node, "http-equiv") else {
            return;
        };
        if !http_equiv.eq_ignore_ascii_case("refresh") {
            return;
        }
        let Some(content) = self.context.document.attr(node, "content").map(str::to_string)
        else {
            return;
        };
        if !content.to_ascii_lowercase().contains("url") {
            return;
        }

        let (timeout, url) = parse_meta_refresh(&content);
        let Some(url) = url else {
            return;
        };

        // The refresh cap is keyed on the literal URL string, run-wide.
        if self.run.meta_revisits(&url) >= self.deps.options.max_meta_revisits {
            debug!(url = %url, "meta refresh revisit cap reached");
            return;
        }

        let base = self.context.url.clone();
        let Ok(response) = self
            .deps
            .navigator
            .fetch(&base, &url, FetchOptions::kind("meta"))
            .await
        else {
            return;
        };
        if response.is_not_found() {
            return;
        }

        self.run.record_meta_visit(&url);
        debug!(url = %url, timeout, "meta refresh");

        let target = self
            .deps
            .navigator
            .normalize_url(&base, &url)
            .unwrap_or(url);
        let body = response.text();
        self.descend_into(target, body, NavigationKind::MetaRefresh).await;
    }

    async fn handle_frame(&mut self, node: NodeId, kind: NavigationKind) {
        let Some(src) = self.context.document.attr(node, "src").map(str::to_string) else {
            return;
        };

        let base = self.context.url.clone();
        let Ok(response) = self
            .deps
            .navigator
            .fetch(&base, &src, FetchOptions::kind(kind.as_str()))
            .await
        else {
            return;
        };
        if response.is_not_found() {
            return;
        }

        if let Some(content_type) = &response.content_type {
            if self.deps.mime_handlers.handle(content_type, &response.body) {
                return;
            }
        }

        let target = self
            .deps
            .navigator
            .normalize_url(&base, &src)
            .unwrap_or(src);
        let request = NavigationRequest {
            url: target,
            origin: base,
            kind,
        };
        if self.depth_exceeded(&request) {
            return;
        }

        let child = self.spawn_engine(request.url.clone(), &response.text());
        if let Some(id) = self.context.document.attr(node, "id") {
            self.run.register_window(
                id,
                WindowRef {
                    url: request.url.clone(),
                    context: child.context_id,
                },
            );
        }
        child.run_boxed().await;
    }

    /// Anchors are queued for click resolution. Under extensive mode the
    /// target is also fetched eagerly, and a failed fetch drops the anchor.
    async fn handle_anchor(&mut self, node: NodeId) {
        if self.deps.options.extensive {
            let Some(href) = self.context.document.attr(node, "href").map(str::to_string)
            else {
                return;
            };
            let base = self.context.url.clone();
            let Ok(response) = self
                .deps
                .navigator
                .fetch(&base, &href, FetchOptions::kind("anchor"))
                .await
            else {
                return;
            };
            if response.is_not_found() {
                return;
            }
        }

        self.anchors.push(node);
    }

    async fn handle_link(&mut self, node: NodeId) {
        let Some(href) = self.context.document.attr(node, "href").map(str::to_string) else {
            return;
        };
        let base = self.context.url.clone();
        let _ = self
            .deps
            .navigator
            .fetch(&base, &href, FetchOptions::kind("link"))
            .await;
    }

    async fn handle_style(&mut self, node: NodeId) {
        let css = self.context.document.text(node);
        let base = self.context.url.clone();
        for url in font_face_urls(&css) {
            let _ = self
                .deps
                .navigator
                .fetch(&base, &url, FetchOptions::kind("font face"))
                .await;
        }
    }
}
