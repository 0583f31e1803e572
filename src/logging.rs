// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Event Sink
 * Structured logging surface consumed by the emulation engine
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{info, warn};

use crate::types::{
    AnalysisMethod, BehaviorWarning, CodeSnippet, Connection, ExploitEvent, FetchedLocation,
};

/// Snippets shorter than this are dropped when logged with `check = true`
/// (eval-captured fragments are noisy below this size).
pub const MIN_SNIPPET_LENGTH: usize = 4;

/// Where analysis results land. Implementations must be cheap to call and
/// must never fail: the engine treats the sink as append-only and infallible.
pub trait EventSink: Send + Sync {
    fn add_behavior_warning(&self, description: &str, cve: Option<&str>, method: AnalysisMethod);

    /// `check = true` applies the minimum-length filter to eval-captured
    /// fragments.
    fn add_code_snippet(
        &self,
        content: &str,
        language: &str,
        relationship: &str,
        method: AnalysisMethod,
        check: bool,
    );

    /// `forward = true` additionally surfaces the event as a behavior
    /// warning formatted `[module] description`.
    fn log_exploit_event(
        &self,
        url: &str,
        module: &str,
        description: &str,
        cve: Option<&str>,
        data: Option<serde_json::Value>,
        forward: bool,
    );

    /// Record the connection (redirection, link) between two pages.
    fn log_connection(
        &self,
        source: &str,
        destination: &str,
        method: &str,
        flags: Option<serde_json::Value>,
    );

    /// Record file information for a fetched URL.
    fn log_location(&self, location: FetchedLocation);
}

fn snippet_too_short(content: &str) -> bool {
    content.len() < MIN_SNIPPET_LENGTH
}

/// Sink that forwards every record to the `tracing` subscriber. The default
/// for embedders that only want structured console/collector output.
#[derive(Debug, Default, Clone, Copy)]
pub struct TraceSink;

impl EventSink for TraceSink {
    fn add_behavior_warning(&self, description: &str, cve: Option<&str>, method: AnalysisMethod) {
        warn!(cve = cve.unwrap_or(""), method = %method, "{}", description);
    }

    fn add_code_snippet(
        &self,
        content: &str,
        language: &str,
        relationship: &str,
        method: AnalysisMethod,
        check: bool,
    ) {
        if check && snippet_too_short(content) {
            return;
        }
        info!(language, relationship, method = %method, "code snippet ({} bytes)", content.len());
    }

    fn log_exploit_event(
        &self,
        url: &str,
        module: &str,
        description: &str,
        cve: Option<&str>,
        data: Option<serde_json::Value>,
        forward: bool,
    ) {
        if forward {
            self.add_behavior_warning(
                &format!("[{}] {}", module, description),
                cve,
                AnalysisMethod::DynamicAnalysis,
            );
        }
        warn!(
            url,
            module,
            cve = cve.unwrap_or(""),
            data = %data.unwrap_or(serde_json::Value::Null),
            "exploit event: {}",
            description
        );
    }

    fn log_connection(
        &self,
        source: &str,
        destination: &str,
        method: &str,
        flags: Option<serde_json::Value>,
    ) {
        info!(
            source,
            destination,
            method,
            flags = %flags.unwrap_or(serde_json::Value::Null),
            "connection"
        );
    }

    fn log_location(&self, location: FetchedLocation) {
        info!(
            url = location.url,
            content_type = location.content_type.as_deref().unwrap_or(""),
            sha256 = location.sha256,
            size = location.size,
            "fetched location"
        );
    }
}

/// A single record held by [`MemorySink`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SinkRecord {
    Warning(BehaviorWarning),
    Exploit(ExploitEvent),
    Snippet(CodeSnippet),
    Connection(Connection),
    Location(FetchedLocation),
}

/// In-memory sink collecting every record for later inspection or JSON
/// export. Used by the integration suites and by embedders that post-process
/// results themselves.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<SinkRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, record: SinkRecord) {
        self.records.lock().expect("sink poisoned").push(record);
    }

    pub fn records(&self) -> Vec<SinkRecord> {
        self.records.lock().expect("sink poisoned").clone()
    }

    pub fn warnings(&self) -> Vec<BehaviorWarning> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                SinkRecord::Warning(w) => Some(w),
                _ => None,
            })
            .collect()
    }

    pub fn exploits(&self) -> Vec<ExploitEvent> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                SinkRecord::Exploit(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    pub fn snippets(&self) -> Vec<CodeSnippet> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                SinkRecord::Snippet(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn connections(&self) -> Vec<Connection> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                SinkRecord::Connection(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn locations(&self) -> Vec<FetchedLocation> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                SinkRecord::Location(l) => Some(l),
                _ => None,
            })
            .collect()
    }

    /// Export the collected records as a JSON report.
    pub fn export_json(&self) -> serde_json::Value {
        serde_json::json!({
            "generatedAt": Utc::now().to_rfc3339(),
            "records": self.records(),
        })
    }
}

impl EventSink for MemorySink {
    fn add_behavior_warning(&self, description: &str, cve: Option<&str>, method: AnalysisMethod) {
        warn!(cve = cve.unwrap_or(""), "{}", description);
        self.push(SinkRecord::Warning(BehaviorWarning::new(
            description,
            cve,
            method,
        )));
    }

    fn add_code_snippet(
        &self,
        content: &str,
        language: &str,
        relationship: &str,
        method: AnalysisMethod,
        check: bool,
    ) {
        if check && snippet_too_short(content) {
            return;
        }
        self.push(SinkRecord::Snippet(CodeSnippet {
            content: content.to_string(),
            language: language.to_string(),
            relationship: relationship.to_string(),
            method,
            timestamp: Utc::now().to_rfc3339(),
        }));
    }

    fn log_exploit_event(
        &self,
        url: &str,
        module: &str,
        description: &str,
        cve: Option<&str>,
        data: Option<serde_json::Value>,
        forward: bool,
    ) {
        if forward {
            self.add_behavior_warning(
                &format!("[{}] {}", module, description),
                cve,
                AnalysisMethod::DynamicAnalysis,
            );
        }
        self.push(SinkRecord::Exploit(ExploitEvent {
            url: url.to_string(),
            module: module.to_string(),
            description: description.to_string(),
            cve: cve.map(str::to_string),
            data,
            timestamp: Utc::now().to_rfc3339(),
        }));
    }

    fn log_connection(
        &self,
        source: &str,
        destination: &str,
        method: &str,
        flags: Option<serde_json::Value>,
    ) {
        self.push(SinkRecord::Connection(Connection {
            source: source.to_string(),
            destination: destination.to_string(),
            method: method.to_string(),
            flags,
            timestamp: Utc::now().to_rfc3339(),
        }));
    }

    fn log_location(&self, location: FetchedLocation) {
        self.push(SinkRecord::Location(location));
    }
}
