// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Analysis Record Types
 * Structured records emitted into the event sink
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// How a record was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisMethod {
    #[serde(rename = "Static Analysis")]
    StaticAnalysis,
    #[serde(rename = "Dynamic Analysis")]
    DynamicAnalysis,
}

impl AnalysisMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMethod::StaticAnalysis => "Static Analysis",
            AnalysisMethod::DynamicAnalysis => "Dynamic Analysis",
        }
    }
}

impl std::fmt::Display for AnalysisMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A suspicious behavior observed during analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorWarning {
    pub description: String,
    pub cve: Option<String>,
    pub method: AnalysisMethod,
    pub timestamp: String,
}

impl BehaviorWarning {
    pub fn new(description: &str, cve: Option<&str>, method: AnalysisMethod) -> Self {
        Self {
            description: description.to_string(),
            cve: cve.map(str::to_string),
            method,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// A confirmed exploit interaction: a known-vulnerable surface was driven
/// with attacker-controlled input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExploitEvent {
    /// Page URL the exploit occurred on.
    pub url: String,
    /// Module/control that was exploited.
    pub module: String,
    pub description: String,
    pub cve: Option<String>,
    pub data: Option<serde_json::Value>,
    pub timestamp: String,
}

/// A captured code fragment (script source, shellcode profile, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeSnippet {
    pub content: String,
    pub language: String,
    /// How the snippet relates to the page: `Contained_Inside`, `External`,
    /// `Shellcode`, ...
    pub relationship: String,
    pub method: AnalysisMethod,
    pub timestamp: String,
}

/// A connection between two pages: redirection, frame, link, exploit fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    /// Origin page.
    pub source: String,
    /// Page the emulated user is made to load next.
    pub destination: String,
    /// Link kind that moved the user: `iframe`, `meta`, `href`, `WinExec`, ...
    pub method: String,
    pub flags: Option<serde_json::Value>,
    pub timestamp: String,
}

/// Bookkeeping for a fetched payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedLocation {
    pub url: String,
    /// Content type, whatever the server says it is.
    pub content_type: Option<String>,
    pub sha256: String,
    pub size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_method_round_trips() {
        let json = serde_json::to_string(&AnalysisMethod::StaticAnalysis).unwrap();
        assert_eq!(json, r#""Static Analysis""#);
        let back: AnalysisMethod = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AnalysisMethod::StaticAnalysis);
    }

    #[test]
    fn behavior_warning_carries_timestamp() {
        let warn = BehaviorWarning::new("test", Some("CVE-2013-2423"), AnalysisMethod::DynamicAnalysis);
        assert!(!warn.timestamp.is_empty());
        assert_eq!(warn.cve.as_deref(), Some("CVE-2013-2423"));
    }
}
