// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Analysis Options
 * Per-run configuration for the emulation engine
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde::{Deserialize, Serialize};

/// Per-run analysis options. Plain data; loading these from files or CLI
/// arguments is the embedder's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOptions {
    /// Extra event types honored during dispatch, appended after the
    /// always-present `load` and `mousemove`. Order matters: both duplicate
    /// suppression and dispatch order key off the resulting sequence.
    #[serde(default)]
    pub events: Vec<String>,

    /// Extensive mode: eagerly fetch every anchor `href` during static
    /// handling instead of waiting for a simulated click.
    #[serde(default)]
    pub extensive: bool,

    /// Depth bound for frame/iframe/anchor/location navigation chains,
    /// counted per spawned generation. Meta-refresh additionally carries its
    /// own 3-revisit cap per target URL.
    #[serde(default = "default_max_navigation_depth")]
    pub max_navigation_depth: u32,

    /// Cap on meta-refresh revisits of the same target URL within a run.
    #[serde(default = "default_max_meta_revisits")]
    pub max_meta_revisits: u32,

    /// Fetch timeout in seconds, applied by the default navigator.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_max_navigation_depth() -> u32 {
    10
}

fn default_max_meta_revisits() -> u32 {
    3
}

fn default_fetch_timeout_secs() -> u64 {
    20
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            extensive: false,
            max_navigation_depth: default_max_navigation_depth(),
            max_meta_revisits: default_max_meta_revisits(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}
