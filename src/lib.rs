// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/*
 * Bountyy Oy - Katiska
 * Low-interaction honeyclient: browsing-context emulation for malicious
 * page analysis
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

//! Katiska emulates a browser visiting a potentially hostile page: it walks
//! the document the way a browser would, honors a configurable set of DOM
//! events, pulls in every resource the page names (frames, plugins, scripts,
//! fonts, meta refreshes), emulates known-vulnerable ActiveX controls, and
//! sweeps captured code fragments for shellcode and payload URLs. Everything
//! observed lands in a pluggable [`logging::EventSink`].
//!
//! The analysis itself is driven by [`client::Honeyclient`]:
//!
//! ```no_run
//! use katiska_honeyclient::{AnalysisOptions, Honeyclient, Personality};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let client = Honeyclient::new(Personality::winxp_ie60(), AnalysisOptions::default())?;
//! client.analyze_url("http://suspicious.example/landing.html").await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod controls;
pub mod dom;
pub mod engine;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod logging;
pub mod navigation;
pub mod navigator;
pub mod parser;
pub mod personality;
pub mod script;
pub mod shellcode;
pub mod types;

pub use client::Honeyclient;
pub use config::AnalysisOptions;
pub use engine::{BrowsingContext, Collaborators, ContextEngine, RunState, WindowRef};
pub use errors::EngineError;
pub use logging::{EventSink, MemorySink, SinkRecord, TraceSink};
pub use personality::Personality;
pub use types::AnalysisMethod;
