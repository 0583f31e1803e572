// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Honeyclient Error Types
 * Error taxonomy for the browsing-context emulation engine
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use thiserror::Error;

/// Top-level engine error. Every variant below the setup class is recoverable:
/// the affected side effect is skipped and the analysis continues.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error("Control error: {0}")]
    Control(#[from] ControlError),

    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),
}

/// Network fetch failures. Always non-fatal to the analysis: handlers catch
/// these and degrade to "feature skipped".
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Transport failure for {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("Response body for {url} exceeds {limit} bytes")]
    BodyTooLarge { url: String, limit: usize },

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
}

/// Payload/content decode failures. Non-fatal: callers fall back to the raw
/// undecoded input.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Malformed escape sequence at offset {0}")]
    MalformedEscape(usize),

    #[error("Invalid character data: {0}")]
    InvalidCharacterData(String),
}

/// Script-engine faults. Caught at the dispatch boundary for window/document
/// event handlers and at the script-handler boundary for inline scripts.
#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Script compilation failed: {0}")]
    Compile(String),

    #[error("Script evaluation failed: {0}")]
    Runtime(String),

    #[error("No transpiler available for language: {0}")]
    TranspilerUnavailable(String),
}

/// Plugin/control surface failures. Instantiation failures are non-fatal to
/// the caller, which proceeds without binding the control.
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Unknown control identifier: {0}")]
    UnknownIdentifier(String),

    #[error("Control {control} has no method {method}")]
    UnknownMethod { control: String, method: String },

    #[error("Control {control} method {method} expects at least {expected} argument(s)")]
    MissingArgument {
        control: String,
        method: String,
        expected: usize,
    },
}

/// Unrecoverable setup faults. Fatal for the current browsing context only;
/// sibling and parent contexts are unaffected.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("Failed to construct browsing context for {url}: {reason}")]
    Context { url: String, reason: String },
}
