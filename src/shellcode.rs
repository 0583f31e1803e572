// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Shellcode Pipeline
 * Decode, CPU-emulate and extract payload URLs from captured fragments
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use tracing::warn;

use crate::engine::ContextEngine;
use crate::errors::DecodeError;
use crate::navigator::FetchOptions;
use crate::types::AnalysisMethod;

/// CPU instruction emulation collaborator. Runs candidate bytes with API
/// hooks disabled and returns a textual execution profile, or `None` when
/// the bytes never execute as meaningful code.
pub trait CpuEmulator: Send + Sync {
    fn profile(&self, code: &[u8]) -> Option<String>;
}

/// Default emulator: no emulation backend is linked in, so no profile is
/// ever produced. The static URL scan still runs over every candidate.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEmulator;

impl CpuEmulator for NullEmulator {
    fn profile(&self, _code: &[u8]) -> Option<String> {
        None
    }
}

/// Decode an escaped shellcode payload: literal quotes are stripped,
/// `%uXXXX` becomes two bytes with the pair order swapped, a truncated
/// `%uXX` becomes one byte, `%XX` becomes one byte, anything else passes
/// through.
pub fn decode_payload(payload: &str) -> Result<Vec<u8>, DecodeError> {
    let bytes = payload.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => i += 1,
            b'%' => {
                if i + 6 <= bytes.len() && bytes[i + 1] == b'u' {
                    let hi = hex_pair(payload, i + 2)?;
                    let lo = hex_pair(payload, i + 4)?;
                    out.push(lo);
                    out.push(hi);
                    i += 6;
                } else if i + 4 <= bytes.len() && bytes[i + 1] == b'u' {
                    out.push(hex_pair(payload, i + 2)?);
                    i += 4;
                } else if bytes.get(i + 1) == Some(&b'u') {
                    // A `%u` escape cut short by end of input passes through
                    // untouched; the rest of the payload still decodes.
                    out.push(b'%');
                    i += 1;
                } else if i + 3 <= bytes.len() && bytes[i + 1].is_ascii_hexdigit() {
                    out.push(hex_pair(payload, i + 1)?);
                    i += 3;
                } else {
                    out.push(b'%');
                    i += 1;
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    Ok(out)
}

fn hex_pair(payload: &str, offset: usize) -> Result<u8, DecodeError> {
    payload
        .get(offset..offset + 2)
        .and_then(|h| u8::from_str_radix(h, 16).ok())
        .ok_or(DecodeError::MalformedEscape(offset))
}

/// Decode with the raw payload as fallback: a malformed escape never aborts
/// the candidate.
pub fn decode_or_raw(payload: &str) -> Vec<u8> {
    decode_payload(payload).unwrap_or_else(|_| payload.as_bytes().to_vec())
}

/// URLs named as the first quoted argument after each `URLDownloadToFile`
/// marker in an emulation profile (the argument lives in the second
/// `;`-delimited field).
pub fn extract_urldownloadtofile_urls(profile: &str) -> Vec<String> {
    extract_marker_urls(profile, "URLDownloadToFile", 1, 3, false)
}

/// URLs named as the quoted argument of each `WinExec` marker. Only
/// `http`-prefixed arguments count: WinExec also launches local commands.
pub fn extract_winexec_urls(profile: &str) -> Vec<String> {
    extract_marker_urls(profile, "WinExec", 0, 2, true)
}

fn extract_marker_urls(
    profile: &str,
    marker: &str,
    field: usize,
    min_quote_parts: usize,
    require_http: bool,
) -> Vec<String> {
    let mut urls = Vec::new();
    let mut rest = profile;

    while let Some(offset) = rest.find(marker) {
        rest = &rest[offset..];

        let candidate = rest.split(';').nth(field).and_then(|f| {
            let parts: Vec<&str> = f.split('"').collect();
            if parts.len() >= min_quote_parts {
                Some(parts[1].to_string())
            } else {
                None
            }
        });

        if let Some(url) = candidate {
            if !require_http || url.starts_with("http") {
                urls.push(url);
            }
        }

        rest = &rest[1..];
    }

    urls
}

/// First literal `http://` or `https://` URL per scheme in a decoded or raw
/// payload: trimmed at whitespace, one trailing quote stripped, then cut to
/// the longest printable prefix.
pub fn find_static_urls(haystack: &str) -> Vec<String> {
    let mut urls = Vec::new();

    for scheme in ["http://", "https://"] {
        let Some(offset) = haystack.find(scheme) else {
            continue;
        };

        let Some(mut url) = haystack[offset..].split_whitespace().next() else {
            continue;
        };
        if url.ends_with('\'') || url.ends_with('"') {
            url = &url[..url.len() - 1];
        }
        if url.is_empty() {
            continue;
        }

        let printable = url
            .bytes()
            .take_while(|&b| (0x20..0x7f).contains(&b))
            .count();
        if printable > 0 {
            urls.push(url[..printable].to_string());
        }
    }

    urls
}

impl ContextEngine {
    /// Drain the run-scoped captured-fragment queue, analyzing one candidate
    /// at a time until empty. Invoked after every script handler and once
    /// more at the end of the context run.
    pub(crate) async fn check_shellcodes(&mut self) {
        while let Some(candidate) = self.run.pop_shellcode() {
            self.check_shellcode(&candidate).await;
        }
    }

    /// The decode -> emulate -> extract -> fetch pipeline for one candidate.
    pub(crate) async fn check_shellcode(&mut self, payload: &str) {
        let decoded = decode_or_raw(payload);

        if let Some(profile) = self.deps.emulator.profile(&decoded) {
            if !profile.is_empty() {
                self.deps.sink.add_code_snippet(
                    &profile,
                    "Assembly",
                    "Shellcode",
                    AnalysisMethod::StaticAnalysis,
                    false,
                );
                warn!("shellcode profile:\n{}", profile);

                for url in extract_urldownloadtofile_urls(&profile) {
                    if !self.fetch_shellcode_url(&url, "URLDownloadToFile").await {
                        break;
                    }
                }
                for url in extract_winexec_urls(&profile) {
                    if !self.fetch_shellcode_url(&url, "WinExec").await {
                        break;
                    }
                }
            }
        }

        let decoded_text = String::from_utf8_lossy(&decoded).into_owned();
        self.check_static_urls(&decoded_text, payload).await;
    }

    /// Scan both the decoded and the original raw payload for literal URL
    /// substrings; the first hit per scheme is logged and fetched once.
    async fn check_static_urls(&mut self, decoded: &str, raw: &str) {
        let mut urls = find_static_urls(decoded);
        for url in find_static_urls(raw) {
            if !urls.contains(&url) {
                urls.push(url);
            }
        }

        for url in urls {
            self.deps.sink.add_code_snippet(
                raw,
                "Assembly",
                "Shellcode",
                AnalysisMethod::StaticAnalysis,
                false,
            );
            self.deps.sink.add_behavior_warning(
                &format!("[Shellcode Analysis] URL Detected: {}", url),
                None,
                AnalysisMethod::StaticAnalysis,
            );

            if !self.fetch_shellcode_url(&url, "URL found").await {
                return;
            }
        }
    }

    /// Fetch a shellcode-extracted URL unless already visited this run.
    /// Returns false when the URL was already seen, which stops the
    /// enclosing extraction loop. Fetch errors are swallowed.
    async fn fetch_shellcode_url(&mut self, url: &str, kind: &str) -> bool {
        if self.run.is_visited(url) {
            return false;
        }
        let base = self.context.url.clone();
        if self
            .deps
            .navigator
            .fetch(&base, url, FetchOptions::kind(kind))
            .await
            .is_ok()
        {
            self.run.mark_visited(url);
        }
        true
    }
}
