// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Sina DLoader Control
 * DownloadAndInstall arbitrary file download emulation
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use async_trait::async_trait;
use serde_json::json;

use super::{fetch_exploit_url, first_arg, ControlCtor, ControlHost, VulnerableControl};
use crate::errors::ControlError;
use crate::types::AnalysisMethod;

const MODULE: &str = "SinaDLoader Downloader ActiveX";

pub const IDENTIFIERS: (&[&str], ControlCtor) = (
    &[
        "DLoader.DLoaderCtrl.1",
        "clsid:{D82303B7-A754-4DCB-8AFC-8CF99435AACD}",
    ],
    || Box::new(SinaDLoader),
);

/// Sina DLoader Class ActiveX Control `DownloadAndInstall` method arbitrary
/// file download vulnerability.
pub struct SinaDLoader;

#[async_trait]
impl VulnerableControl for SinaDLoader {
    fn name(&self) -> &'static str {
        "SinaDLoader"
    }

    fn methods(&self) -> &'static [&'static str] {
        &["DownloadAndInstall"]
    }

    async fn invoke(
        &self,
        host: &ControlHost,
        method: &str,
        args: &[String],
    ) -> Result<(), ControlError> {
        let url = first_arg(self.name(), method, args)?;

        host.sink.add_behavior_warning(
            &format!("[{}] Fetching from URL {}", MODULE, url),
            None,
            AnalysisMethod::DynamicAnalysis,
        );
        host.sink.log_exploit_event(
            &host.page_url,
            MODULE,
            "Fetching from URL",
            None,
            Some(json!({ "url": url })),
            false,
        );

        fetch_exploit_url(host, MODULE, url, "SinaDLoader Exploit").await;
        Ok(())
    }
}
