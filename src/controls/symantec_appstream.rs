// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Symantec AppStream Control
 * installAppMgr arbitrary file download emulation (CVE-2008-4388)
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use async_trait::async_trait;
use serde_json::json;

use super::{fetch_exploit_url, first_arg, ControlCtor, ControlHost, VulnerableControl};
use crate::errors::ControlError;
use crate::types::AnalysisMethod;

const MODULE: &str = "Symantec AppStream LaunchObj ActiveX";
const CVE: &str = "CVE-2008-4388";

pub const IDENTIFIERS: (&[&str], ControlCtor) = (
    &["clsid:{3356DB7C-58A7-11D4-AA5C-006097314BF8}"],
    || Box::new(SymantecAppStream),
);

/// Symantec AppStream LaunchObj ActiveX arbitrary file download and
/// execute, CVE-2008-4388.
pub struct SymantecAppStream;

#[async_trait]
impl VulnerableControl for SymantecAppStream {
    fn name(&self) -> &'static str {
        "SymantecAppStream"
    }

    fn methods(&self) -> &'static [&'static str] {
        &["installAppMgr"]
    }

    async fn invoke(
        &self,
        host: &ControlHost,
        method: &str,
        args: &[String],
    ) -> Result<(), ControlError> {
        let url = first_arg(self.name(), method, args)?;

        host.sink.log_exploit_event(
            &host.page_url,
            MODULE,
            "Arbitrary File Download and Execute",
            Some(CVE),
            Some(json!({ "url": url })),
            true,
        );
        host.sink.add_behavior_warning(
            &format!("[{}] Fetching from URL {}", MODULE, url),
            None,
            AnalysisMethod::DynamicAnalysis,
        );

        fetch_exploit_url(host, MODULE, url, CVE).await;
        Ok(())
    }
}
