// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - AOL ICQ Control
 * DownloadAgent arbitrary file download emulation (CVE-2006-5650)
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use async_trait::async_trait;
use serde_json::json;

use super::{fetch_exploit_url, first_arg, ControlCtor, ControlHost, VulnerableControl};
use crate::errors::ControlError;
use crate::types::AnalysisMethod;

const MODULE: &str = "AOL ICQ ActiveX";
const CVE: &str = "CVE-2006-5650";

pub const IDENTIFIERS: (&[&str], ControlCtor) = (
    &[
        "ICQPhone.SipxPhoneManager.1",
        "clsid:{54BDE6EC-F42F-4500-AC46-905177444300}",
    ],
    || Box::new(AolIcq),
);

/// AOL ICQ ActiveX arbitrary file download and execute, CVE-2006-5650.
pub struct AolIcq;

#[async_trait]
impl VulnerableControl for AolIcq {
    fn name(&self) -> &'static str {
        "AolICQ"
    }

    fn methods(&self) -> &'static [&'static str] {
        &["DownloadAgent"]
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
            &format!("[{}] Fetching from URL: {}", MODULE, url),
            None,
            AnalysisMethod::DynamicAnalysis,
        );

        fetch_exploit_url(host, MODULE, url, "AOL ICQ Exploit").await;
        Ok(())
    }
}
