// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Office OCX Control
 * OpenWebFile arbitrary program execution emulation (BID-33243)
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use async_trait::async_trait;
use serde_json::json;

use super::{fetch_exploit_url, first_arg, ControlCtor, ControlHost, VulnerableControl};
use crate::errors::ControlError;
use crate::types::AnalysisMethod;

const MODULE: &str = "Office OCX ActiveX";

pub const IDENTIFIERS: (&[&str], ControlCtor) = (
    &[
        "OfficeOCX.Word.1",
        "OfficeOCX.Excel.1",
        "OfficeOCX.PowerPoint.1",
    ],
    || Box::new(OfficeOcx),
);

/// Multiple Office OCX ActiveX controls `OpenWebFile()` arbitrary program
/// execution vulnerability, BID-33243.
pub struct OfficeOcx;

#[async_trait]
impl VulnerableControl for OfficeOcx {
    fn name(&self) -> &'static str {
        "OfficeOCX"
    }

    fn methods(&self) -> &'static [&'static str] {
        &["OpenWebFile"]
    }

    async fn invoke(
        &self,
        host: &ControlHost,
        method: &str,
        args: &[String],
    ) -> Result<(), ControlError> {
        let file = first_arg(self.name(), method, args)?;

        host.sink.add_behavior_warning(
            &format!("[{}] OpenWebFile Arbitrary Program Execution Vulnerability", MODULE),
            None,
            AnalysisMethod::DynamicAnalysis,
        );
        host.sink.add_behavior_warning(
            &format!("[{}] Fetching from URL {}", MODULE, file),
            None,
            AnalysisMethod::DynamicAnalysis,
        );
        host.sink.log_exploit_event(
            &host.page_url,
            MODULE,
            "OpenWebFile Arbitrary Program Execution Vulnerability",
            None,
            Some(json!({ "url": file })),
            false,
        );

        fetch_exploit_url(host, MODULE, file, "Office OCX Exploit").await;
        Ok(())
    }
}
