// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - EnjoySAP Control
 * LaunchGui/PrepareToPostHTML overflow checks and Comp_Download emulation
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use super::{fetch_exploit_url, first_arg, ControlCtor, ControlHost, VulnerableControl};
use crate::errors::ControlError;
use crate::types::AnalysisMethod;

const MODULE: &str = "EnjoySAP ActiveX";

/// Argument sizes beyond these overflow the real control's stack buffers.
const LAUNCH_GUI_OVERFLOW: usize = 1500;
const PREPARE_TO_POST_OVERFLOW: usize = 1000;

pub const IDENTIFIERS: (&[&str], ControlCtor) = (
    &[
        "kweditcontrol.kwedit.1",
        "clsid:{B01952B0-AF66-11D1-B10D-0060086F6D97}",
    ],
    || Box::new(EnjoySap),
);

/// EnjoySAP (SAP GUI) ActiveX control: stack overflows in `LaunchGui` and
/// `PrepareToPostHTML`, arbitrary download through `Comp_Download`.
pub struct EnjoySap;

#[async_trait]
impl VulnerableControl for EnjoySap {
    fn name(&self) -> &'static str {
        "EnjoySAP"
    }

    fn methods(&self) -> &'static [&'static str] {
        &["LaunchGui", "PrepareToPostHTML", "Comp_Download"]
    }

    async fn invoke(
        &self,
        host: &ControlHost,
        method: &str,
        args: &[String],
    ) -> Result<(), ControlError> {
        match method {
            "LaunchGui" => {
                let arg0 = first_arg(self.name(), method, args)?;
                if arg0.len() > LAUNCH_GUI_OVERFLOW {
                    host.sink.log_exploit_event(
                        &host.page_url,
                        MODULE,
                        "LaunchGui overflow in arg0",
                        None,
                        None,
                        true,
                    );
                }
            }
            "PrepareToPostHTML" => {
                let arg0 = first_arg(self.name(), method, args)?;
                if arg0.len() > PREPARE_TO_POST_OVERFLOW {
                    host.sink.log_exploit_event(
                        &host.page_url,
                        MODULE,
                        "PrepareToPostHTML overflow in arg0",
                        None,
                        None,
                        true,
                    );
                }
            }
            "Comp_Download" => {
                let url = first_arg(self.name(), method, args)?;
                warn!(url, "Comp_Download invoked");

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

                fetch_exploit_url(host, MODULE, url, "EnjoySAP Exploit").await;
            }
            _ => unreachable!("method set checked by ControlInstance"),
        }
        Ok(())
    }
}
