// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Navigation Integration Tests
 * Location changes, anchor clicks, branch forking and depth bounds
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

mod common;

use std::sync::Arc;

use katiska_honeyclient::{AnalysisOptions, Personality};

use common::{ScriptedEngine, StaticNavigator};

#[tokio::test]
async fn location_change_navigates_and_logs_redirection() {
    let navigator = Arc::new(
        StaticNavigator::new()
            .route("http://next.example/", r#"<body><script>arrived()</script></body>"#),
    );
    let script = Arc::new(ScriptedEngine::new().on_eval("go()", |ctx| {
        ctx.set_location("http://next.example/");
    }));
    let (client, sink) = common::scripted_client(
        Personality::winxp_ie60(),
        AnalysisOptions::default(),
        navigator.clone(),
        script.clone(),
    );

    client
        .analyze_response(
            "http://landing.example/",
            r#"<body><script>go()</script></body>"#,
        )
        .await
        .unwrap();

    assert!(sink.warnings().iter().any(|w| w
        .description
        .contains("[HREF Redirection (document.location)]")
        && w.description.contains("http://next.example/")));
    assert!(sink
        .connections()
        .iter()
        .any(|c| c.method == "href" && c.destination == "http://next.example/"));
    assert_eq!(
        navigator.requests_for_kind("href"),
        vec!["http://next.example/".to_string()]
    );
    assert!(script.evaluations().iter().any(|s| s.contains("arrived()")));
}

#[tokio::test]
async fn self_referential_location_change_is_skipped() {
    let navigator = Arc::new(StaticNavigator::new());
    let script = Arc::new(ScriptedEngine::new().on_eval("go()", |ctx| {
        ctx.set_location("http://landing.example/");
    }));
    let (client, sink) = common::scripted_client(
        Personality::winxp_ie60(),
        AnalysisOptions::default(),
        navigator.clone(),
        script.clone(),
    );

    client
        .analyze_response(
            "http://landing.example/",
            r#"<body><script>go()</script></body>"#,
        )
        .await
        .unwrap();

    assert!(navigator.requests_for_kind("href").is_empty());
    assert!(!sink
        .warnings()
        .iter()
        .any(|w| w.description.contains("HREF Redirection")));
}

#[tokio::test]
async fn clicked_anchor_is_followed_in_click_order() {
    let navigator = Arc::new(
        StaticNavigator::new()
            .route("http://first.example/", r#"<body><script>first()</script></body>"#)
            .route("http://second.example/", r#"<body><script>second()</script></body>"#),
    );
    // Click the second anchor before the first; resolution must follow the
    // click order, not document order.
    let script = Arc::new(ScriptedEngine::new().on_eval("clickem()", |ctx| {
        let anchors = ctx.document.elements_by_tag("a");
        ctx.document.mark_clicked(anchors[1]);
        ctx.document.mark_clicked(anchors[0]);
    }));
    let (client, _sink) = common::scripted_client(
        Personality::winxp_ie60(),
        AnalysisOptions::default(),
        navigator.clone(),
        script.clone(),
    );

    client
        .analyze_response(
            "http://landing.example/",
            r#"<body>
                <a href="http://first.example/">one</a>
                <a href="http://second.example/">two</a>
                <script>clickem()</script>
            </body>"#,
        )
        .await
        .unwrap();

    assert_eq!(
        navigator.requests_for_kind("anchor"),
        vec![
            "http://second.example/".to_string(),
            "http://first.example/".to_string()
        ]
    );
    let evals = script.evaluations();
    let second_pos = evals.iter().position(|s| s.contains("second()")).unwrap();
    let first_pos = evals.iter().position(|s| s.contains("first()")).unwrap();
    assert!(second_pos < first_pos);
}

#[tokio::test]
async fn blank_target_anchor_forks_a_joined_branch() {
    let navigator = Arc::new(
        StaticNavigator::new()
            .route("http://popup.example/", r#"<body><script>popup()</script></body>"#),
    );
    let script = Arc::new(ScriptedEngine::new().on_eval("clickit()", |ctx| {
        let a = ctx.document.elements_by_tag("a")[0];
        ctx.document.mark_clicked(a);
    }));
    let (client, _sink) = common::scripted_client(
        Personality::winxp_ie60(),
        AnalysisOptions::default(),
        navigator.clone(),
        script.clone(),
    );

    client
        .analyze_response(
            "http://landing.example/",
            r#"<body>
                <a href="http://popup.example/" target="_blank">pop</a>
                <script>clickit()</script>
            </body>"#,
        )
        .await
        .unwrap();

    // analyze_response returns only after every forked branch joined, so the
    // branch's work is fully visible here.
    assert_eq!(
        navigator.requests_for_kind("anchor"),
        vec!["http://popup.example/".to_string()]
    );
    assert!(script.evaluations().iter().any(|s| s.contains("popup()")));
}

#[tokio::test]
async fn iframe_recursion_stops_at_the_depth_bound() {
    let loop_body = r#"<body><iframe src="http://loop.example/b"></iframe></body>"#;
    let navigator = Arc::new(StaticNavigator::new().route("http://loop.example/b", loop_body));
    let script = Arc::new(ScriptedEngine::new());
    let (client, _sink) = common::scripted_client(
        Personality::winxp_ie60(),
        AnalysisOptions::default(),
        navigator.clone(),
        script,
    );

    client
        .analyze_response("http://loop.example/b", loop_body)
        .await
        .unwrap();

    // Depth bound 10: engines at depths 0..=10 each fetch the frame once,
    // the deepest one refuses to descend further.
    assert_eq!(navigator.requests_for_kind("iframe").len(), 11);
}

#[tokio::test]
async fn frame_id_registers_a_window() {
    use katiska_honeyclient::controls::ControlRegistry;
    use katiska_honeyclient::handlers::MimeHandlerRegistry;
    use katiska_honeyclient::logging::MemorySink;
    use katiska_honeyclient::parser::{DomParser, HtmlDomParser};
    use katiska_honeyclient::script::NullScriptEngine;
    use katiska_honeyclient::shellcode::NullEmulator;
    use katiska_honeyclient::{BrowsingContext, Collaborators, ContextEngine, RunState};

    let navigator = Arc::new(
        StaticNavigator::new().route("http://frame.example/inner", "<body></body>"),
    );
    let parser = Arc::new(HtmlDomParser::new());
    let deps = Collaborators {
        navigator: navigator.clone(),
        parser: parser.clone(),
        script: Arc::new(NullScriptEngine::new()),
        emulator: Arc::new(NullEmulator),
        sink: Arc::new(MemorySink::new()),
        controls: Arc::new(ControlRegistry::with_defaults()),
        mime_handlers: Arc::new(MimeHandlerRegistry::new()),
        vbs_transpiler: None,
        options: Arc::new(AnalysisOptions::default()),
    };

    let run = Arc::new(RunState::new());
    let document = parser
        .parse(r#"<body><iframe id="payload" src="http://frame.example/inner"></iframe></body>"#);
    let context = BrowsingContext::new(
        "http://landing.example/".to_string(),
        document,
        Arc::new(Personality::winxp_ie60()),
    );
    ContextEngine::new(deps, Arc::clone(&run), context, 0)
        .run()
        .await;

    let window = run.window("payload").expect("window registered");
    assert_eq!(window.url, "http://frame.example/inner");
    // The frame ran as its own context, not the top-level one.
    assert_ne!(window.context, 0);
    assert_eq!(
        navigator.requests_for_kind("iframe"),
        vec!["http://frame.example/inner".to_string()]
    );
}
