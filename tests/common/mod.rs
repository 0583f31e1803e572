// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/*
 * Bountyy Oy - Test Doubles
 * Scripted navigator, script engine and emulator for the integration suites
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use url::Url;

use katiska_honeyclient::config::AnalysisOptions;
use katiska_honeyclient::errors::{EvalError, FetchError};
use katiska_honeyclient::events::SyntheticEvent;
use katiska_honeyclient::logging::MemorySink;
use katiska_honeyclient::navigator::{FetchOptions, FetchedResource, Navigator};
use katiska_honeyclient::script::{HandlerRef, ScriptContext, ScriptEngine};
use katiska_honeyclient::shellcode::CpuEmulator;
use katiska_honeyclient::{Honeyclient, Personality};

/// Install the fmt subscriber once so failing tests show engine traces
/// under `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One canned response.
#[derive(Clone)]
pub struct Route {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Navigator serving canned responses from a URL map and recording every
/// request. Unknown URLs come back as 404.
pub struct StaticNavigator {
    routes: HashMap<String, Route>,
    requests: Mutex<Vec<(String, String)>>,
}

impl StaticNavigator {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn route(mut self, url: &str, body: &str) -> Self {
        self.routes.insert(
            url.to_string(),
            Route {
                status: 200,
                content_type: Some("text/html".to_string()),
                body: body.as_bytes().to_vec(),
            },
        );
        self
    }

    pub fn route_raw(mut self, url: &str, status: u16, content_type: Option<&str>, body: &[u8]) -> Self {
        self.routes.insert(
            url.to_string(),
            Route {
                status,
                content_type: content_type.map(str::to_string),
                body: body.to_vec(),
            },
        );
        self
    }

    /// Every `(url, kind)` pair fetched so far.
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().expect("requests poisoned").clone()
    }

    pub fn requests_for_kind(&self, kind: &str) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|(_, k)| k == kind)
            .map(|(url, _)| url)
            .collect()
    }
}

#[async_trait]
impl Navigator for StaticNavigator {
    async fn fetch(
        &self,
        base: &str,
        url: &str,
        options: FetchOptions,
    ) -> Result<FetchedResource, FetchError> {
        let resolved = self
            .normalize_url(base, url)
            .unwrap_or_else(|| url.to_string());
        self.requests
            .lock()
            .expect("requests poisoned")
            .push((resolved.clone(), options.kind.clone()));

        match self.routes.get(&resolved) {
            Some(route) => Ok(FetchedResource {
                status: route.status,
                final_url: resolved,
                content_type: route.content_type.clone(),
                body: route.body.clone(),
            }),
            None => Ok(FetchedResource {
                status: 404,
                final_url: resolved,
                content_type: None,
                body: Vec::new(),
            }),
        }
    }

    fn normalize_url(&self, base: &str, url: &str) -> Option<String> {
        if let Ok(absolute) = Url::parse(url) {
            return Some(absolute.to_string());
        }
        Url::parse(base).ok()?.join(url).ok().map(|u| u.to_string())
    }
}

type Action = Box<dyn Fn(&mut ScriptContext<'_>) + Send + Sync>;

/// One recorded handler invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub source: String,
    pub arg_count: usize,
    /// Whether the `event` context global was populated at call time.
    pub event_global: bool,
    pub event_type: Option<String>,
}

/// Script engine double: records evaluations and invocations, and runs
/// programmable actions against the script context so tests can exercise
/// DOM mutation, fragment capture, clicks and location changes.
#[derive(Default)]
pub struct ScriptedEngine {
    next_handler: AtomicU64,
    eval_actions: Mutex<Vec<(String, Action)>>,
    invoke_actions: Mutex<Vec<(String, Action)>>,
    evaluations: Mutex<Vec<String>>,
    invocations: Mutex<Vec<Invocation>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` whenever evaluated source contains `needle`.
    pub fn on_eval(self, needle: &str, action: impl Fn(&mut ScriptContext<'_>) + Send + Sync + 'static) -> Self {
        self.eval_actions
            .lock()
            .expect("actions poisoned")
            .push((needle.to_string(), Box::new(action)));
        self
    }

    /// Run `action` whenever an invoked handler's source contains `needle`.
    pub fn on_invoke(self, needle: &str, action: impl Fn(&mut ScriptContext<'_>) + Send + Sync + 'static) -> Self {
        self.invoke_actions
            .lock()
            .expect("actions poisoned")
            .push((needle.to_string(), Box::new(action)));
        self
    }

    pub fn evaluations(&self) -> Vec<String> {
        self.evaluations.lock().expect("evaluations poisoned").clone()
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().expect("invocations poisoned").clone()
    }
}

impl ScriptEngine for ScriptedEngine {
    fn evaluate(&self, ctx: &mut ScriptContext<'_>, source: &str) -> Result<(), EvalError> {
        self.evaluations
            .lock()
            .expect("evaluations poisoned")
            .push(source.to_string());

        let actions = self.eval_actions.lock().expect("actions poisoned");
        for (needle, action) in actions.iter() {
            if source.contains(needle.as_str()) {
                action(ctx);
            }
        }
        Ok(())
    }

    fn compile_handler(
        &self,
        _ctx: &mut ScriptContext<'_>,
        source: &str,
    ) -> Result<HandlerRef, EvalError> {
        Ok(HandlerRef {
            id: self.next_handler.fetch_add(1, Ordering::Relaxed),
            source: source.to_string(),
        })
    }

    fn invoke_handler(
        &self,
        ctx: &mut ScriptContext<'_>,
        handler: &HandlerRef,
        args: &[SyntheticEvent],
    ) -> Result<(), EvalError> {
        let event_type = args
            .first()
            .map(|e| e.event_type.clone())
            .or_else(|| ctx.event.as_ref().map(|e| e.event_type.clone()));
        self.invocations
            .lock()
            .expect("invocations poisoned")
            .push(Invocation {
                source: handler.source.clone(),
                arg_count: args.len(),
                event_global: ctx.event.is_some(),
                event_type,
            });

        let actions = self.invoke_actions.lock().expect("actions poisoned");
        for (needle, action) in actions.iter() {
            if handler.source.contains(needle.as_str()) {
                action(ctx);
            }
        }
        Ok(())
    }
}

/// Emulator double returning a canned profile when the decoded bytes
/// contain a needle.
#[derive(Default)]
pub struct ScriptedEmulator {
    profiles: Vec<(Vec<u8>, String)>,
}

impl ScriptedEmulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile_when(mut self, needle: &[u8], profile: &str) -> Self {
        self.profiles.push((needle.to_vec(), profile.to_string()));
        self
    }
}

impl CpuEmulator for ScriptedEmulator {
    fn profile(&self, code: &[u8]) -> Option<String> {
        self.profiles
            .iter()
            .find(|(needle, _)| code.windows(needle.len().max(1)).any(|w| w == &needle[..]))
            .map(|(_, profile)| profile.clone())
    }
}

/// A fully doubled client: static navigator, scripted engine, memory sink.
pub fn scripted_client(
    personality: Personality,
    options: AnalysisOptions,
    navigator: Arc<StaticNavigator>,
    script: Arc<ScriptedEngine>,
) -> (Honeyclient, Arc<MemorySink>) {
    init_tracing();
    let sink = Arc::new(MemorySink::new());
    let client = Honeyclient::with_sink(personality, options, sink.clone())
        .expect("client setup")
        .with_navigator(navigator)
        .with_script_engine(script);
    (client, sink)
}
