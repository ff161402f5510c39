#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use gamemaster_api::app;
use gamemaster_api::state::AppState;
use gamemaster_core::play_log::PlayLogRepository;
use gamemaster_test_support::{
    FixedClock, InMemoryPlayLog, RecordingStateService, ScriptedLlm, StubRuleService,
    StubScenarioService, diff, rule_outcome, scenario_suggestion, snapshot_of,
};
use gamemaster_turn::application::engine::{EngineSettings, GameEngine};
use gamemaster_turn::application::pipeline::ServicePorts;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

/// Fakes behind a test app; override fields before calling [`TestServices::app`].
pub struct TestServices {
    pub rule: StubRuleService,
    pub scenario: StubScenarioService,
    pub state: RecordingStateService,
    pub llm: ScriptedLlm,
    pub play_log: Arc<dyn PlayLogRepository>,
}

impl Default for TestServices {
    fn default() -> Self {
        Self {
            rule: StubRuleService::returning(rule_outcome(vec![diff(
                "player",
                json!({"hp": -10}),
            )])),
            scenario: StubScenarioService::returning(scenario_suggestion(vec![], None)),
            state: RecordingStateService::new(snapshot_of(&["player"])),
            llm: ScriptedLlm::always("The torch gutters."),
            play_log: Arc::new(InMemoryPlayLog::new()),
        }
    }
}

impl TestServices {
    /// Builds the full router over these fakes.
    pub fn app(self) -> Router {
        let ports = ServicePorts {
            rule: Arc::new(self.rule),
            scenario: Arc::new(self.scenario),
            state: Arc::new(self.state),
            llm: Arc::new(self.llm),
        };
        let engine = GameEngine::new(
            ports,
            self.play_log,
            Arc::new(FixedClock::at("2026-01-15T10:00:00Z")),
            EngineSettings::default(),
        );
        app(AppState::new(Arc::new(engine)))
    }
}

/// Router over the default fakes.
pub fn build_test_app() -> Router {
    TestServices::default().app()
}

/// Send a POST request with a JSON body and return the status and parsed body.
pub async fn post_json(app: Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a GET request and return the status and parsed body.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
