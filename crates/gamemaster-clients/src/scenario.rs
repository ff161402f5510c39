//! Scenario-engine client.

use async_trait::async_trait;
use gamemaster_core::error::{GmError, ServiceKind};
use gamemaster_core::outcome::{RuleOutcome, ScenarioSuggestion};
use gamemaster_core::ports::ScenarioService;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::http::ServiceHttp;

const CHECK_PATH: &str = "/api/v1/scenario/check";

/// `ScenarioService` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpScenarioService {
    http: ServiceHttp,
}

impl HttpScenarioService {
    /// Creates a client for `config.scenario_service_url`.
    ///
    /// # Errors
    ///
    /// Returns `GmError::Infrastructure` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, GmError> {
        Ok(Self {
            http: ServiceHttp::new(
                ServiceKind::Scenario,
                &config.scenario_service_url,
                config.service_timeout,
                config.health_timeout,
                config.retry,
            )?,
        })
    }
}

#[derive(Serialize)]
struct ScenarioCheckBody<'a> {
    input_text: &'a str,
    rule_outcome: &'a RuleOutcome,
}

#[async_trait]
impl ScenarioService for HttpScenarioService {
    async fn check(
        &self,
        input_text: &str,
        rule_outcome: &RuleOutcome,
    ) -> Result<ScenarioSuggestion, GmError> {
        let body = ScenarioCheckBody {
            input_text,
            rule_outcome,
        };
        self.http.post_json(CHECK_PATH, &body).await
    }

    async fn check_health(&self) -> Result<bool, GmError> {
        self.http.check_health().await
    }
}
