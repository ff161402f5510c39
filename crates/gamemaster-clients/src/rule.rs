//! Rules-engine client.

use async_trait::async_trait;
use gamemaster_core::diff::EntityDiff;
use gamemaster_core::error::{GmError, ServiceKind};
use gamemaster_core::outcome::RuleOutcome;
use gamemaster_core::ports::{RuleCheckRequest, RuleService};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::ClientConfig;
use crate::http::ServiceHttp;

const CHECK_PATH: &str = "/api/v1/rule/check";

/// `RuleService` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRuleService {
    http: ServiceHttp,
}

impl HttpRuleService {
    /// Creates a client for `config.rule_service_url`.
    ///
    /// # Errors
    ///
    /// Returns `GmError::Infrastructure` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, GmError> {
        Ok(Self {
            http: ServiceHttp::new(
                ServiceKind::Rule,
                &config.rule_service_url,
                config.service_timeout,
                config.health_timeout,
                config.retry,
            )?,
        })
    }
}

#[async_trait]
impl RuleService for HttpRuleService {
    async fn check(&self, request: &RuleCheckRequest) -> Result<RuleOutcome, GmError> {
        let envelope: RuleCheckEnvelope = self.http.post_json(CHECK_PATH, request).await?;
        tracing::debug!(
            session_id = %request.session_id,
            status = envelope.status.as_deref().unwrap_or_default(),
            message = envelope.message.as_deref().unwrap_or_default(),
            "rule check answered"
        );
        Ok(envelope.data.into())
    }

    async fn check_health(&self) -> Result<bool, GmError> {
        self.http.check_health().await
    }
}

#[derive(Debug, Deserialize)]
struct RuleCheckEnvelope {
    #[serde(default)]
    status: Option<String>,
    data: RuleCheckData,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RuleCheckData {
    success: bool,
    #[serde(default, alias = "description")]
    reason: String,
    #[serde(default)]
    phase_type: Option<String>,
    #[serde(default)]
    suggested: SuggestedChanges,
    #[serde(default)]
    value_range: Option<Map<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct SuggestedChanges {
    #[serde(default)]
    diffs: Vec<EntityDiff>,
    #[serde(default)]
    relations: Vec<Value>,
}

impl From<RuleCheckData> for RuleOutcome {
    fn from(data: RuleCheckData) -> Self {
        Self {
            success: data.success,
            reason: data.reason,
            suggested_diffs: data.suggested.diffs,
            value_range: data.value_range,
            phase_type: data.phase_type,
            suggested_relations: data.suggested.relations,
        }
    }
}
