//! Client configuration, read from environment variables.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::retry::RetryPolicy;

/// A configuration variable was present but unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value for {name}: {value:?} ({reason})")]
pub struct ConfigError {
    /// Variable name.
    pub name: &'static str,
    /// Raw value as found.
    pub value: String,
    /// Why it was rejected.
    pub reason: String,
}

/// Endpoints, timeouts and retry settings for the four service clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Rules engine base URL.
    pub rule_service_url: String,
    /// Scenario engine base URL.
    pub scenario_service_url: String,
    /// State store base URL.
    pub state_service_url: String,
    /// LLM gateway base URL.
    pub llm_gateway_url: String,
    /// Model name sent with every chat completion.
    pub llm_model: String,
    /// Per-call timeout for the rule, scenario and state services.
    pub service_timeout: Duration,
    /// Per-call timeout for chat completions.
    pub llm_timeout: Duration,
    /// Timeout for `/health` probes.
    pub health_timeout: Duration,
    /// Retry policy for business calls.
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rule_service_url: "http://rule-engine:8050".to_owned(),
            scenario_service_url: "http://scenario-service:8040".to_owned(),
            state_service_url: "http://state-manager:8030".to_owned(),
            llm_gateway_url: "http://llm-gateway:8060".to_owned(),
            llm_model: "gemini-2.0-flash-lite".to_owned(),
            service_timeout: Duration::from_secs(10),
            llm_timeout: Duration::from_secs(120),
            health_timeout: Duration::from_secs(3),
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to an unparsable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, falling back to the
    /// defaults for unset variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to an unparsable value,
    /// or if `RETRY_MAX_ATTEMPTS` is zero.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let max_attempts: u32 = parse_var(&lookup, "RETRY_MAX_ATTEMPTS", defaults.retry.max_attempts)?;
        if max_attempts == 0 {
            return Err(ConfigError {
                name: "RETRY_MAX_ATTEMPTS",
                value: "0".to_owned(),
                reason: "at least one attempt is required".to_owned(),
            });
        }

        Ok(Self {
            rule_service_url: base_url(&lookup, "RULE_SERVICE_URL", &defaults.rule_service_url),
            scenario_service_url: base_url(
                &lookup,
                "SCENARIO_SERVICE_URL",
                &defaults.scenario_service_url,
            ),
            state_service_url: base_url(&lookup, "STATE_SERVICE_URL", &defaults.state_service_url),
            llm_gateway_url: base_url(&lookup, "LLM_GATEWAY_URL", &defaults.llm_gateway_url),
            llm_model: lookup("LLM_MODEL_NAME").unwrap_or(defaults.llm_model),
            service_timeout: millis(&lookup, "SERVICE_TIMEOUT_MS", defaults.service_timeout)?,
            llm_timeout: millis(&lookup, "LLM_TIMEOUT_MS", defaults.llm_timeout)?,
            health_timeout: millis(&lookup, "HEALTH_TIMEOUT_MS", defaults.health_timeout)?,
            retry: RetryPolicy {
                max_attempts,
                initial_backoff: millis(
                    &lookup,
                    "RETRY_INITIAL_BACKOFF_MS",
                    defaults.retry.initial_backoff,
                )?,
                max_backoff: millis(&lookup, "RETRY_MAX_BACKOFF_MS", defaults.retry.max_backoff)?,
            },
        })
    }
}

/// Parses `name` as `T`, or returns `default` when unset.
///
/// # Errors
///
/// Returns [`ConfigError`] if the variable is set but does not parse.
pub fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError {
            name,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn millis(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    parse_var(lookup, name, default_ms).map(Duration::from_millis)
}

fn base_url(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    lookup(name)
        .unwrap_or_else(|| default.to_owned())
        .trim_end_matches('/')
        .to_owned()
}
