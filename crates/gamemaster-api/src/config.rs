//! Server configuration, read from environment variables.

use std::net::{IpAddr, SocketAddr};

use gamemaster_clients::ClientConfig;
use gamemaster_clients::config::parse_var;
use gamemaster_turn::application::engine::EngineSettings;
use gamemaster_turn::application::pipeline::PipelineSettings;

use crate::error::AppError;

/// Everything the server binary needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// `PostgreSQL` connection string.
    pub database_url: String,
    /// Pool size.
    pub database_max_connections: u32,
    /// Listen address.
    pub host: IpAddr,
    /// Listen port.
    pub port: u16,
    /// Downstream service clients.
    pub clients: ClientConfig,
    /// Engine tunables.
    pub engine: EngineSettings,
}

impl ApiConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or any
    /// variable fails to parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or any
    /// variable fails to parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| AppError::Config("DATABASE_URL must be set".to_owned()))?;

        let pipeline_defaults = PipelineSettings::default();
        let pipeline = PipelineSettings {
            history_window: parse_var(&lookup, "HISTORY_WINDOW", pipeline_defaults.history_window)?,
            narrative_max_attempts: parse_var(
                &lookup,
                "NARRATIVE_MAX_ATTEMPTS",
                pipeline_defaults.narrative_max_attempts,
            )?,
        };
        if pipeline.narrative_max_attempts == 0 {
            return Err(AppError::Config(
                "NARRATIVE_MAX_ATTEMPTS must be at least 1".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            database_max_connections: parse_var(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            host: parse_var(&lookup, "HOST", IpAddr::from([0, 0, 0, 0]))?,
            port: parse_var(&lookup, "PORT", 3000)?,
            clients: ClientConfig::from_lookup(&lookup)?,
            engine: EngineSettings {
                pipeline,
                ..EngineSettings::default()
            },
        })
    }

    /// The socket address to bind.
    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_apply_when_only_database_url_is_set() {
        // Arrange
        let lookup = lookup_from(&[("DATABASE_URL", "postgres://localhost/gm")]);

        // Act
        let config = ApiConfig::from_lookup(lookup).unwrap();

        // Assert
        assert_eq!(config.database_url, "postgres://localhost/gm");
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.listen_addr().to_string(), "0.0.0.0:3000");
        assert_eq!(config.clients, ClientConfig::default());
        assert_eq!(config.engine, EngineSettings::default());
    }

    #[test]
    fn test_missing_database_url_is_rejected() {
        // Arrange
        let lookup = lookup_from(&[("PORT", "8080")]);

        // Act
        let result = ApiConfig::from_lookup(lookup);

        // Assert
        assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("DATABASE_URL")));
    }

    #[test]
    fn test_overrides_are_parsed() {
        // Arrange
        let lookup = lookup_from(&[
            ("DATABASE_URL", "postgres://db/gm"),
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("HISTORY_WINDOW", "2"),
            ("NARRATIVE_MAX_ATTEMPTS", "5"),
            ("LLM_MODEL_NAME", "local-model"),
        ]);

        // Act
        let config = ApiConfig::from_lookup(lookup).unwrap();

        // Assert
        assert_eq!(config.listen_addr().to_string(), "127.0.0.1:8080");
        assert_eq!(config.engine.pipeline.history_window, 2);
        assert_eq!(config.engine.pipeline.narrative_max_attempts, 5);
        assert_eq!(config.clients.llm_model, "local-model");
    }

    #[test]
    fn test_unparsable_port_is_rejected() {
        // Arrange
        let lookup = lookup_from(&[("DATABASE_URL", "postgres://db/gm"), ("PORT", "http")]);

        // Act
        let result = ApiConfig::from_lookup(lookup);

        // Assert
        assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("PORT")));
    }

    #[test]
    fn test_zero_narrative_attempts_is_rejected() {
        // Arrange
        let lookup = lookup_from(&[
            ("DATABASE_URL", "postgres://db/gm"),
            ("NARRATIVE_MAX_ATTEMPTS", "0"),
        ]);

        // Act
        let result = ApiConfig::from_lookup(lookup);

        // Assert
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
