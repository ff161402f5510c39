//! State-store client.

use async_trait::async_trait;
use gamemaster_core::diff::EntityDiff;
use gamemaster_core::error::{GmError, ServiceKind};
use gamemaster_core::ports::{CommitReceipt, StateService};
use gamemaster_core::snapshot::WorldSnapshot;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::http::ServiceHttp;

const SNAPSHOT_PATH: &str = "/api/v1/state/snapshot";
const COMMIT_PATH: &str = "/api/v1/state/commit";

/// `StateService` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpStateService {
    http: ServiceHttp,
}

impl HttpStateService {
    /// Creates a client for `config.state_service_url`.
    ///
    /// # Errors
    ///
    /// Returns `GmError::Infrastructure` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, GmError> {
        Ok(Self {
            http: ServiceHttp::new(
                ServiceKind::State,
                &config.state_service_url,
                config.service_timeout,
                config.health_timeout,
                config.retry,
            )?,
        })
    }
}

#[derive(Serialize)]
struct SnapshotBody<'a> {
    session_id: &'a str,
}

#[derive(Serialize)]
struct CommitBody<'a> {
    turn_id: &'a str,
    diffs: &'a [EntityDiff],
}

#[async_trait]
impl StateService for HttpStateService {
    async fn get_state(&self, session_id: &str) -> Result<WorldSnapshot, GmError> {
        self.http
            .post_json(SNAPSHOT_PATH, &SnapshotBody { session_id })
            .await
    }

    async fn commit(&self, turn_id: &str, diffs: &[EntityDiff]) -> Result<CommitReceipt, GmError> {
        self.http
            .post_json(COMMIT_PATH, &CommitBody { turn_id, diffs })
            .await
    }

    async fn check_health(&self) -> Result<bool, GmError> {
        self.http.check_health().await
    }
}
