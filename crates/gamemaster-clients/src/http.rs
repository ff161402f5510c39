//! Shared JSON-over-HTTP plumbing for the service clients.

use std::time::Duration;

use gamemaster_core::error::{GmError, ServiceKind};
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::retry::RetryPolicy;

/// A reqwest client bound to one service's base URL.
#[derive(Debug, Clone)]
pub(crate) struct ServiceHttp {
    client: reqwest::Client,
    base_url: String,
    service: ServiceKind,
    health_timeout: Duration,
    retry: RetryPolicy,
}

impl ServiceHttp {
    pub(crate) fn new(
        service: ServiceKind,
        base_url: &str,
        timeout: Duration,
        health_timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, GmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                GmError::Infrastructure(format!("failed to build {service} HTTP client: {e}"))
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            service,
            health_timeout,
            retry,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// POSTs `body` to `path` under the retry policy and decodes the reply.
    pub(crate) async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, GmError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.url(path);
        let url = url.as_str();
        self.retry
            .run(self.service, path, move || self.post_once(url, body))
            .await
    }

    async fn post_once<B, R>(&self, url: &str, body: &B) -> Result<R, GmError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(GmError::Upstream {
                service: self.service,
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.transport(&e))?;
        serde_json::from_slice(&bytes).map_err(|e| GmError::Decode {
            service: self.service,
            message: e.to_string(),
        })
    }

    /// `GET /health` with the short health timeout. Only `200 OK` counts
    /// as healthy.
    pub(crate) async fn check_health(&self) -> Result<bool, GmError> {
        let response = self
            .client
            .get(self.url("/health"))
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(|e| self.transport(&e))?;
        Ok(response.status() == StatusCode::OK)
    }

    fn transport(&self, error: &reqwest::Error) -> GmError {
        GmError::Transport {
            service: self.service,
            message: error.to_string(),
        }
    }
}
