//! Error model for turn processing.

use std::fmt;

use thiserror::Error;

/// External collaborator an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    /// Rules engine.
    Rule,
    /// Scenario-consistency engine.
    Scenario,
    /// World-state store.
    State,
    /// Language-model gateway.
    Llm,
}

impl ServiceKind {
    /// Short lowercase name used in logs and status reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rule => "rule",
            Self::Scenario => "scenario",
            Self::State => "state",
            Self::Llm => "llm",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type for the turn engine.
#[derive(Debug, Clone, Error)]
pub enum GmError {
    /// The request never produced an HTTP response (connect, timeout, reset).
    #[error("{service} service unreachable: {message}")]
    Transport {
        /// The service being called.
        service: ServiceKind,
        /// Underlying transport error.
        message: String,
    },

    /// The service answered with a non-success status.
    #[error("{service} service returned {status}: {body}")]
    Upstream {
        /// The service being called.
        service: ServiceKind,
        /// HTTP status code.
        status: u16,
        /// Response body, as far as it could be read.
        body: String,
    },

    /// The service answered, but the payload did not match the contract.
    #[error("{service} service response could not be decoded: {message}")]
    Decode {
        /// The service being called.
        service: ServiceKind,
        /// Decoder error.
        message: String,
    },

    /// A stage ran without the output of an earlier stage, or tried to
    /// overwrite one. Always an orchestration bug.
    #[error("turn invariant violated: {0}")]
    Invariant(String),

    /// Play-log persistence failure.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),

    /// Caller-supplied input was rejected.
    #[error("validation error: {0}")]
    Validation(String),
}

impl GmError {
    /// Whether the failure is a transport-level fault worth retrying.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// The external service involved, if any.
    #[must_use]
    pub const fn service(&self) -> Option<ServiceKind> {
        match self {
            Self::Transport { service, .. }
            | Self::Upstream { service, .. }
            | Self::Decode { service, .. } => Some(*service),
            Self::Invariant(_) | Self::Infrastructure(_) | Self::Validation(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_errors_are_transient() {
        let transport = GmError::Transport {
            service: ServiceKind::Rule,
            message: "connection refused".into(),
        };
        let upstream = GmError::Upstream {
            service: ServiceKind::State,
            status: 500,
            body: "database unavailable".into(),
        };

        assert!(transport.is_transient());
        assert!(!upstream.is_transient());
        assert!(!GmError::Invariant("missing rule outcome".into()).is_transient());
    }

    #[test]
    fn test_upstream_error_message_names_service_and_status() {
        let err = GmError::Upstream {
            service: ServiceKind::State,
            status: 500,
            body: "boom".into(),
        };

        assert_eq!(err.to_string(), "state service returned 500: boom");
        assert_eq!(err.service(), Some(ServiceKind::State));
    }
}
