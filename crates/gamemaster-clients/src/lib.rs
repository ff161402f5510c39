//! HTTP implementations of the service ports.
//!
//! Every business call goes through a [`RetryPolicy`] that retries
//! transport failures only; a non-success status or an undecodable body
//! fails the call immediately.

pub mod config;
mod http;
pub mod llm;
pub mod retry;
pub mod rule;
pub mod scenario;
pub mod state;

pub use config::{ClientConfig, ConfigError};
pub use llm::HttpLlmService;
pub use retry::RetryPolicy;
pub use rule::HttpRuleService;
pub use scenario::HttpScenarioService;
pub use state::HttpStateService;
