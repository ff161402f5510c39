//! Scripted language-model fake.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use gamemaster_core::error::{GmError, ServiceKind};
use gamemaster_core::ports::{ChatRequest, LlmService};

/// A language model that replays a fixed script of replies and records
/// every request it receives.
///
/// Replies are consumed in order; once a single reply remains it is
/// repeated for every further call. An empty script fails every call with
/// a transport error.
#[derive(Debug)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, GmError>>>,
    requests: Mutex<Vec<ChatRequest>>,
    health: Result<bool, GmError>,
}

impl ScriptedLlm {
    /// Replays `replies` in order.
    #[must_use]
    pub fn new(replies: Vec<Result<String, GmError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            health: Ok(true),
        }
    }

    /// Replays successful `texts` in order.
    #[must_use]
    pub fn replying(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok((*t).to_owned())).collect())
    }

    /// Answers every call with `text`.
    #[must_use]
    pub fn always(text: &str) -> Self {
        Self::replying(&[text])
    }

    /// Fails every call.
    #[must_use]
    pub fn failing() -> Self {
        Self::new(Vec::new())
    }

    /// Overrides the health-check reply.
    #[must_use]
    pub fn with_health(mut self, health: Result<bool, GmError>) -> Self {
        self.health = health;
        self
    }

    /// Number of chat calls made so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Snapshot of every request received.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for ScriptedLlm {
    async fn chat(&self, request: &ChatRequest) -> Result<String, GmError> {
        self.requests.lock().unwrap().push(request.clone());
        let mut replies = self.replies.lock().unwrap();
        let reply = if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        };
        reply.unwrap_or_else(|| {
            Err(GmError::Transport {
                service: ServiceKind::Llm,
                message: "connection refused".to_owned(),
            })
        })
    }

    async fn check_health(&self) -> Result<bool, GmError> {
        self.health.clone()
    }
}
