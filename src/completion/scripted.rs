//! In-memory completion client for tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{CompletionClient, CompletionRequest};
use crate::error::CapabilityError;

type Responder = Box<dyn Fn(&CompletionRequest) -> Result<String, CapabilityError> + Send + Sync>;
type Delay = Box<dyn Fn(&CompletionRequest) -> Duration + Send + Sync>;

/// Answers every request with a closure and records what it was asked.
pub struct ScriptedClient {
    respond: Responder,
    delay: Option<Delay>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn new(
        respond: impl Fn(&CompletionRequest) -> Result<String, CapabilityError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sleep before answering, per request.
    pub fn with_delay(mut self, delay: impl Fn(&CompletionRequest) -> Duration + Send + Sync + 'static) -> Self {
        self.delay = Some(Box::new(delay));
        self
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CapabilityError> {
        self.calls.lock().unwrap().push(request.clone());
        if let Some(delay) = &self.delay {
            tokio::time::sleep(delay(request)).await;
        }
        (self.respond)(request)
    }
}

pub fn prompt_of(request: &CompletionRequest) -> &str {
    request
        .messages
        .last()
        .map(|m| m.content.as_str())
        .unwrap_or_default()
}

/// Ordinal `i` from an extraction prompt's "document chunk i/N" marker.
pub fn chunk_ordinal(request: &CompletionRequest) -> Option<usize> {
    const MARKER: &str = "document chunk ";
    let prompt = prompt_of(request);
    let rest = &prompt[prompt.find(MARKER)? + MARKER.len()..];
    rest.split_once('/')?.0.trim().parse().ok()
}
