pub mod http;
#[cfg(test)]
pub mod scripted;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CapabilityError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Model tier plus sampling settings for one kind of call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    /// Single user-turn request.
    pub fn prompt(params: &ModelParams, prompt: impl Into<String>) -> Self {
        Self {
            model: params.model.clone(),
            messages: vec![Message::user(prompt)],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        }
    }
}

/// A generative text-completion service.
///
/// Implementations own their retry and timeout policy; callers see either
/// the completion text or the final error.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CapabilityError>;
}
