use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Single chat-style completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompletionError {
    #[error("model call timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },
    #[error("model transport failed: {message}")]
    Transport { message: String },
    #[error("model returned an empty response")]
    EmptyResponse,
    #[error("model call cancelled")]
    Cancelled,
}

impl CompletionError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CompletionError::Timeout { .. } => "timeout",
            CompletionError::Transport { .. } => "transport",
            CompletionError::EmptyResponse => "empty",
            CompletionError::Cancelled => "cancelled",
        }
    }
}

/// External text-generation service.
///
/// Implementations must stop work promptly once `cancel` fires and report
/// [`CompletionError::Cancelled`].
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn invoke(
        &self,
        request: &CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<String, CompletionError>;
}
