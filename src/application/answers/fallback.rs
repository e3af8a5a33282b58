//! Primary/secondary model fallback as an explicit state machine.
//!
//! ```text
//! Idle            --Start-->      TryingPrimary
//! TryingPrimary   --Completed-->  Succeeded
//! TryingPrimary   --Errored-->    TryingSecondary
//! TryingSecondary --Completed-->  Succeeded
//! TryingSecondary --Errored-->    Failed
//! ```
//!
//! Every other pair is rejected, so no path reaches a third attempt.

use std::{fmt, time::Duration};

use metrics::counter;
use thiserror::Error;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::completion::{CompletionError, CompletionRequest, CompletionService};

const METRIC_MODEL_ATTEMPT_TOTAL: &str = "piazza_model_attempt_total";
const METRIC_MODEL_FALLBACK_TOTAL: &str = "piazza_model_fallback_total";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackState {
    Idle,
    TryingPrimary,
    TryingSecondary,
    Succeeded(String),
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackEvent {
    Start,
    Completed(String),
    Errored(CompletionError),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("no fallback transition from `{state}` on `{event}`")]
pub struct InvalidTransition {
    pub state: &'static str,
    pub event: &'static str,
}

impl FallbackState {
    /// Apply one event according to the transition table.
    pub fn next(self, event: FallbackEvent) -> Result<FallbackState, InvalidTransition> {
        use FallbackEvent::{Completed, Errored, Start};
        use FallbackState::{Failed, Idle, Succeeded, TryingPrimary, TryingSecondary};

        match (self, event) {
            (Idle, Start) => Ok(TryingPrimary),
            (TryingPrimary | TryingSecondary, Completed(text)) => Ok(Succeeded(text)),
            (TryingPrimary, Errored(_)) => Ok(TryingSecondary),
            (TryingSecondary, Errored(_)) => Ok(Failed),
            (state, event) => Err(InvalidTransition {
                state: state.name(),
                event: event.name(),
            }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FallbackState::Succeeded(_) | FallbackState::Failed)
    }

    pub fn name(&self) -> &'static str {
        match self {
            FallbackState::Idle => "idle",
            FallbackState::TryingPrimary => "trying_primary",
            FallbackState::TryingSecondary => "trying_secondary",
            FallbackState::Succeeded(_) => "succeeded",
            FallbackState::Failed => "failed",
        }
    }
}

impl FallbackEvent {
    pub fn name(&self) -> &'static str {
        match self {
            FallbackEvent::Start => "start",
            FallbackEvent::Completed(_) => "completed",
            FallbackEvent::Errored(_) => "errored",
        }
    }
}

impl fmt::Display for FallbackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success(String),
    Failure(CompletionError),
}

/// Record of one model invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationAttempt {
    pub model_id: String,
    pub started_at: OffsetDateTime,
    pub timed_out_after_ms: u64,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FallbackOutcome {
    pub attempts: Vec<GenerationAttempt>,
    pub final_state: FallbackState,
}

impl FallbackOutcome {
    pub fn text(&self) -> Option<&str> {
        match &self.final_state {
            FallbackState::Succeeded(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

/// Prompt and sampling parameters shared by both attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPrompt {
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Runs a prompt against the primary model and, on any failure, once against
/// the secondary model. Each attempt gets its own timeout and cancellation token.
#[derive(Debug, Clone)]
pub struct ModelFallback {
    primary: String,
    secondary: String,
    timeout: Duration,
}

impl ModelFallback {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
            timeout,
        }
    }

    pub async fn run(&self, service: &dyn CompletionService, prompt: &ModelPrompt) -> FallbackOutcome {
        let mut attempts = Vec::with_capacity(2);
        let mut state = transition(FallbackState::Idle, FallbackEvent::Start);

        while let Some(model) = self.model_for(&state) {
            let request = CompletionRequest {
                model: model.to_string(),
                system_prompt: prompt.system_prompt.clone(),
                user_prompt: prompt.user_prompt.clone(),
                max_tokens: prompt.max_tokens,
                temperature: prompt.temperature,
            };
            let attempt = self.attempt(service, request).await;
            let event = match &attempt.outcome {
                AttemptOutcome::Success(text) => FallbackEvent::Completed(text.clone()),
                AttemptOutcome::Failure(err) => {
                    if state == FallbackState::TryingPrimary {
                        counter!(METRIC_MODEL_FALLBACK_TOTAL).increment(1);
                        info!(
                            target = "application::answers::fallback",
                            model = %attempt.model_id,
                            reason = err.kind(),
                            error = %err,
                            "Primary model failed; retrying on secondary model"
                        );
                    }
                    FallbackEvent::Errored(err.clone())
                }
            };
            attempts.push(attempt);
            state = transition(state, event);
        }

        FallbackOutcome {
            attempts,
            final_state: state,
        }
    }

    fn model_for(&self, state: &FallbackState) -> Option<&str> {
        match state {
            FallbackState::TryingPrimary => Some(self.primary.as_str()),
            FallbackState::TryingSecondary => Some(self.secondary.as_str()),
            _ => None,
        }
    }

    async fn attempt(
        &self,
        service: &dyn CompletionService,
        request: CompletionRequest,
    ) -> GenerationAttempt {
        let started_at = OffsetDateTime::now_utc();
        let timed_out_after_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        let cancel = CancellationToken::new();

        let result =
            match tokio::time::timeout(self.timeout, service.invoke(&request, cancel.clone())).await
            {
                Ok(Ok(text)) if text.trim().is_empty() => Err(CompletionError::EmptyResponse),
                Ok(Ok(text)) => Ok(text.trim().to_string()),
                Ok(Err(err)) => Err(err),
                Err(_) => {
                    cancel.cancel();
                    Err(CompletionError::Timeout {
                        after_ms: timed_out_after_ms,
                    })
                }
            };

        let outcome = match result {
            Ok(text) => {
                counter!(METRIC_MODEL_ATTEMPT_TOTAL, "outcome" => "success").increment(1);
                AttemptOutcome::Success(text)
            }
            Err(err) => {
                counter!(METRIC_MODEL_ATTEMPT_TOTAL, "outcome" => err.kind()).increment(1);
                AttemptOutcome::Failure(err)
            }
        };

        GenerationAttempt {
            model_id: request.model,
            started_at,
            timed_out_after_ms,
            outcome,
        }
    }
}

fn transition(state: FallbackState, event: FallbackEvent) -> FallbackState {
    state.next(event).unwrap_or_else(|err| {
        warn!(
            target = "application::answers::fallback",
            error = %err,
            "Rejected fallback transition"
        );
        FallbackState::Failed
    })
}
