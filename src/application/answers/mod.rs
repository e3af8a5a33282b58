//! Automated answers for question-and-answer content.
//!
//! [`AnswerGenerator`] decides whether an item qualifies, prompts the primary
//! model with one fallback to the secondary model and validates the reply.
//! [`AnswerCommitter`] stores at most one bot answer per item and drives
//! scheduled batches.

mod committer;
mod completion;
mod config;
mod fallback;
mod generator;
mod inflight;
mod prompt;

pub use committer::{AnswerCommitter, BatchReport, CandidateReport, CommitOutcome};
pub use completion::{CompletionError, CompletionRequest, CompletionService};
pub use config::{AnswerConfig, CommitConfig};
pub use fallback::{
    AttemptOutcome, FallbackEvent, FallbackOutcome, FallbackState, GenerationAttempt,
    InvalidTransition, ModelFallback, ModelPrompt,
};
pub use generator::{AnswerGenerator, GeneratedAnswer, GenerationError, GenerationReport};
pub use inflight::{AnswerGuard, InFlightAnswers, InFlightError};
pub use prompt::{AnswerPrompt, build_prompt};
