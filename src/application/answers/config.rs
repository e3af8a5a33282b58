use std::time::Duration;

use crate::domain::entities::BotIdentity;

/// Parameters for a single generation run.
#[derive(Debug, Clone)]
pub struct AnswerConfig {
    pub primary_model: String,
    pub secondary_model: String,
    pub model_timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Upper bound on the plain-text length of an accepted answer, in characters.
    pub max_comment_length: usize,
    pub language: String,
    /// Title and body are cut to this many characters before prompting.
    pub max_source_chars: usize,
}

/// Parameters for persisting answers and pacing batch runs.
#[derive(Debug, Clone)]
pub struct CommitConfig {
    pub bot: BotIdentity,
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub persistence_timeout: Duration,
    pub cache_namespace: String,
}
