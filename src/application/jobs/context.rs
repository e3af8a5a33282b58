use std::sync::Arc;

use apalis::prelude::Error as ApalisError;

use crate::application::{
    answers::{AnswerCommitter, InFlightAnswers},
    repos::ContentStore,
};

/// Shared context passed to the answer worker.
#[derive(Clone)]
pub struct AnswerJobContext {
    pub store: Arc<dyn ContentStore>,
    pub committer: Arc<AnswerCommitter>,
    pub inflight: InFlightAnswers,
    /// How many recent items are considered per run.
    pub candidate_window: usize,
    pub batch_size: usize,
}

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Convert any error into an [`ApalisError::Failed`].
pub fn job_failed<E>(err: E) -> ApalisError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let boxed: BoxError = Box::new(err);
    ApalisError::Failed(Arc::new(boxed))
}
