mod answer_batch;
mod context;

pub use answer_batch::{AnswerBatchJob, process_answer_batch_job, run_answer_batch};
pub use context::{AnswerJobContext, job_failed};
