//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{AnswerRecord, CategoryRecord, ContentItem, NewAnswerRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("store timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Content items, their answers and the per-item answer counter.
///
/// The store does not enforce one automated answer per item; callers check
/// [`ContentStore::find_answer`] first.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn find_item(&self, id: Uuid) -> Result<Option<ContentItem>, RepoError>;

    /// Most recent items first.
    async fn list_recent_items(&self, limit: usize) -> Result<Vec<ContentItem>, RepoError>;

    async fn find_answer(
        &self,
        item_id: Uuid,
        author_id: Uuid,
    ) -> Result<Option<AnswerRecord>, RepoError>;

    /// Oldest first.
    async fn list_answers(&self, item_id: Uuid) -> Result<Vec<AnswerRecord>, RepoError>;

    async fn create_answer(&self, answer: NewAnswerRecord) -> Result<AnswerRecord, RepoError>;

    async fn increment_answer_count(&self, item_id: Uuid) -> Result<(), RepoError>;

    /// Make pending writes durable. Stores without buffering need not override.
    async fn flush(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

#[async_trait]
pub trait CategorySource: Send + Sync {
    async fn find_category(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError>;
}
