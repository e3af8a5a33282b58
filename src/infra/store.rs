//! In-memory content store persisted as a TOML snapshot.

use std::{
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    application::repos::{CategorySource, ContentStore, RepoError},
    domain::entities::{AnswerRecord, CategoryRecord, ContentItem, NewAnswerRecord},
};

use super::error::InfraError;

/// Serialised store contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub categories: Vec<CategoryRecord>,
    #[serde(default)]
    pub items: Vec<ContentItem>,
    #[serde(default)]
    pub answers: Vec<AnswerRecord>,
}

/// [`ContentStore`] and [`CategorySource`] over a [`Snapshot`].
///
/// Writes stay in memory until [`ContentStore::flush`] (or [`SnapshotStore::save`])
/// writes the snapshot back to its file.
#[derive(Debug)]
pub struct SnapshotStore {
    path: Option<PathBuf>,
    state: RwLock<Snapshot>,
    dirty: AtomicBool,
}

impl SnapshotStore {
    /// Store without a backing file; flushing is a no-op.
    pub fn in_memory(snapshot: Snapshot) -> Self {
        Self {
            path: None,
            state: RwLock::new(snapshot),
            dirty: AtomicBool::new(false),
        }
    }

    /// Load the snapshot at `path`, starting empty when the file does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, InfraError> {
        let path = path.into();
        let snapshot = match tokio::fs::read_to_string(&path).await {
            Ok(data) => toml::from_str(&data).map_err(|err| {
                InfraError::snapshot(format!("invalid snapshot {}: {err}", path.display()))
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    target = "infra::store",
                    path = %path.display(),
                    "Snapshot file missing; starting with an empty store"
                );
                Snapshot::default()
            }
            Err(err) => return Err(InfraError::Io(err)),
        };

        Ok(Self {
            path: Some(path),
            state: RwLock::new(snapshot),
            dirty: AtomicBool::new(false),
        })
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.state.read().await.clone()
    }

    /// Write the snapshot to its file, replacing it atomically.
    pub async fn save(&self) -> Result<(), InfraError> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };

        let encoded = {
            let state = self.state.read().await;
            toml::to_string_pretty(&*state)
                .map_err(|err| InfraError::snapshot(format!("failed to encode snapshot: {err}")))?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let staging = path.with_extension("toml.tmp");
        tokio::fs::write(&staging, encoded).await?;
        tokio::fs::rename(&staging, path).await?;
        self.dirty.store(false, Ordering::SeqCst);

        debug!(
            target = "infra::store",
            path = %path.display(),
            "Snapshot saved"
        );
        Ok(())
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContentStore for SnapshotStore {
    async fn find_item(&self, id: Uuid) -> Result<Option<ContentItem>, RepoError> {
        let state = self.state.read().await;
        Ok(state.items.iter().find(|item| item.id == id).cloned())
    }

    async fn list_recent_items(&self, limit: usize) -> Result<Vec<ContentItem>, RepoError> {
        let state = self.state.read().await;
        let mut items = state.items.clone();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items.truncate(limit);
        Ok(items)
    }

    async fn find_answer(
        &self,
        item_id: Uuid,
        author_id: Uuid,
    ) -> Result<Option<AnswerRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .answers
            .iter()
            .find(|answer| answer.item_id == item_id && answer.author_id == author_id)
            .cloned())
    }

    async fn list_answers(&self, item_id: Uuid) -> Result<Vec<AnswerRecord>, RepoError> {
        let state = self.state.read().await;
        let mut answers: Vec<_> = state
            .answers
            .iter()
            .filter(|answer| answer.item_id == item_id)
            .cloned()
            .collect();
        answers.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(answers)
    }

    async fn create_answer(&self, answer: NewAnswerRecord) -> Result<AnswerRecord, RepoError> {
        let mut state = self.state.write().await;
        if !state.items.iter().any(|item| item.id == answer.item_id) {
            return Err(RepoError::Integrity {
                message: format!("item {} does not exist", answer.item_id),
            });
        }

        let record = AnswerRecord {
            id: Uuid::new_v4(),
            item_id: answer.item_id,
            author_id: answer.author_id,
            body_markdown: answer.body_markdown,
            body_html: answer.body_html,
            created_at: OffsetDateTime::now_utc(),
        };
        state.answers.push(record.clone());
        self.mark_dirty();
        Ok(record)
    }

    async fn increment_answer_count(&self, item_id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        let item = state
            .items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or(RepoError::NotFound)?;
        item.answer_count = item.answer_count.saturating_add(1);
        self.mark_dirty();
        Ok(())
    }

    async fn flush(&self) -> Result<(), RepoError> {
        if !self.dirty.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.save().await.map_err(RepoError::from_persistence)
    }
}

#[async_trait]
impl CategorySource for SnapshotStore {
    async fn find_category(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .categories
            .iter()
            .find(|category| category.id == id)
            .cloned())
    }
}
