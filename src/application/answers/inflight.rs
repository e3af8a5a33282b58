use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

/// Tracks items that currently have an answer generation running in this process.
#[derive(Debug, Default, Clone)]
pub struct InFlightAnswers {
    items: Arc<DashMap<Uuid, ()>>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InFlightError {
    #[error("answer generation already in progress for item {item_id}")]
    AlreadyRunning { item_id: Uuid },
}

impl InFlightAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, item_id: Uuid) -> Result<AnswerGuard, InFlightError> {
        use dashmap::mapref::entry::Entry;

        match self.items.entry(item_id) {
            Entry::Vacant(vacant) => {
                vacant.insert(());
                Ok(AnswerGuard {
                    item_id,
                    items: Arc::clone(&self.items),
                })
            }
            Entry::Occupied(_) => Err(InFlightError::AlreadyRunning { item_id }),
        }
    }

    pub fn is_running(&self, item_id: Uuid) -> bool {
        self.items.contains_key(&item_id)
    }
}

/// Releases the item when dropped.
#[derive(Debug)]
pub struct AnswerGuard {
    item_id: Uuid,
    items: Arc<DashMap<Uuid, ()>>,
}

impl Drop for AnswerGuard {
    fn drop(&mut self) {
        self.items.remove(&self.item_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_guard_drops() {
        let inflight = InFlightAnswers::new();
        let id = Uuid::new_v4();

        let guard = inflight.acquire(id).expect("first acquire");
        assert!(inflight.is_running(id));
        assert_eq!(
            inflight.acquire(id).unwrap_err(),
            InFlightError::AlreadyRunning { item_id: id }
        );

        drop(guard);
        assert!(!inflight.is_running(id));
        assert!(inflight.acquire(id).is_ok());
    }

    #[test]
    fn clones_share_state() {
        let inflight = InFlightAnswers::new();
        let other = inflight.clone();
        let id = Uuid::new_v4();
        let _guard = inflight.acquire(id).unwrap();
        assert!(other.acquire(id).is_err());
    }
}
