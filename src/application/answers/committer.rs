use std::{future::Future, sync::Arc};

use metrics::counter;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    application::repos::{ContentStore, RepoError},
    cache::{CacheInvalidator, CacheKey},
    domain::entities::{ContentItem, NewAnswerRecord},
};

use super::{config::CommitConfig, generator::AnswerGenerator, inflight::InFlightAnswers};

const METRIC_ANSWER_GENERATED_TOTAL: &str = "piazza_answer_generated_total";
const METRIC_ANSWER_SKIPPED_TOTAL: &str = "piazza_answer_skipped_total";

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed { answer_id: Uuid },
    AlreadyAnswered,
    InFlight,
    ItemMissing,
    NotGenerated { reason: &'static str },
    PersistenceFailed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateReport {
    pub item_id: Uuid,
    pub outcome: CommitOutcome,
}

/// Per-candidate results of one batch, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub candidates: Vec<CandidateReport>,
}

impl BatchReport {
    pub fn committed(&self) -> usize {
        self.candidates
            .iter()
            .filter(|report| matches!(report.outcome, CommitOutcome::Committed { .. }))
            .count()
    }

    pub fn processed(&self) -> usize {
        self.candidates.len()
    }
}

/// Persists generated answers at most once per item and paces batch runs.
#[derive(Clone)]
pub struct AnswerCommitter {
    store: Arc<dyn ContentStore>,
    generator: AnswerGenerator,
    invalidator: Arc<dyn CacheInvalidator>,
    inflight: InFlightAnswers,
    config: CommitConfig,
}

impl AnswerCommitter {
    pub fn new(
        store: Arc<dyn ContentStore>,
        generator: AnswerGenerator,
        invalidator: Arc<dyn CacheInvalidator>,
        inflight: InFlightAnswers,
        config: CommitConfig,
    ) -> Self {
        Self {
            store,
            generator,
            invalidator,
            inflight,
            config,
        }
    }

    pub fn config(&self) -> &CommitConfig {
        &self.config
    }

    /// Process up to `max_batch_size` candidates, most recent first, one at a time.
    pub async fn process_batch(
        &self,
        mut candidates: Vec<ContentItem>,
        max_batch_size: usize,
    ) -> BatchReport {
        candidates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        candidates.truncate(max_batch_size);

        let mut report = BatchReport::default();
        let mut pace = false;

        for item in &candidates {
            if pace && !self.config.batch_delay.is_zero() {
                tokio::time::sleep(self.config.batch_delay).await;
            }

            let (outcome, reached_model) = self.commit_item(item).await;
            pace = reached_model;
            report.candidates.push(CandidateReport {
                item_id: item.id,
                outcome,
            });
        }

        info!(
            target = "application::answers::committer",
            processed = report.processed(),
            committed = report.committed(),
            "Answer batch finished"
        );
        report
    }

    /// Keep the items a batch could answer: question-and-answer items without a
    /// bot answer yet. Order is preserved; items whose lookups fail are left for
    /// a later run.
    pub async fn select_candidates(&self, items: Vec<ContentItem>) -> Vec<ContentItem> {
        let bot_id = self.config.bot.user_id();
        let mut selected = Vec::with_capacity(items.len());

        for item in items {
            match self.persist(self.generator.qualifies(&item)).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) => {
                    warn!(
                        target = "application::answers::committer",
                        item_id = %item.id,
                        error = %err,
                        "Category lookup failed while selecting candidates"
                    );
                    continue;
                }
            }
            match self.persist(self.store.find_answer(item.id, bot_id)).await {
                Ok(None) => selected.push(item),
                Ok(Some(_)) => {}
                Err(err) => warn!(
                    target = "application::answers::committer",
                    item_id = %item.id,
                    error = %err,
                    "Answer lookup failed while selecting candidates"
                ),
            }
        }

        selected
    }

    /// Answer a single item by id. Failures are logged and reported, never raised.
    pub async fn generate_and_commit_answer(&self, item_id: Uuid) -> CommitOutcome {
        let item = match self.persist(self.store.find_item(item_id)).await {
            Ok(Some(item)) => item,
            Ok(None) => {
                warn!(
                    target = "application::answers::committer",
                    item_id = %item_id,
                    "Item not found"
                );
                record_skip("missing");
                return CommitOutcome::ItemMissing;
            }
            Err(err) => return persistence_failed(item_id, "find_item", err),
        };

        self.commit_item(&item).await.0
    }

    /// Returns the outcome and whether a model was called.
    async fn commit_item(&self, item: &ContentItem) -> (CommitOutcome, bool) {
        let _guard = match self.inflight.acquire(item.id) {
            Ok(guard) => guard,
            Err(err) => {
                debug!(
                    target = "application::answers::committer",
                    item_id = %item.id,
                    error = %err,
                    "Skipping item with a generation already running"
                );
                record_skip("in_flight");
                return (CommitOutcome::InFlight, false);
            }
        };

        let bot_id = self.config.bot.user_id();
        match self.persist(self.store.find_answer(item.id, bot_id)).await {
            Ok(Some(existing)) => {
                debug!(
                    target = "application::answers::committer",
                    item_id = %item.id,
                    answer_id = %existing.id,
                    "Item already has an automated answer"
                );
                record_skip("already_answered");
                return (CommitOutcome::AlreadyAnswered, false);
            }
            Ok(None) => {}
            Err(err) => return (persistence_failed(item.id, "find_answer", err), false),
        }

        let report = self.generator.generate_detailed(item).await;
        let reached_model = !report.attempts.is_empty();
        let answer = match report.result {
            Ok(answer) => answer,
            Err(err) => {
                let outcome = CommitOutcome::NotGenerated {
                    reason: err.reason(),
                };
                record_skip(err.reason());
                return (outcome, reached_model);
            }
        };

        let new_answer = NewAnswerRecord {
            item_id: item.id,
            author_id: bot_id,
            body_markdown: answer.raw_text,
            body_html: answer.rendered_html,
        };
        let stored = match self.persist(self.store.create_answer(new_answer)).await {
            Ok(stored) => stored,
            Err(err) => return (persistence_failed(item.id, "create_answer", err), reached_model),
        };

        if let Err(err) = self
            .persist(self.store.increment_answer_count(item.id))
            .await
        {
            warn!(
                target = "application::answers::committer",
                item_id = %item.id,
                answer_id = %stored.id,
                error = %err,
                "Answer stored but answer counter was not incremented"
            );
        }

        self.invalidate(item.id).await;

        counter!(METRIC_ANSWER_GENERATED_TOTAL).increment(1);
        info!(
            target = "application::answers::committer",
            item_id = %item.id,
            answer_id = %stored.id,
            bot = %self.config.bot.display_name(),
            "Committed automated answer"
        );
        (
            CommitOutcome::Committed {
                answer_id: stored.id,
            },
            reached_model,
        )
    }

    async fn invalidate(&self, item_id: Uuid) {
        let key = CacheKey::item(self.config.cache_namespace.clone(), item_id);
        match tokio::time::timeout(
            self.config.persistence_timeout,
            self.invalidator.invalidate(&key),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(
                target = "application::answers::committer",
                key = %key,
                error = %err,
                "Cache invalidation failed"
            ),
            Err(_) => warn!(
                target = "application::answers::committer",
                key = %key,
                "Cache invalidation timed out"
            ),
        }
    }

    async fn persist<T>(&self, call: impl Future<Output = Result<T, RepoError>>) -> Result<T, RepoError> {
        tokio::time::timeout(self.config.persistence_timeout, call)
            .await
            .unwrap_or(Err(RepoError::Timeout))
    }
}

fn persistence_failed(item_id: Uuid, op: &'static str, err: RepoError) -> CommitOutcome {
    warn!(
        target = "application::answers::committer",
        item_id = %item_id,
        op,
        error = %err,
        "Store call failed; moving on"
    );
    record_skip("persistence");
    CommitOutcome::PersistenceFailed {
        message: err.to_string(),
    }
}

fn record_skip(reason: &'static str) {
    counter!(METRIC_ANSWER_SKIPPED_TOTAL, "reason" => reason).increment(1);
}
