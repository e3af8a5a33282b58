#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use piazza::{
    application::{
        answers::{
            AnswerCommitter, AnswerConfig, AnswerGenerator, CommitConfig, CompletionError,
            CompletionRequest, CompletionService, InFlightAnswers,
        },
        items::ItemView,
        render::render_service,
        repos::{CategorySource, ContentStore, RepoError},
    },
    cache::{CacheConfig, ViewStore},
    domain::{
        category::CategoryClassifier,
        entities::{AnswerRecord, BotIdentity, CategoryRecord, ContentItem, NewAnswerRecord},
    },
    infra::store::{Snapshot, SnapshotStore},
};
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const PRIMARY: &str = "primary-model";
pub const SECONDARY: &str = "secondary-model";
pub const DEFAULT_REPLY: &str = "Restart the router, then check the cable.";

pub fn bot_id() -> Uuid {
    Uuid::from_u128(0x5eed_0000_0000_4000_8000_0000_0000_0b07)
}

pub fn category(slug: &str) -> CategoryRecord {
    CategoryRecord {
        id: Uuid::new_v4(),
        slug: slug.to_string(),
        name: None,
    }
}

pub fn item(title: &str, category: Option<&CategoryRecord>, created_at: OffsetDateTime) -> ContentItem {
    ContentItem {
        id: Uuid::new_v4(),
        title: title.to_string(),
        body: format!("Details about: {title}"),
        category_id: category.map(|category| category.id),
        answer_count: 0,
        created_at,
    }
}

/// Completion fake answering per model from scripted queues.
///
/// A model with an empty queue replies [`DEFAULT_REPLY`].
#[derive(Default)]
pub struct ScriptedCompletion {
    replies: Mutex<HashMap<String, VecDeque<Result<String, CompletionError>>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, model: &str, result: Result<&str, CompletionError>) {
        self.replies
            .lock()
            .unwrap()
            .entry(model.to_string())
            .or_default()
            .push_back(result.map(str::to_string));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn invoke(
        &self,
        request: &CompletionRequest,
        _cancel: CancellationToken,
    ) -> Result<String, CompletionError> {
        self.calls.lock().unwrap().push(request.model.clone());
        self.replies
            .lock()
            .unwrap()
            .get_mut(&request.model)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(DEFAULT_REPLY.to_string()))
    }
}

/// In-memory store whose writes can be made to fail per item.
pub struct FlakyStore {
    pub inner: SnapshotStore,
    failing: Mutex<HashSet<Uuid>>,
}

impl FlakyStore {
    pub fn new(snapshot: Snapshot) -> Arc<Self> {
        Arc::new(Self {
            inner: SnapshotStore::in_memory(snapshot),
            failing: Mutex::new(HashSet::new()),
        })
    }

    pub fn fail_writes_for(&self, item_id: Uuid) {
        self.failing.lock().unwrap().insert(item_id);
    }

    pub async fn answers(&self) -> Vec<AnswerRecord> {
        self.inner.snapshot().await.answers
    }
}

#[async_trait]
impl ContentStore for FlakyStore {
    async fn find_item(&self, id: Uuid) -> Result<Option<ContentItem>, RepoError> {
        self.inner.find_item(id).await
    }

    async fn list_recent_items(&self, limit: usize) -> Result<Vec<ContentItem>, RepoError> {
        self.inner.list_recent_items(limit).await
    }

    async fn find_answer(
        &self,
        item_id: Uuid,
        author_id: Uuid,
    ) -> Result<Option<AnswerRecord>, RepoError> {
        self.inner.find_answer(item_id, author_id).await
    }

    async fn list_answers(&self, item_id: Uuid) -> Result<Vec<AnswerRecord>, RepoError> {
        self.inner.list_answers(item_id).await
    }

    async fn create_answer(&self, answer: NewAnswerRecord) -> Result<AnswerRecord, RepoError> {
        if self.failing.lock().unwrap().contains(&answer.item_id) {
            return Err(RepoError::from_persistence("disk full"));
        }
        self.inner.create_answer(answer).await
    }

    async fn increment_answer_count(&self, item_id: Uuid) -> Result<(), RepoError> {
        self.inner.increment_answer_count(item_id).await
    }
}

#[async_trait]
impl CategorySource for FlakyStore {
    async fn find_category(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
        self.inner.find_category(id).await
    }
}

pub fn answer_config() -> AnswerConfig {
    AnswerConfig {
        primary_model: PRIMARY.to_string(),
        secondary_model: SECONDARY.to_string(),
        model_timeout: Duration::from_secs(5),
        max_tokens: 256,
        temperature: 0.3,
        max_comment_length: 500,
        language: "English".to_string(),
        max_source_chars: 4000,
    }
}

pub fn commit_config(batch_delay: Duration) -> CommitConfig {
    CommitConfig {
        bot: BotIdentity::new(bot_id(), "Forum helper").unwrap(),
        batch_size: 10,
        batch_delay,
        persistence_timeout: Duration::from_secs(5),
        cache_namespace: CacheConfig::default().namespace,
    }
}

/// Wire a committer over `store` the way the binary does.
pub fn committer<S>(
    store: Arc<S>,
    completion: Arc<ScriptedCompletion>,
    views: Arc<ViewStore<ItemView>>,
    inflight: InFlightAnswers,
    answers: AnswerConfig,
    commit: CommitConfig,
) -> AnswerCommitter
where
    S: ContentStore + CategorySource + 'static,
{
    let generator = AnswerGenerator::new(
        completion,
        store.clone(),
        render_service(),
        CategoryClassifier::default(),
        answers,
    );
    AnswerCommitter::new(store, generator, views, inflight, commit)
}

/// Store, fakes and committer for one scenario.
pub struct Harness {
    pub store: Arc<FlakyStore>,
    pub completion: Arc<ScriptedCompletion>,
    pub views: Arc<ViewStore<ItemView>>,
    pub inflight: InFlightAnswers,
    pub committer: AnswerCommitter,
}

impl Harness {
    pub fn new(snapshot: Snapshot) -> Self {
        Self::with_config(snapshot, answer_config(), commit_config(Duration::ZERO))
    }

    pub fn with_config(snapshot: Snapshot, answers: AnswerConfig, commit: CommitConfig) -> Self {
        let store = FlakyStore::new(snapshot);
        let completion = ScriptedCompletion::new();
        let views = Arc::new(ViewStore::new(&CacheConfig::default()));
        let inflight = InFlightAnswers::new();
        let committer = committer(
            store.clone(),
            completion.clone(),
            views.clone(),
            inflight.clone(),
            answers,
            commit,
        );
        Self {
            store,
            completion,
            views,
            inflight,
            committer,
        }
    }
}
