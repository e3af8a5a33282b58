//! Rendered item pages backed by the read-through view cache.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::{
    application::{error::AppError, render::RenderService, repos::ContentStore},
    cache::{CacheKey, ViewStore},
    domain::entities::{AnswerRecord, ContentItem},
};

/// Item body and answers rendered into one HTML fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemView {
    pub item_id: Uuid,
    pub answer_count: usize,
    pub html: String,
}

pub struct ItemViewService {
    store: Arc<dyn ContentStore>,
    renderer: Arc<dyn RenderService>,
    cache: Arc<ViewStore<ItemView>>,
}

impl ItemViewService {
    pub fn new(
        store: Arc<dyn ContentStore>,
        renderer: Arc<dyn RenderService>,
        cache: Arc<ViewStore<ItemView>>,
    ) -> Self {
        Self {
            store,
            renderer,
            cache,
        }
    }

    pub async fn render_item(&self, item_id: Uuid) -> Result<ItemView, AppError> {
        let key = CacheKey::item(self.cache.namespace(), item_id);
        if let Some(view) = self.cache.get(&key) {
            debug!(
                target = "application::items",
                item_id = %item_id,
                "Serving item view from cache"
            );
            return Ok(view);
        }

        let item = self
            .store
            .find_item(item_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let answers = self.store.list_answers(item_id).await?;

        let view = ItemView {
            item_id,
            answer_count: answers.len(),
            html: self.compose(&item, &answers),
        };
        self.cache.set(key, view.clone());
        Ok(view)
    }

    fn compose(&self, item: &ContentItem, answers: &[AnswerRecord]) -> String {
        let body = self.renderer.render(&item.body).html;
        let mut html = format!(
            "<article data-item-id=\"{id}\">\n<h1>{title}</h1>\n{body}\n<section data-answers=\"{count}\">",
            id = item.id,
            title = html_escape::encode_text(item.title.trim()),
            count = answers.len(),
        );
        for answer in answers {
            html.push_str(&format!(
                "\n<div data-answer-id=\"{id}\" data-author-id=\"{author}\">{body}</div>",
                id = answer.id,
                author = answer.author_id,
                body = answer.body_html,
            ));
        }
        html.push_str("\n</section>\n</article>");
        html
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;
    use time::macros::datetime;

    use super::*;
    use crate::{
        application::{render::MarkdownRenderService, repos::RepoError},
        cache::{CacheConfig, CacheInvalidator},
        domain::entities::NewAnswerRecord,
    };

    #[derive(Default)]
    struct CountingStore {
        items: Mutex<Vec<ContentItem>>,
        answers: Mutex<Vec<AnswerRecord>>,
        loads: AtomicUsize,
    }

    #[async_trait]
    impl ContentStore for CountingStore {
        async fn find_item(&self, id: Uuid) -> Result<Option<ContentItem>, RepoError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(self.items.lock().unwrap().iter().find(|i| i.id == id).cloned())
        }

        async fn list_recent_items(&self, _limit: usize) -> Result<Vec<ContentItem>, RepoError> {
            Ok(self.items.lock().unwrap().clone())
        }

        async fn find_answer(
            &self,
            _item_id: Uuid,
            _author_id: Uuid,
        ) -> Result<Option<AnswerRecord>, RepoError> {
            Ok(None)
        }

        async fn list_answers(&self, item_id: Uuid) -> Result<Vec<AnswerRecord>, RepoError> {
            Ok(self
                .answers
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.item_id == item_id)
                .cloned()
                .collect())
        }

        async fn create_answer(&self, answer: NewAnswerRecord) -> Result<AnswerRecord, RepoError> {
            let record = AnswerRecord {
                id: Uuid::new_v4(),
                item_id: answer.item_id,
                author_id: answer.author_id,
                body_markdown: answer.body_markdown,
                body_html: answer.body_html,
                created_at: datetime!(2026-05-01 00:00 UTC),
            };
            self.answers.lock().unwrap().push(record.clone());
            Ok(record)
        }

        async fn increment_answer_count(&self, _item_id: Uuid) -> Result<(), RepoError> {
            Ok(())
        }
    }

    fn service(enabled: bool) -> (ItemViewService, Arc<CountingStore>, Arc<ViewStore<ItemView>>, Uuid) {
        let item = ContentItem {
            id: Uuid::new_v4(),
            title: "Tabs <or> spaces?".into(),
            body: "Which **one**?".into(),
            category_id: None,
            answer_count: 0,
            created_at: datetime!(2026-04-01 09:30 UTC),
        };
        let id = item.id;
        let store = Arc::new(CountingStore::default());
        store.items.lock().unwrap().push(item);
        let cache = Arc::new(ViewStore::new(&CacheConfig {
            enabled,
            ..CacheConfig::default()
        }));
        let service = ItemViewService::new(
            store.clone(),
            Arc::new(MarkdownRenderService::new()),
            cache.clone(),
        );
        (service, store, cache, id)
    }

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let (service, store, _, id) = service(true);
        let first = service.render_item(id).await.unwrap();
        let second = service.render_item(id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.loads.load(Ordering::SeqCst), 1);
        assert!(first.html.contains("<h1>Tabs &lt;or&gt; spaces?</h1>"));
        assert!(first.html.contains("<strong>one</strong>"));
    }

    #[tokio::test]
    async fn invalidation_exposes_new_answers() {
        let (service, store, cache, id) = service(true);
        assert_eq!(service.render_item(id).await.unwrap().answer_count, 0);

        store
            .create_answer(NewAnswerRecord {
                item_id: id,
                author_id: Uuid::new_v4(),
                body_markdown: "Spaces.".into(),
                body_html: "<p>Spaces.</p>".into(),
            })
            .await
            .unwrap();
        assert_eq!(service.render_item(id).await.unwrap().answer_count, 0);

        cache
            .invalidate(&CacheKey::item(cache.namespace(), id))
            .await
            .unwrap();
        let view = service.render_item(id).await.unwrap();
        assert_eq!(view.answer_count, 1);
        assert!(view.html.contains("<p>Spaces.</p>"));
    }

    #[tokio::test]
    async fn disabled_cache_always_loads() {
        let (service, store, _, id) = service(false);
        service.render_item(id).await.unwrap();
        service.render_item(id).await.unwrap();
        assert_eq!(store.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_item_is_not_found() {
        let (service, _, _, _) = service(true);
        let err = service.render_item(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }
}
