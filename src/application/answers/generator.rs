use std::{sync::Arc, time::Instant};

use metrics::histogram;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    application::{
        render::{RenderError, RenderService, plain_text_length},
        repos::{CategorySource, RepoError},
    },
    domain::{category::CategoryClassifier, entities::ContentItem},
};

use super::{
    completion::CompletionService,
    config::AnswerConfig,
    fallback::{FallbackState, GenerationAttempt, ModelFallback, ModelPrompt},
    prompt::build_prompt,
};

const METRIC_ANSWER_GENERATION_MS: &str = "piazza_answer_generation_ms";

/// Validated answer ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedAnswer {
    pub raw_text: String,
    pub rendered_html: String,
    /// Characters of visible text in `rendered_html`.
    pub character_length: usize,
}

/// Why no answer was produced.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("item category does not accept automated answers")]
    NotQuestionAnswer,
    #[error("category lookup failed")]
    CategoryLookup(#[source] RepoError),
    #[error("could not prepare model input or output")]
    Render(#[source] RenderError),
    #[error("both models failed")]
    ModelsExhausted,
    #[error("answer length {length} outside 1..={max}")]
    LengthOutOfBounds { length: usize, max: usize },
}

impl GenerationError {
    /// Short label used in logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            GenerationError::NotQuestionAnswer => "category",
            GenerationError::CategoryLookup(_) => "category_lookup",
            GenerationError::Render(_) => "render",
            GenerationError::ModelsExhausted => "models_exhausted",
            GenerationError::LengthOutOfBounds { .. } => "length",
        }
    }
}

/// Full account of one generation run.
#[derive(Debug)]
pub struct GenerationReport {
    pub attempts: Vec<GenerationAttempt>,
    pub result: Result<GeneratedAnswer, GenerationError>,
}

impl GenerationReport {
    fn skipped(error: GenerationError) -> Self {
        Self {
            attempts: Vec::new(),
            result: Err(error),
        }
    }
}

/// Classifies, prompts, calls the models with fallback and validates the reply.
#[derive(Clone)]
pub struct AnswerGenerator {
    completion: Arc<dyn CompletionService>,
    categories: Arc<dyn CategorySource>,
    renderer: Arc<dyn RenderService>,
    classifier: CategoryClassifier,
    fallback: ModelFallback,
    config: AnswerConfig,
}

impl AnswerGenerator {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        categories: Arc<dyn CategorySource>,
        renderer: Arc<dyn RenderService>,
        classifier: CategoryClassifier,
        config: AnswerConfig,
    ) -> Self {
        let fallback = ModelFallback::new(
            config.primary_model.clone(),
            config.secondary_model.clone(),
            config.model_timeout,
        );
        Self {
            completion,
            categories,
            renderer,
            classifier,
            fallback,
            config,
        }
    }

    pub fn config(&self) -> &AnswerConfig {
        &self.config
    }

    /// Produce an answer for `item`, or nothing. Never fails.
    pub async fn generate(&self, item: &ContentItem) -> Option<GeneratedAnswer> {
        self.generate_detailed(item).await.result.ok()
    }

    /// Whether `item` sits in a question-and-answer category. No model is called.
    pub async fn qualifies(&self, item: &ContentItem) -> Result<bool, RepoError> {
        let category = match item.category_id {
            Some(id) => self.categories.find_category(id).await?,
            None => None,
        };
        Ok(self.classifier.is_question_answer(category.as_ref()))
    }

    pub async fn generate_detailed(&self, item: &ContentItem) -> GenerationReport {
        match self.qualifies(item).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(
                    target = "application::answers::generator",
                    item_id = %item.id,
                    "Item category does not qualify for an automated answer"
                );
                return GenerationReport::skipped(GenerationError::NotQuestionAnswer);
            }
            Err(err) => {
                warn!(
                    target = "application::answers::generator",
                    item_id = %item.id,
                    error = %err,
                    "Category lookup failed"
                );
                return GenerationReport::skipped(GenerationError::CategoryLookup(err));
            }
        }

        let prompt = match build_prompt(item, &self.config) {
            Ok(prompt) => prompt,
            Err(err) => return GenerationReport::skipped(GenerationError::Render(err)),
        };
        let prompt = ModelPrompt {
            system_prompt: prompt.system,
            user_prompt: prompt.user,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let started = Instant::now();
        let outcome = self.fallback.run(self.completion.as_ref(), &prompt).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        let outcome_label = if outcome.text().is_some() {
            "success"
        } else {
            "failure"
        };
        histogram!(METRIC_ANSWER_GENERATION_MS, "outcome" => outcome_label).record(elapsed_ms);

        let result = match &outcome.final_state {
            FallbackState::Succeeded(text) => self.validate(text),
            _ => Err(GenerationError::ModelsExhausted),
        };

        match &result {
            Ok(answer) => info!(
                target = "application::answers::generator",
                item_id = %item.id,
                attempts = outcome.attempts.len(),
                length = answer.character_length,
                elapsed_ms,
                "Generated answer"
            ),
            Err(err) => warn!(
                target = "application::answers::generator",
                item_id = %item.id,
                attempts = outcome.attempts.len(),
                reason = err.reason(),
                error = %err,
                "Discarded answer generation"
            ),
        }

        GenerationReport {
            attempts: outcome.attempts,
            result,
        }
    }

    fn validate(&self, text: &str) -> Result<GeneratedAnswer, GenerationError> {
        let rendered = self.renderer.render(text);
        let length = plain_text_length(&rendered.html).map_err(GenerationError::Render)?;
        let max = self.config.max_comment_length;

        if length == 0 || length > max {
            return Err(GenerationError::LengthOutOfBounds { length, max });
        }

        Ok(GeneratedAnswer {
            raw_text: text.to_string(),
            rendered_html: rendered.html,
            character_length: length,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use async_trait::async_trait;
    use time::macros::datetime;
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    use super::*;
    use crate::{
        application::{
            answers::completion::{CompletionError, CompletionRequest},
            render::MarkdownRenderService,
        },
        domain::entities::CategoryRecord,
    };

    struct Replies {
        replies: Mutex<Vec<Result<String, CompletionError>>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionService for Replies {
        async fn invoke(
            &self,
            _request: &CompletionRequest,
            _cancel: CancellationToken,
        ) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                Err(CompletionError::EmptyResponse)
            } else {
                replies.remove(0)
            }
        }
    }

    struct OneCategory(CategoryRecord);

    #[async_trait]
    impl CategorySource for OneCategory {
        async fn find_category(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
            Ok((self.0.id == id).then(|| self.0.clone()))
        }
    }

    fn generator(
        slug: &str,
        replies: Vec<Result<String, CompletionError>>,
        max_len: usize,
    ) -> (AnswerGenerator, Arc<Replies>, Uuid) {
        let category_id = Uuid::new_v4();
        let completion = Arc::new(Replies {
            replies: Mutex::new(replies),
            calls: AtomicUsize::new(0),
        });
        let generator = AnswerGenerator::new(
            completion.clone(),
            Arc::new(OneCategory(CategoryRecord {
                id: category_id,
                slug: slug.into(),
                name: None,
            })),
            Arc::new(MarkdownRenderService::new()),
            CategoryClassifier::default(),
            AnswerConfig {
                primary_model: "primary".into(),
                secondary_model: "secondary".into(),
                model_timeout: Duration::from_secs(5),
                max_tokens: 256,
                temperature: 0.2,
                max_comment_length: max_len,
                language: "English".into(),
                max_source_chars: 1000,
            },
        );
        (generator, completion, category_id)
    }

    fn item(category_id: Option<Uuid>) -> ContentItem {
        ContentItem {
            id: Uuid::new_v4(),
            title: "How do I read a file?".into(),
            body: "Looking for the simplest way.".into(),
            category_id,
            answer_count: 0,
            created_at: datetime!(2026-03-01 12:00 UTC),
        }
    }

    #[tokio::test]
    async fn off_topic_category_never_calls_model() {
        let (generator, completion, category) =
            generator("general-chat", vec![Ok("hi".into())], 100);
        let report = generator.generate_detailed(&item(Some(category))).await;
        assert!(matches!(report.result, Err(GenerationError::NotQuestionAnswer)));
        assert_eq!(completion.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn uncategorised_item_is_skipped() {
        let (generator, completion, _) = generator("qna-board", vec![Ok("hi".into())], 100);
        assert!(generator.generate(&item(None)).await.is_none());
        assert_eq!(completion.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn renders_accepted_answer() {
        let (generator, _, category) =
            generator("qna-board", vec![Ok("Use **fs::read**.".into())], 100);
        let answer = generator.generate(&item(Some(category))).await.unwrap();
        assert_eq!(answer.raw_text, "Use **fs::read**.");
        assert!(answer.rendered_html.contains("<strong>fs::read</strong>"));
        assert_eq!(answer.character_length, "Use fs::read.".len());
    }

    #[tokio::test]
    async fn secondary_result_after_primary_failure() {
        let (generator, completion, category) = generator(
            "help-desk",
            vec![Err(CompletionError::transport("503")), Ok("second".into())],
            100,
        );
        let report = generator.generate_detailed(&item(Some(category))).await;
        assert_eq!(report.attempts.len(), 2);
        assert_eq!(report.result.unwrap().raw_text, "second");
        assert_eq!(completion.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn overlong_answer_is_discarded_not_truncated() {
        let (generator, _, category) = generator("qa", vec![Ok("x".repeat(11))], 10);
        let report = generator.generate_detailed(&item(Some(category))).await;
        assert!(matches!(
            report.result,
            Err(GenerationError::LengthOutOfBounds { length: 11, max: 10 })
        ));
    }

    #[tokio::test]
    async fn markup_only_answer_has_zero_length() {
        let (generator, _, category) = generator("qa", vec![Ok("---".into())], 10);
        let report = generator.generate_detailed(&item(Some(category))).await;
        assert!(matches!(
            report.result,
            Err(GenerationError::LengthOutOfBounds { length: 0, .. })
        ));
    }

    #[tokio::test]
    async fn both_models_failing_yields_nothing() {
        let (generator, completion, category) = generator("qa", Vec::new(), 10);
        let report = generator.generate_detailed(&item(Some(category))).await;
        assert!(matches!(report.result, Err(GenerationError::ModelsExhausted)));
        assert_eq!(completion.calls.load(Ordering::SeqCst), 2);
    }
}
