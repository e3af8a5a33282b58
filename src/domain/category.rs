//! Question/answer category detection.

use crate::domain::entities::CategoryRecord;

/// Keywords matched against category slugs and names when no explicit list is configured.
pub const DEFAULT_QA_KEYWORDS: &[&str] = &["qa", "qna", "question", "help", "pregunta", "ayuda"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentCategory {
    pub is_question_answer: bool,
}

/// Keyword classifier over category slug and display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryClassifier {
    keywords: Vec<String>,
}

impl CategoryClassifier {
    /// Keywords are lower-cased; blank entries are dropped.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|keyword| keyword.as_ref().trim().to_lowercase())
            .filter(|keyword| !keyword.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn classify(&self, category: Option<&CategoryRecord>) -> ContentCategory {
        ContentCategory {
            is_question_answer: self.is_question_answer(category),
        }
    }

    /// Substring match, case-insensitive, over slug and name.
    pub fn is_question_answer(&self, category: Option<&CategoryRecord>) -> bool {
        let Some(category) = category else {
            return false;
        };

        let slug = category.slug.to_lowercase();
        let name = category
            .name
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_default();

        self.keywords
            .iter()
            .any(|keyword| slug.contains(keyword.as_str()) || name.contains(keyword.as_str()))
    }
}

impl Default for CategoryClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_QA_KEYWORDS)
    }
}
