//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::error::DomainError;

/// A user-authored post that may receive an automated answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub answer_count: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: Uuid,
    pub slug: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Comment stored against a content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub id: Uuid,
    pub item_id: Uuid,
    pub author_id: Uuid,
    pub body_markdown: String,
    pub body_html: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnswerRecord {
    pub item_id: Uuid,
    pub author_id: Uuid,
    pub body_markdown: String,
    pub body_html: String,
}

/// Account every automated answer is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    user_id: Uuid,
    display_name: String,
}

impl BotIdentity {
    pub fn new(user_id: Uuid, display_name: impl Into<String>) -> Result<Self, DomainError> {
        let display_name = display_name.into().trim().to_string();
        if display_name.is_empty() {
            return Err(DomainError::validation("bot display name must not be empty"));
        }
        if user_id.is_nil() {
            return Err(DomainError::validation("bot user id must not be nil"));
        }
        Ok(Self {
            user_id,
            display_name,
        })
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}
