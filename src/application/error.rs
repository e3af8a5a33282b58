use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    application::{render::RenderError, repos::RepoError},
    domain::error::DomainError,
    infra::error::InfraError,
};

/// Flattened error chain for log output.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }

    pub fn chain(&self) -> String {
        self.messages.join(": ")
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("repository failure")]
    Repo(#[from] RepoError),
    #[error("render failure")]
    Render(#[from] RenderError),
    #[error("resource not found")]
    NotFound,
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit status for the command-line binary.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::NotFound | AppError::Repo(RepoError::NotFound) => 2,
            AppError::Domain(DomainError::Validation { .. }) => 3,
            AppError::Infra(InfraError::Configuration { .. }) => 4,
            _ => 1,
        }
    }
}
