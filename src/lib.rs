//! Forum content core: markdown rendering and automated answers.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
