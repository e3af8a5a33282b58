//! Application services: rendering, automated answers and scheduled jobs.

pub mod answers;
pub mod error;
pub mod items;
pub mod jobs;
pub mod render;
pub mod repos;
