//! Read-through cache for rendered item views.
//!
//! Entries are keyed by namespace and item id and are dropped through
//! [`CacheInvalidator`] whenever an item gains an answer.
//!
//! ```toml
//! [cache]
//! enabled = true
//! capacity = 500
//! namespace = "item-view"
//! ```

mod config;
mod invalidator;
mod keys;
mod lock;
mod store;

pub use config::CacheConfig;
pub use invalidator::{CacheError, CacheInvalidator};
pub use keys::CacheKey;
pub use store::ViewStore;
