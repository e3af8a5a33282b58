//! Cache key definitions.

use std::fmt;

use uuid::Uuid;

/// Identifies the cached view of one content item.
///
/// The namespace lets several caches share an invalidation channel without
/// clobbering each other's entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub namespace: String,
    pub item_id: Uuid,
}

impl CacheKey {
    pub fn item(namespace: impl Into<String>, item_id: Uuid) -> Self {
        Self {
            namespace: namespace.into(),
            item_id,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_namespace_and_id() {
        let id = Uuid::nil();
        assert_eq!(
            CacheKey::item("item-view", id).to_string(),
            "item-view:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn namespaces_distinguish_keys() {
        let id = Uuid::new_v4();
        assert_ne!(CacheKey::item("a", id), CacheKey::item("b", id));
    }
}
