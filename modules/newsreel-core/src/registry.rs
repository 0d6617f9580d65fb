//! Harvester registry, spec.md §4.4: a name→adapter mapping, immutable
//! after construction, read lock-free. The registry owns constructors,
//! not instances — harvesters are stateless across calls, so a fresh one
//! is built per lookup.

use crate::harvester::Harvester;
use newsreel_common::NewsreelError;
use std::collections::HashMap;
use std::sync::Arc;

type HarvesterFactory = Box<dyn Fn() -> Arc<dyn Harvester> + Send + Sync>;

/// Maps a source name to a constructor producing a fresh `Harvester`.
/// Built once at startup from configuration and never mutated afterward.
pub struct HarvesterRegistry {
    factories: HashMap<String, HarvesterFactory>,
}

impl HarvesterRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn Harvester> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Builds a fresh harvester for `name`, or `UnknownSource` if no
    /// adapter is registered under that name.
    pub fn create(&self, name: &str) -> Result<Arc<dyn Harvester>, NewsreelError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| NewsreelError::UnknownSource(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for HarvesterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use newsreel_common::{Query, RawItem};

    struct StubHarvester;

    #[async_trait]
    impl Harvester for StubHarvester {
        fn name(&self) -> &str {
            "stub"
        }
        async fn harvest(&self, _query: &Query) -> Result<Vec<RawItem>, NewsreelError> {
            Ok(vec![])
        }
    }

    #[test]
    fn unknown_name_is_a_distinct_error() {
        let registry = HarvesterRegistry::new();
        let err = registry.create("does-not-exist").unwrap_err();
        assert!(matches!(err, NewsreelError::UnknownSource(_)));
    }

    #[test]
    fn registered_name_produces_a_fresh_harvester_each_time() {
        let mut registry = HarvesterRegistry::new();
        registry.register("stub", || Arc::new(StubHarvester));
        assert!(registry.create("stub").is_ok());
        assert!(registry.create("stub").is_ok());
    }
}
