//! Memoizing wrapper around a sink factory.
//!
//! Sink construction can open connections, so recompiling an unchanged
//! spec across refresh cycles must hand back the same instance. Keyed by
//! spec equality (options are free-form values, so no hashing); the spec
//! count is small and the scan happens only at compile time.

use std::sync::{Arc, Mutex};

use crate::config::{ConfigError, SinkProviderSpec};
use crate::sink::{Sink, SinkFactory};

pub struct CachedSinkFactory<F> {
    inner: F,
    entries: Mutex<Vec<(SinkProviderSpec, Arc<dyn Sink>)>>,
}

impl<F: SinkFactory> CachedSinkFactory<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Drop cached entries for specs absent from the latest compiled
    /// list. Snapshots still referencing a retired sink keep it alive
    /// through their own `Arc`.
    pub fn retain(&self, live: &[SinkProviderSpec]) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|(spec, _)| live.contains(spec));
    }
}

impl<F: SinkFactory> SinkFactory for CachedSinkFactory<F> {
    fn create(&self, spec: &SinkProviderSpec) -> Result<Arc<dyn Sink>, ConfigError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((_, sink)) = entries.iter().find(|(cached, _)| cached == spec) {
            return Ok(sink.clone());
        }
        let sink = self.inner.create(spec)?;
        entries.push((spec.clone(), sink.clone()));
        Ok(sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::DefaultSinkFactory;

    fn spec(name: &str) -> SinkProviderSpec {
        serde_json::from_value(serde_json::json!({"name": name, "type": "null"})).unwrap()
    }

    #[test]
    fn identical_specs_share_one_instance() {
        let factory = CachedSinkFactory::new(DefaultSinkFactory::new());
        let first = factory.create(&spec("a")).unwrap();
        let second = factory.create(&spec("a")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn different_specs_get_distinct_instances() {
        let factory = CachedSinkFactory::new(DefaultSinkFactory::new());
        let first = factory.create(&spec("a")).unwrap();
        let second = factory.create(&spec("b")).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn retain_retires_stale_entries() {
        let factory = CachedSinkFactory::new(DefaultSinkFactory::new());
        let first = factory.create(&spec("a")).unwrap();
        factory.retain(&[spec("b")]);
        let rebuilt = factory.create(&spec("a")).unwrap();
        assert!(!Arc::ptr_eq(&first, &rebuilt));
    }

    #[test]
    fn retain_keeps_live_entries() {
        let factory = CachedSinkFactory::new(DefaultSinkFactory::new());
        let first = factory.create(&spec("a")).unwrap();
        factory.retain(&[spec("a")]);
        let again = factory.create(&spec("a")).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
    }
}
