//! Base stage: `serde_json` with an injected [`TypeResolver`] and an
//! optional FIFO result cache.

use std::{hash::Hash, sync::Arc};

use sealwire_types::{
    CacheConfig, CapabilityMap, Operation, SerializationError, capability::keys,
};
use serde::{Serialize, de::DeserializeOwned};
use tokio_util::sync::CancellationToken;

use crate::{
    cache::{CacheStats, SerializationCache},
    resolver::{StandardResolver, TypeResolver, ensure_resolvable},
    serializer::{Serializer, ensure_not_cancelled},
};

/// JSON serializer. The first stage of every pipeline.
#[derive(Debug)]
pub struct JsonSerializer {
    resolver: Arc<dyn TypeResolver>,
    cache: Option<SerializationCache>,
}

impl Default for JsonSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonSerializer {
    /// Accepts every type; no cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            resolver: Arc::new(StandardResolver),
            cache: None,
        }
    }

    /// Configure the result cache. A disabled config removes it.
    ///
    /// # Panics
    /// Panics if the cache is enabled with `max_entries == 0`.
    #[must_use]
    pub fn with_cache(mut self, config: &CacheConfig) -> Self {
        self.cache = config
            .enabled
            .then(|| SerializationCache::new(config.max_entries));
        self
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn TypeResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    #[must_use]
    pub fn resolver(&self) -> &dyn TypeResolver {
        self.resolver.as_ref()
    }

    #[must_use]
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(SerializationCache::stats)
    }
}

impl Serializer for JsonSerializer {
    fn serialize_with<T>(
        &self,
        value: &T,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, SerializationError>
    where
        T: Serialize + 'static,
    {
        ensure_not_cancelled(cancel, Operation::Serialize)?;
        ensure_resolvable::<T>(self.resolver.as_ref(), Operation::Serialize)?;

        serde_json::to_vec(value).map_err(|e| {
            SerializationError::format(Operation::Serialize, e.to_string())
                .with_target::<T>()
                .with_source(e)
        })
    }

    fn deserialize_with<T>(
        &self,
        bytes: &[u8],
        cancel: &CancellationToken,
    ) -> Result<T, SerializationError>
    where
        T: DeserializeOwned + 'static,
    {
        ensure_not_cancelled(cancel, Operation::Deserialize)?;
        ensure_resolvable::<T>(self.resolver.as_ref(), Operation::Deserialize)?;

        serde_json::from_slice(bytes).map_err(|e| {
            SerializationError::format(Operation::Deserialize, e.to_string())
                .with_target::<T>()
                .with_source(e)
        })
    }

    fn serialize_cached_with<T>(
        &self,
        value: &T,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, SerializationError>
    where
        T: Serialize + Hash + 'static,
    {
        let Some(cache) = &self.cache else {
            return self.serialize_with(value, cancel);
        };
        ensure_not_cancelled(cancel, Operation::Serialize)?;

        let key = cache.key_for(value);
        if let Some(bytes) = cache.get(&key) {
            tracing::debug!(target_type = std::any::type_name::<T>(), "Serialization cache hit");
            return Ok(bytes.to_vec());
        }

        let bytes = self.serialize_with(value, cancel)?;
        // A cancelled call must not leave anything behind.
        if !cache.insert_unless_cancelled(key, Arc::from(bytes.as_slice()), cancel) {
            ensure_not_cancelled(cancel, Operation::Serialize)?;
        }
        Ok(bytes)
    }

    fn capabilities(&self) -> CapabilityMap {
        let map = CapabilityMap::new()
            .with(keys::SERIALIZER, "json")
            .with(keys::FORMAT, "application/json")
            .with(keys::RESOLVER, self.resolver.name())
            .with(keys::COMPRESSION, "none")
            .with(keys::THREAD_SAFE, true)
            .with(keys::CACHE_ENABLED, self.cache.is_some());
        match &self.cache {
            Some(cache) => map
                .with(keys::CACHE_MAX_ENTRIES, cache.max_entries())
                .with(keys::CACHE_EVICTION, "fifo"),
            None => map,
        }
    }
}

#[cfg(test)]
mod tests {
    use sealwire_types::SerializationErrorKind;
    use serde::Deserialize;

    use super::*;
    use crate::resolver::RegistryResolver;

    #[derive(Debug, PartialEq, Hash, Serialize, Deserialize)]
    struct Order {
        id: u32,
        symbol: String,
    }

    fn order(id: u32) -> Order {
        Order {
            id,
            symbol: "BTC/USDT".to_string(),
        }
    }

    #[test]
    fn roundtrip() {
        let s = JsonSerializer::new();
        let bytes = s.serialize(&order(1)).unwrap();
        let back: Order = s.deserialize(&bytes).unwrap();
        assert_eq!(back, order(1));
    }

    #[test]
    fn malformed_input_is_format_error() {
        let err = JsonSerializer::new()
            .deserialize::<Order>(b"{not json")
            .unwrap_err();
        assert_eq!(err.kind(), SerializationErrorKind::Format);
        assert_eq!(err.operation(), Operation::Deserialize);
        assert!(err.target_type().unwrap().contains("Order"));
    }

    #[test]
    fn absent_value_is_empty_bytes() {
        let s = JsonSerializer::new();
        assert!(s.serialize_optional::<Order>(None).unwrap().is_empty());
        assert_eq!(s.deserialize_optional::<Order>(&[]).unwrap(), None);

        let bytes = s.serialize_optional(Some(&order(2))).unwrap();
        assert_eq!(s.deserialize_optional::<Order>(&bytes).unwrap(), Some(order(2)));
    }

    #[test]
    fn unregistered_type_is_formatter_missing() {
        let resolver = RegistryResolver::new("orders-only").register::<Order>();
        let s = JsonSerializer::new().with_resolver(Arc::new(resolver));

        assert!(s.serialize(&order(1)).is_ok());
        let err = s.serialize(&"free text").unwrap_err();
        assert_eq!(err.kind(), SerializationErrorKind::FormatterMissing);
        assert_ne!(err.code(), SerializationError::format(Operation::Serialize, "").code());
        assert_eq!(s.capabilities().get(keys::RESOLVER), Some("orders-only"));
    }

    #[test]
    fn cache_hit_skips_serialization() {
        let s = JsonSerializer::new().with_cache(&CacheConfig::bounded(8));
        let first = s.serialize_cached(&order(1)).unwrap();
        let second = s.serialize_cached(&order(1)).unwrap();
        assert_eq!(first, second);

        let stats = s.cache_stats().unwrap();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn cache_fifo_eviction_after_max_plus_one() {
        let s = JsonSerializer::new().with_cache(&CacheConfig::bounded(3));
        for id in 0..4 {
            s.serialize_cached(&order(id)).unwrap();
        }
        // order(0) was evicted: looking it up again misses.
        s.serialize_cached(&order(0)).unwrap();
        let stats = s.cache_stats().unwrap();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 5);
        assert!(stats.evictions >= 1);
    }

    #[test]
    fn cancelled_call_does_not_populate_cache() {
        let s = JsonSerializer::new().with_cache(&CacheConfig::bounded(4));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = s.serialize_cached_with(&order(9), &cancel).unwrap_err();
        assert_eq!(err.kind(), SerializationErrorKind::Cancelled);
        assert_eq!(s.cache_stats().unwrap().entries, 0);
    }

    #[test]
    fn cancelled_token_wins_over_warm_cache() {
        let s = JsonSerializer::new().with_cache(&CacheConfig::bounded(4));
        s.serialize_cached(&7_u64).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let plain = s.serialize_with(&7_u64, &cancel).unwrap_err();
        let cached = s.serialize_cached_with(&7_u64, &cancel).unwrap_err();
        assert_eq!(plain.kind(), SerializationErrorKind::Cancelled);
        assert_eq!(cached.kind(), SerializationErrorKind::Cancelled);
        assert_eq!(s.cache_stats().unwrap().hits, 0);
    }

    #[test]
    fn uncached_serializer_ignores_cached_path() {
        let s = JsonSerializer::new();
        assert!(s.serialize_cached(&order(1)).is_ok());
        assert!(s.cache_stats().is_none());
    }

    #[test]
    fn capabilities_describe_cache() {
        let caps = JsonSerializer::new()
            .with_cache(&CacheConfig::bounded(16))
            .capabilities();
        assert_eq!(caps.get(keys::SERIALIZER), Some("json"));
        assert_eq!(caps.get(keys::CACHE_ENABLED), Some("true"));
        assert_eq!(caps.get(keys::CACHE_MAX_ENTRIES), Some("16"));
        assert_eq!(caps.get(keys::CACHE_EVICTION), Some("fifo"));
        assert_eq!(caps.get(keys::THREAD_SAFE), Some("true"));

        let plain = JsonSerializer::new().capabilities();
        assert_eq!(plain.get(keys::CACHE_ENABLED), Some("false"));
        assert!(!plain.contains_key(keys::CACHE_MAX_ENTRIES));
    }
}
