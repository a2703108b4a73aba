//! Capability maps: read-only, diagnostics-only reports of how a pipeline
//! stage is configured.
//!
//! Nothing in SealWire branches on a capability map. They exist so
//! operators and tests can see what a composed pipeline actually does.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

/// Well-known capability keys.
pub mod keys {
    pub const SERIALIZER: &str = "serializer";
    pub const FORMAT: &str = "format";
    pub const RESOLVER: &str = "resolver";
    pub const COMPRESSION: &str = "compression";
    pub const COMPRESSION_LEVEL: &str = "compression.level";
    pub const COMPRESSION_MAX_DECOMPRESSED: &str = "compression.max_decompressed_bytes";
    pub const CACHE_ENABLED: &str = "cache.enabled";
    pub const CACHE_MAX_ENTRIES: &str = "cache.max_entries";
    pub const CACHE_EVICTION: &str = "cache.eviction";
    pub const THREAD_SAFE: &str = "thread_safe";
    pub const ENCODING: &str = "encoding";
    pub const ENCRYPTION_ENABLED: &str = "encryption.enabled";
    pub const ENCRYPTION_SKIP_SMALL: &str = "encryption.skip_small_objects";
    pub const ENCRYPTION_THRESHOLD: &str = "encryption.threshold";
    pub const ENCRYPTION_ENCRYPTOR: &str = "encryption.encryptor";
}

/// String-keyed descriptive report of a component's configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityMap(BTreeMap<String, String>);

impl CapabilityMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry, returning the updated map.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.0.insert(key.into(), value.to_string());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Layer `other` on top; its entries win on key clashes.
    #[must_use]
    pub fn merged(mut self, other: Self) -> Self {
        self.0.extend(other.0);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for CapabilityMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{k}={v}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_replaces_existing_entry() {
        let caps = CapabilityMap::new()
            .with(keys::SERIALIZER, "json")
            .with(keys::SERIALIZER, "json+deflate");
        assert_eq!(caps.len(), 1);
        assert_eq!(caps.get(keys::SERIALIZER), Some("json+deflate"));
    }

    #[test]
    fn merged_overrides() {
        let base = CapabilityMap::new().with(keys::SERIALIZER, "json").with(keys::ENCODING, "none");
        let merged = base.merged(CapabilityMap::new().with(keys::ENCODING, "hex"));
        assert_eq!(merged.get(keys::SERIALIZER), Some("json"));
        assert_eq!(merged.get(keys::ENCODING), Some("hex"));
    }

    #[test]
    fn display_is_sorted() {
        let caps = CapabilityMap::new().with("b", 2).with("a", true);
        assert_eq!(caps.to_string(), "a=true, b=2");
    }
}
