//! Configuration types for SealWire serialization pipelines.

use serde::{Deserialize, Serialize};

use crate::{SealwireError, constants};

/// Result cache settings for the base serializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether serialized results are cached.
    pub enabled: bool,
    /// Maximum number of cached results before FIFO eviction.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_entries: constants::DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

impl CacheConfig {
    /// An enabled cache holding at most `max_entries` results.
    #[must_use]
    pub fn bounded(max_entries: usize) -> Self {
        Self {
            enabled: true,
            max_entries,
        }
    }
}

/// When the encrypting serializer may leave a payload in plaintext.
///
/// Skipping is off by default: leaving small payloads unencrypted is a
/// policy decision the caller has to opt into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionPolicy {
    /// Leave payloads smaller than `threshold` bytes unencrypted.
    pub skip_small_objects: bool,
    /// Plaintext size in bytes; payloads strictly smaller are skipped.
    pub threshold: usize,
}

impl Default for EncryptionPolicy {
    fn default() -> Self {
        Self {
            skip_small_objects: false,
            threshold: constants::DEFAULT_ENCRYPTION_THRESHOLD,
        }
    }
}

impl EncryptionPolicy {
    /// Encrypt everything.
    #[must_use]
    pub fn always() -> Self {
        Self::default()
    }

    /// Leave payloads below `threshold` bytes in plaintext.
    #[must_use]
    pub fn skip_below(threshold: usize) -> Self {
        Self {
            skip_small_objects: true,
            threshold,
        }
    }

    /// Whether a plaintext of `len` bytes should bypass encryption.
    #[must_use]
    pub fn should_skip(&self, len: usize) -> bool {
        self.skip_small_objects && len < self.threshold
    }
}

/// Compression stage settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// zlib level, 0 (store) to 9 (best).
    pub level: u32,
    /// Inflated output larger than this is rejected on the read path.
    pub max_decompressed_bytes: usize,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            level: constants::DEFAULT_COMPRESSION_LEVEL,
            max_decompressed_bytes: constants::DEFAULT_MAX_DECOMPRESSED_BYTES,
        }
    }
}

impl CompressionConfig {
    /// Default settings at the given level.
    #[must_use]
    pub fn at_level(level: u32) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }
}

/// Settings for a full serialization pipeline.
///
/// `compression` and `encryption` are `None` when the stage is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub cache: CacheConfig,
    pub compression: Option<CompressionConfig>,
    pub encryption: Option<EncryptionPolicy>,
}

impl PipelineConfig {
    /// Parse and check a JSON config document.
    ///
    /// # Errors
    /// Returns [`SealwireError::Configuration`] if the document does not
    /// parse or holds out-of-range values.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SealwireError::Configuration(format!("invalid pipeline config: {e}")))?;
        config.check()?;
        Ok(config)
    }

    /// Reject values no stage can honor.
    ///
    /// # Errors
    /// Returns [`SealwireError::Configuration`] naming the bad field.
    pub fn check(&self) -> crate::Result<()> {
        if self.cache.enabled && self.cache.max_entries == 0 {
            return Err(SealwireError::Configuration(
                "cache.max_entries must be > 0 when the cache is enabled".to_string(),
            ));
        }
        if let Some(compression) = &self.compression {
            if compression.level > 9 {
                return Err(SealwireError::Configuration(format!(
                    "compression.level must be 0-9, got {}",
                    compression.level
                )));
            }
            if compression.max_decompressed_bytes == 0 {
                return Err(SealwireError::Configuration(
                    "compression.max_decompressed_bytes must be > 0".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encryption_policy_defaults_to_always() {
        let policy = EncryptionPolicy::default();
        assert!(!policy.skip_small_objects);
        assert!(!policy.should_skip(0));
    }

    #[test]
    fn skip_below_is_strict() {
        let policy = EncryptionPolicy::skip_below(100);
        assert!(policy.should_skip(99));
        assert!(!policy.should_skip(100));
        assert!(!policy.should_skip(101));
    }

    #[test]
    fn cache_config_defaults() {
        let cfg = CacheConfig::default();
        assert!(!cfg.enabled);
        assert_eq!(cfg.max_entries, 1024);
    }

    #[test]
    fn pipeline_config_from_json() {
        let cfg = PipelineConfig::from_json(
            r#"{
                "cache": { "enabled": true, "max_entries": 16 },
                "compression": { "level": 9 },
                "encryption": { "skip_small_objects": true, "threshold": 100 }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.cache, CacheConfig::bounded(16));
        assert_eq!(cfg.compression, Some(CompressionConfig::at_level(9)));
        assert_eq!(cfg.encryption, Some(EncryptionPolicy::skip_below(100)));
    }

    #[test]
    fn pipeline_config_missing_fields_use_defaults() {
        let cfg = PipelineConfig::from_json("{}").unwrap();
        assert_eq!(cfg, PipelineConfig::default());
    }

    #[test]
    fn pipeline_config_rejects_zero_cache() {
        let err = PipelineConfig::from_json(r#"{"cache": {"enabled": true, "max_entries": 0}}"#)
            .unwrap_err();
        assert!(matches!(err, SealwireError::Configuration(_)));
        assert!(err.to_string().starts_with("SW_ERR_900"));
    }

    #[test]
    fn pipeline_config_rejects_bad_level() {
        let err = PipelineConfig::from_json(r#"{"compression": {"level": 12}}"#).unwrap_err();
        assert!(matches!(err, SealwireError::Configuration(_)));
    }

    #[test]
    fn pipeline_config_rejects_zero_decompression_limit() {
        let err = PipelineConfig::from_json(
            r#"{"compression": {"level": 6, "max_decompressed_bytes": 0}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("max_decompressed_bytes"), "{err}");
    }

    #[test]
    fn pipeline_config_reads_decompression_limit() {
        let cfg =
            PipelineConfig::from_json(r#"{"compression": {"max_decompressed_bytes": 4096}}"#)
                .unwrap();
        let compression = cfg.compression.unwrap();
        assert_eq!(compression.max_decompressed_bytes, 4096);
        assert_eq!(compression.level, 6);
    }

    #[test]
    fn pipeline_config_rejects_malformed_json() {
        assert!(PipelineConfig::from_json("{ not json").is_err());
    }
}
