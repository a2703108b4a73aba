//! System-wide constants for SealWire.

/// Frame flag: the bytes that follow are plaintext.
pub const FRAME_FLAG_PLAIN: u8 = 0x00;

/// Frame flag: the bytes that follow are ciphertext.
pub const FRAME_FLAG_ENCRYPTED: u8 = 0x01;

/// Default maximum number of entries in a serializer result cache.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 1024;

/// Default plaintext size (bytes) below which encryption may be skipped,
/// when skipping is enabled.
pub const DEFAULT_ENCRYPTION_THRESHOLD: usize = 1024;

/// Default zlib compression level (0-9).
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Default ceiling on inflated output (16 MiB).
pub const DEFAULT_MAX_DECOMPRESSED_BYTES: usize = 16 * 1024 * 1024;

/// Payloads at or above this size are offloaded to the blocking pool by the
/// async helpers.
pub const OFFLOAD_THRESHOLD_BYTES: usize = 64 * 1024;

/// Domain separator prepended to envelope signing digests.
pub const SIGNING_DOMAIN: &[u8] = b"sealwire:envelope:v1:";

/// Well-known header keys.
pub mod headers {
    pub const CORRELATION_ID: &str = "CorrelationId";
    pub const TIMESTAMP: &str = "Timestamp";
    pub const CONTENT_TYPE: &str = "ContentType";
    pub const VERSION: &str = "Version";
    /// Prefix for namespaced metadata headers: `meta.<namespace>.<key>`.
    pub const METADATA_PREFIX: &str = "meta";
}
