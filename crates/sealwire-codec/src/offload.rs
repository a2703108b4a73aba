//! Async entry points that keep CPU-bound codec work off the runtime.
//!
//! ## Design Principles
//!
//! - **Offload what is large**: inputs of at least
//!   [`OFFLOAD_THRESHOLD_BYTES`] go to `tokio::task::spawn_blocking`;
//!   smaller inputs run inline. Serialization always offloads because its
//!   output size is not known up front.
//! - **Cancellation is its own outcome**: a fired [`CancellationToken`]
//!   yields `Cancelled`, and [`with_deadline`] yields `TimedOut`. Neither is
//!   reported as a format or internal failure.
//! - **No late commits**: the offloaded closure shares the caller's token,
//!   so a cancelled or timed-out serialization skips its cache write even if
//!   the blocking thread runs to completion.

use std::{future::Future, hash::Hash, sync::Arc, time::Duration};

use sealwire_types::{Operation, SerializationError, constants::OFFLOAD_THRESHOLD_BYTES};
use serde::{Serialize, de::DeserializeOwned};
use tokio_util::sync::CancellationToken;

use crate::{
    encoding::Encoder,
    serializer::{Serializer, ensure_not_cancelled},
};

/// Run `work` on the blocking pool, racing it against `cancel`.
async fn run_blocking<R, F>(
    operation: Operation,
    cancel: &CancellationToken,
    work: F,
) -> Result<R, SerializationError>
where
    F: FnOnce() -> Result<R, SerializationError> + Send + 'static,
    R: Send + 'static,
{
    ensure_not_cancelled(cancel, operation)?;
    let handle = tokio::task::spawn_blocking(work);

    tokio::select! {
        biased;

        () = cancel.cancelled() => {
            tracing::debug!(%operation, "Offloaded codec work cancelled");
            Err(SerializationError::cancelled(operation))
        }
        joined = handle => joined.map_err(|e| {
            SerializationError::internal(operation, format!("offloaded task failed: {e}"))
                .with_source(e)
        })?,
    }
}

/// Serialize on the blocking pool.
///
/// # Errors
/// `Cancelled` if `cancel` fires first; otherwise whatever the serializer
/// returns.
pub async fn serialize_async<S, T>(
    serializer: Arc<S>,
    value: T,
    cancel: CancellationToken,
) -> Result<Vec<u8>, SerializationError>
where
    S: Serializer + 'static,
    T: Serialize + Send + 'static,
{
    let token = cancel.clone();
    run_blocking(Operation::Serialize, &cancel, move || {
        serializer.serialize_with(&value, &token)
    })
    .await
}

/// [`serialize_async`] through the result cache.
///
/// # Errors
/// As [`serialize_async`]. A cancelled call never populates the cache.
pub async fn serialize_cached_async<S, T>(
    serializer: Arc<S>,
    value: T,
    cancel: CancellationToken,
) -> Result<Vec<u8>, SerializationError>
where
    S: Serializer + 'static,
    T: Serialize + Hash + Send + 'static,
{
    let token = cancel.clone();
    run_blocking(Operation::Serialize, &cancel, move || {
        serializer.serialize_cached_with(&value, &token)
    })
    .await
}

/// Deserialize, offloading large inputs.
///
/// # Errors
/// `Cancelled` if `cancel` fires first; otherwise whatever the serializer
/// returns.
pub async fn deserialize_async<S, T>(
    serializer: Arc<S>,
    bytes: Vec<u8>,
    cancel: CancellationToken,
) -> Result<T, SerializationError>
where
    S: Serializer + 'static,
    T: DeserializeOwned + Send + 'static,
{
    if bytes.len() < OFFLOAD_THRESHOLD_BYTES {
        return serializer.deserialize_with(&bytes, &cancel);
    }
    let token = cancel.clone();
    run_blocking(Operation::Deserialize, &cancel, move || {
        serializer.deserialize_with(&bytes, &token)
    })
    .await
}

/// Encode, offloading large inputs.
///
/// # Errors
/// `Cancelled` if `cancel` fires first.
pub async fn encode_async<E>(
    encoder: Arc<E>,
    bytes: Vec<u8>,
    cancel: CancellationToken,
) -> Result<String, SerializationError>
where
    E: Encoder + 'static,
{
    if bytes.len() < OFFLOAD_THRESHOLD_BYTES {
        ensure_not_cancelled(&cancel, Operation::Encode)?;
        return Ok(encoder.encode(&bytes));
    }
    run_blocking(Operation::Encode, &cancel, move || Ok(encoder.encode(&bytes))).await
}

/// Decode, offloading large inputs.
///
/// # Errors
/// `Cancelled` if `cancel` fires first; a `Format` error for malformed text.
pub async fn decode_async<E>(
    encoder: Arc<E>,
    text: String,
    cancel: CancellationToken,
) -> Result<Vec<u8>, SerializationError>
where
    E: Encoder + 'static,
{
    if text.len() < OFFLOAD_THRESHOLD_BYTES {
        ensure_not_cancelled(&cancel, Operation::Decode)?;
        return encoder.decode(&text);
    }
    run_blocking(Operation::Decode, &cancel, move || encoder.decode(&text)).await
}

/// Bound `fut` by `deadline`.
///
/// On expiry `cancel` is fired, so offloaded work driven by the same token
/// stops before committing anything, and the call yields `TimedOut`.
///
/// # Errors
/// `TimedOut` on expiry; otherwise the future's own result.
pub async fn with_deadline<F, R>(
    operation: Operation,
    deadline: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> Result<R, SerializationError>
where
    F: Future<Output = Result<R, SerializationError>>,
{
    if let Ok(result) = tokio::time::timeout(deadline, fut).await {
        return result;
    }
    cancel.cancel();
    tracing::warn!(
        %operation,
        deadline_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
        "Codec deadline elapsed"
    );
    Err(SerializationError::timed_out(operation))
}
