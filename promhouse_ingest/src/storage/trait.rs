use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use promhouse_types::WriteRequest;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

type Cause = Box<dyn std::error::Error + Send + Sync>;

/// A [`StorageSink`] failed to record a write.
///
/// This is a single, opaque failure category: the ingest path does not
/// distinguish between storage failures, it only surfaces them. The optional
/// cause is kept for diagnostics.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The write failed for the attached reason.
    #[error("storage write failed: {0}")]
    Cause(#[source] Cause),

    /// The write failed for an unknown reason.
    #[error("storage write failed")]
    Opaque,
}

impl StorageError {
    /// Construct a [`StorageError`] caused by `cause`.
    pub fn new(cause: impl Into<Cause>) -> Self {
        Self::Cause(cause.into())
    }

    /// Construct a [`StorageError`] without a known cause.
    pub fn opaque() -> Self {
        Self::Opaque
    }

    /// The underlying cause, if known.
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Cause(cause) => Some(cause.as_ref()),
            Self::Opaque => None,
        }
    }
}

/// A storage backend accepting validated [`WriteRequest`]s.
///
/// Implementations must be safe to call concurrently: a single sink instance
/// is shared by every in-flight request. Retries, batching and ordering of
/// concurrent writes are the responsibility of the implementation; the
/// ingest path calls [`StorageSink::write()`] exactly once per request.
#[async_trait]
pub trait StorageSink: Debug + Send + Sync {
    /// Durably record `request`.
    ///
    /// Implementations should stop work and return promptly once `cancel` is
    /// cancelled.
    async fn write(
        &self,
        request: WriteRequest,
        cancel: &CancellationToken,
    ) -> Result<(), StorageError>;
}

#[async_trait]
impl<T> StorageSink for Arc<T>
where
    T: StorageSink,
{
    async fn write(
        &self,
        request: WriteRequest,
        cancel: &CancellationToken,
    ) -> Result<(), StorageError> {
        (**self).write(request, cancel).await
    }
}
