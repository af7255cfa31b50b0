//! A [`StorageSink`] that discards everything written to it.

use async_trait::async_trait;
use promhouse_types::WriteRequest;
use tokio_util::sync::CancellationToken;
use tracing::*;

use super::{StorageError, StorageSink};

/// A [`StorageSink`] implementation that drops every write request.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlackholeSink;

impl BlackholeSink {
    /// Construct a new [`BlackholeSink`].
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StorageSink for BlackholeSink {
    async fn write(
        &self,
        request: WriteRequest,
        _cancel: &CancellationToken,
    ) -> Result<(), StorageError> {
        debug!(
            series = request.series_count(),
            samples = request.sample_count(),
            "dropping write request"
        );
        Ok(())
    }
}
