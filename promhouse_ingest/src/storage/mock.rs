//! A mock implementation of [`StorageSink`].

#![allow(missing_docs)]

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use promhouse_types::WriteRequest;
use tokio_util::sync::CancellationToken;

use super::{StorageError, StorageSink};

#[derive(Debug, Clone)]
pub enum MockSinkCall {
    Write { request: WriteRequest },
}

#[derive(Debug, Default)]
struct Inner {
    calls: Vec<MockSinkCall>,
    write_return: VecDeque<Result<(), StorageError>>,
}

/// Records every call and returns the scripted results, in order.
///
/// Panics if called more times than there are scripted results.
#[derive(Debug, Default)]
pub struct MockSink {
    state: Mutex<Inner>,
}

impl MockSink {
    pub fn with_write_return(
        self,
        ret: impl Into<VecDeque<Result<(), StorageError>>>,
    ) -> Self {
        self.state.lock().write_return = ret.into();
        self
    }

    pub fn calls(&self) -> Vec<MockSinkCall> {
        self.state.lock().calls.clone()
    }
}

#[async_trait]
impl StorageSink for MockSink {
    async fn write(
        &self,
        request: WriteRequest,
        _cancel: &CancellationToken,
    ) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        state.calls.push(MockSinkCall::Write { request });
        state
            .write_return
            .pop_front()
            .expect("no mock sink write result to return")
    }
}
