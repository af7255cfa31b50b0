//! PromHouse remote-write ingest path.
//!
//! The ingest path is responsible for:
//!
//! * Receiving Prometheus remote-write requests via HTTP.
//! * Bounding the size of the request body, and of its decompressed form.
//! * Decompressing the Snappy block & decoding the protobuf `WriteRequest`.
//! * Enforcing the structural invariants of each time series.
//! * Handing the resulting request to a [`StorageSink`].
//!
//! [`StorageSink`]: storage::StorageSink

#![warn(missing_docs)]

pub mod server;
pub mod storage;
pub mod validation;
pub mod wire;
