//! Types shared across the PromHouse ingest path: the Prometheus remote-write
//! data model and its binary encoding.

pub mod codec;
pub mod write;

pub use write::{Fingerprint, Label, METRIC_NAME_LABEL, Sample, TimeSeries, WriteRequest};
