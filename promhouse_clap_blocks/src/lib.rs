//! Building blocks for [`clap`]-driven configuration of PromHouse components.

pub mod ingest;
