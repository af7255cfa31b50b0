//! Storage backends for decoded write requests.
//!
//! The ingest path hands every validated [`WriteRequest`] to exactly one
//! [`StorageSink`]:
//!
//! ```text
//!                 ┌──────────────────┐
//!                 │     HTTP API     │
//!                 └──────────────────┘
//!                          │
//!                          ▼
//!                 ┌──────────────────┐
//!                 │   WireDecoder    │  snappy block → protobuf bytes
//!                 └──────────────────┘
//!                          │
//!                          ▼
//!                 ┌──────────────────┐
//!                 │  codec::decode   │  protobuf bytes → WriteRequest
//!                 └──────────────────┘
//!                          │
//!                          ▼
//!                 ┌──────────────────┐
//!                 │ RequestValidator │
//!                 └──────────────────┘
//!                          │
//!                          ▼
//!                 ╔══════════════════╗
//!                 ║   StorageSink    ║
//!                 ╚══════════════════╝
//! ```
//!
//! The concrete sink is chosen when the [`HttpDelegate`] is constructed;
//! the delegate is generic over it.
//!
//! [`WriteRequest`]: promhouse_types::WriteRequest
//! [`HttpDelegate`]: crate::server::http::HttpDelegate

mod r#trait;
pub use r#trait::*;

pub mod blackhole;
pub mod memory;

#[cfg(test)]
pub mod mock;
