//! Transport-facing request handlers.
//!
//! Binding listeners and routing requests to these handlers is left to the
//! process embedding them.

pub mod http;
