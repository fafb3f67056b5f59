//! Adapters that live inside the domain crate for convenience.
//!
//! The in-memory store backs unit tests, local demos and the `memory`
//! storage provider of the API. The durable SQLite store lives in its own
//! crate.

pub mod memory_store;
