//! AGENTRACE Storage
//!
//! The state store adapter: persistence of spans, agents, checkpoints and
//! replay records behind one async trait, with an in-memory backend for
//! tests and embedding and a redb backend for durable use.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod durable;
pub mod error;
pub mod memory;
pub mod store;

pub use durable::RedbStore;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use store::{StateStore, StoredCheckpoint};
