//! Record Store for LeadDesk.
//!
//! Keyed, durable CRUD over the three entity collections plus the audit log,
//! behind the [`Storage`] trait. Two backends: [`JsonStorage`] (one JSON file
//! per record under a root directory) and [`MemoryStorage`] (in-process, for
//! tests and ephemeral use).

mod json_storage;
mod memory_storage;
mod trait_;

pub use json_storage::JsonStorage;
pub use memory_storage::MemoryStorage;
pub use trait_::{Result, Storage, StorageError};
