//! # Local Cache Trait
//!
//! The contract between a [`Canvas`](crate::Canvas) and its local durable
//! cache. One serialized [`SessionDocument`](crate::session::SessionDocument)
//! is kept per session id; the canvas writes it after every mutation and
//! reads it when a session is opened.
//!
//! ## Implementations
//!
//! | Cache | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryCache` | `memory` | In-process map, for tests and embedding |
//! | `FileCache` | `file` | One JSON file per session in a directory |
//!
//! Caches store opaque text. Parsing and validation stay in the canvas so
//! that every cache reports a corrupt entry the same way.

pub mod memory;
pub mod file;

use crate::model::SessionId;
use crate::Result;

pub use memory::MemoryCache;
pub use file::FileCache;

/// Durable, synchronous key → document store.
///
/// Writes must be all-or-nothing per key: after `store` returns `Ok`, a
/// later `fetch` sees the new document; after an `Err`, it sees the old one.
pub trait LocalCache: Send + Sync + 'static {
    /// Replace the cached document for `session`.
    fn store(&self, session: &SessionId, document: &str) -> Result<()>;

    /// The cached document, if any.
    fn fetch(&self, session: &SessionId) -> Result<Option<String>>;

    /// Drop the cached document. Returns true if one existed.
    fn remove(&self, session: &SessionId) -> Result<bool>;

    /// Ids of every cached session.
    fn sessions(&self) -> Result<Vec<SessionId>>;
}
