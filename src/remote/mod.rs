//! # Remote Persistence Actor
//!
//! The contract a [`Canvas`](crate::Canvas) syncs against. A remote actor
//! stores one full session document per session id and hands back
//! whatever it currently holds. It never interprets the document; the
//! canvas parses and validates everything it pulls, so an actor that
//! returns garbage is reported as [`Error::SyncUnavailable`](crate::Error)
//! rather than trusted.
//!
//! Calls are async and may be slow or fail. The canvas bounds each call
//! with the configured sync timeout.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::SessionId;
use crate::{Error, Result};

pub use memory::MemoryRemote;

/// How a completed sync settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncOutcome {
    /// The local session was at least as new as the remote; nothing changed locally.
    LocalRetained,
    /// The remote document was strictly newer and replaced the local session.
    RemoteApplied,
}

#[async_trait]
pub trait RemoteActor: Send + Sync + 'static {
    /// Store `document` for `session` unless the remote already holds one
    /// with a strictly newer `lastUpdated`.
    async fn save(&self, session: &SessionId, document: String) -> Result<()>;

    /// The remote's current document, or `None` if it holds nothing.
    async fn load(&self, session: &SessionId) -> Result<Option<String>>;

    /// Earlier documents for `session`, oldest first.
    async fn history(&self, session: &SessionId) -> Result<Vec<String>> {
        Err(Error::SyncUnavailable(format!("remote keeps no history for session {session}")))
    }
}
