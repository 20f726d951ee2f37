//! In-process remote actor.
//!
//! Behaves like a slow, occasionally unreachable service: every call
//! sleeps for the configured latency first, and while offline every call
//! fails with `SyncUnavailable`. A save that is older than the held
//! document is dropped; every accepted save is appended to a per-session
//! history.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use parking_lot::RwLock;
use serde::Deserialize;

use crate::model::SessionId;
use crate::{Error, Result};
use super::RemoteActor;

#[derive(Default)]
struct RemoteState {
    current: HashMap<SessionId, String>,
    history: HashMap<SessionId, Vec<String>>,
}

impl RemoteState {
    fn insert(&mut self, session: &SessionId, document: String) {
        self.history.entry(session.clone()).or_default().push(document.clone());
        self.current.insert(session.clone(), document);
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Stamp {
    last_updated: DateTime<Utc>,
}

/// `lastUpdated` of a document, if it has a readable one.
fn stamp_of(document: &str) -> Option<DateTime<Utc>> {
    serde_json::from_str::<Stamp>(document).ok().map(|s| s.last_updated)
}

/// Clones share the same store, so a test can keep a handle after giving
/// one to a canvas.
#[derive(Clone, Default)]
pub struct MemoryRemote {
    state: Arc<RwLock<RemoteState>>,
    latency: Arc<RwLock<Duration>>,
    offline: Arc<AtomicBool>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        let remote = Self::default();
        remote.set_latency(latency);
        remote
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write() = latency;
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Plant a document as if another client had saved it.
    pub fn put(&self, session: &SessionId, document: impl Into<String>) {
        self.state.write().insert(session, document.into());
    }

    /// What the remote holds right now, without latency or the offline check.
    pub fn peek(&self, session: &SessionId) -> Option<String> {
        self.state.read().current.get(session).cloned()
    }

    async fn reach(&self) -> Result<()> {
        let latency = *self.latency.read();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.is_offline() {
            return Err(Error::SyncUnavailable("remote actor is offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteActor for MemoryRemote {
    async fn save(&self, session: &SessionId, document: String) -> Result<()> {
        self.reach().await?;
        let mut state = self.state.write();
        let held = state.current.get(session).and_then(|d| stamp_of(d));
        if let (Some(held), Some(incoming)) = (held, stamp_of(&document)) {
            if held > incoming {
                tracing::debug!(session = %session, %held, %incoming, "remote kept newer document");
                return Ok(());
            }
        }
        state.insert(session, document);
        Ok(())
    }

    async fn load(&self, session: &SessionId) -> Result<Option<String>> {
        self.reach().await?;
        Ok(self.peek(session))
    }

    async fn history(&self, session: &SessionId) -> Result<Vec<String>> {
        self.reach().await?;
        Ok(self.state.read().history.get(session).cloned().unwrap_or_default())
    }
}
