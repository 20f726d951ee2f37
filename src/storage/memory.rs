//! In-memory local cache.
//!
//! Reference implementation of `LocalCache`: a map behind an `RwLock`.
//! Nothing survives the process, so use it for tests and for embedding
//! where persistence is handled elsewhere.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::model::SessionId;
use crate::Result;
use super::LocalCache;

/// In-memory document cache. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryCache {
    inner: Arc<RwLock<HashMap<SessionId, String>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl LocalCache for MemoryCache {
    fn store(&self, session: &SessionId, document: &str) -> Result<()> {
        self.inner.write().insert(session.clone(), document.to_owned());
        Ok(())
    }

    fn fetch(&self, session: &SessionId) -> Result<Option<String>> {
        Ok(self.inner.read().get(session).cloned())
    }

    fn remove(&self, session: &SessionId) -> Result<bool> {
        Ok(self.inner.write().remove(session).is_some())
    }

    fn sessions(&self) -> Result<Vec<SessionId>> {
        let mut ids: Vec<SessionId> = self.inner.read().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
