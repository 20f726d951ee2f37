//! # thought-grid — Spatial Thought-Graph Engine
//!
//! A directed graph of content nodes laid out on an infinite square grid,
//! grown through a constrained directional protocol, explored tile by
//! tile, cached locally and reconciled with a remote persistence actor.
//!
//! ## Design Principles
//!
//! 1. **Sessions share nothing**: every node, edge and tile belongs to
//!    exactly one session; occupancy is checked per session
//! 2. **Clean DTOs**: `Node`, `Edge`, `Tile`, `Value` cross all boundaries
//! 3. **Expansion is a pure plan**: the graph snapshot is the protocol state
//! 4. **Trait seams at the edges**: `LocalCache` and `RemoteActor` are the
//!    only things a host has to provide
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use thought_grid::{Canvas, Direction, ExpandRequest, MemoryRemote, Relation, SessionId};
//!
//! # async fn example() -> thought_grid::Result<()> {
//! let canvas = Canvas::open_memory(MemoryRemote::new())?;
//! let session = SessionId::from("walk");
//!
//! let doc = canvas.start_session(&session)?;
//! let origin = doc.nodes[0].id;
//!
//! let grown = canvas.expand(&session, &ExpandRequest::new(origin, Direction::Right, Relation::Time))?;
//! println!("{} at {}", grown.node.id, grown.node.position);
//!
//! canvas.sync(&session).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Caches
//!
//! | Cache | Description |
//! |-------|-------------|
//! | `MemoryCache` | In-process, for tests and embedding |
//! | `FileCache` | One JSON document per session in a directory |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod graph;
pub mod expand;
pub mod placement;
pub mod session;
pub mod storage;
pub mod remote;
pub mod export;
pub mod api;
pub mod config;

use std::future::Future;
use std::io::{Read, Write};
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::broadcast;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    ContentMap, Direction, Edge, EdgeId, EdgeMeta, GridCoordinate, GridGeometry, NewNode, Node,
    NodeId, NodePatch, PixelPosition, Relation, SessionId, Tile, TileId, TileStatus, TrailKind,
    TrailPoint, TrailStats, Value,
};

// ============================================================================
// Re-exports: Engine
// ============================================================================

pub use config::EngineConfig;
pub use expand::{ExpandRequest, ExpandSettings, Expansion};
pub use graph::GraphStore;
pub use placement::{Advance, DirectionSource, RandomDirections, ScriptedDirections, TileMap};
pub use session::{Session, SessionDocument};

// ============================================================================
// Re-exports: Persistence
// ============================================================================

pub use remote::{MemoryRemote, RemoteActor, SyncOutcome};
pub use storage::{FileCache, LocalCache, MemoryCache};

// ============================================================================
// Change events
// ============================================================================

/// Why a session changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeCause {
    Mutated,
    RemoteApplied,
    Imported,
    Reset,
}

/// Broadcast after every committed change, carrying the full new state.
#[derive(Debug, Clone)]
pub struct CanvasEvent {
    pub session: SessionId,
    pub cause: ChangeCause,
    pub document: Arc<SessionDocument>,
}

// ============================================================================
// Top-level Canvas handle
// ============================================================================

/// The primary entry point. A `Canvas` owns the resident sessions and
/// wires them to a local cache and a remote actor.
///
/// All graph and placement calls are synchronous and atomic: each runs
/// against a working copy that is written to the cache before it replaces
/// the live session. Only [`sync`](Canvas::sync) and
/// [`remote_history`](Canvas::remote_history) suspend.
pub struct Canvas<C: LocalCache, R: RemoteActor> {
    config: EngineConfig,
    geometry: GridGeometry,
    expand_settings: ExpandSettings,
    cache: C,
    remote: R,
    sessions: RwLock<HashMap<SessionId, Session>>,
    syncing: Mutex<HashSet<SessionId>>,
    directions: Mutex<Box<dyn DirectionSource>>,
    events: broadcast::Sender<CanvasEvent>,
}

impl<R: RemoteActor> Canvas<MemoryCache, R> {
    /// Canvas with default config and an in-memory cache.
    pub fn open_memory(remote: R) -> Result<Self> {
        Self::new(EngineConfig::default(), MemoryCache::new(), remote)
    }
}

impl<C: LocalCache, R: RemoteActor> Canvas<C, R> {
    pub fn new(config: EngineConfig, cache: C, remote: R) -> Result<Self> {
        config.validate()?;
        let (events, _) = broadcast::channel(config.event_capacity);
        Ok(Self {
            geometry: config.geometry(),
            expand_settings: config.expand_settings(),
            config,
            cache,
            remote,
            sessions: RwLock::new(HashMap::new()),
            syncing: Mutex::new(HashSet::new()),
            directions: Mutex::new(Box::new(RandomDirections::default())),
            events,
        })
    }

    /// Replace the direction source used by [`advance`](Canvas::advance).
    pub fn with_direction_source(self, source: impl DirectionSource + 'static) -> Self {
        *self.directions.lock() = Box::new(source);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Receive a [`CanvasEvent`] for every committed change from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<CanvasEvent> {
        self.events.subscribe()
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    /// Make a session resident: from memory, else from the cache, else a
    /// fresh session holding only the CURRENT origin tile.
    pub fn open_session(&self, id: &SessionId) -> Result<SessionDocument> {
        let mut sessions = self.sessions.write();
        if let Some(session) = sessions.get(id) {
            return Ok(session.to_document());
        }
        if let Some(session) = self.load_cached(id)? {
            tracing::info!(session = %id, nodes = session.graph().node_count(), "session restored from cache");
            let doc = session.to_document();
            sessions.insert(id.clone(), session);
            return Ok(doc);
        }

        let session = Session::new(id.clone());
        let doc = session.to_document();
        self.cache.store(id, &doc.to_json()?)?;
        sessions.insert(id.clone(), session);
        tracing::info!(session = %id, "session created");
        Ok(doc)
    }

    /// Replace the session with a fresh one seeded with an origin node.
    pub fn start_session(&self, id: &SessionId) -> Result<SessionDocument> {
        let session = Session::seeded(id.clone(), &self.config.origin_kind)?;
        self.replace(id, session, ChangeCause::Reset)
    }

    /// Drop every node, edge and tile of the session and return it to the
    /// bootstrap state.
    ///
    /// The bootstrap document overwrites the cache entry, unreadable or not.
    /// If that write fails the old session stays in place.
    pub fn reset_session(&self, id: &SessionId) -> Result<SessionDocument> {
        self.replace(id, Session::new(id.clone()), ChangeCause::Reset)
    }

    /// Remove the session from the cache and from memory. Returns whether
    /// there was anything to remove.
    pub fn delete_session(&self, id: &SessionId) -> Result<bool> {
        let mut sessions = self.sessions.write();
        let cached = self.cache.remove(id)?;
        let resident = sessions.remove(id).is_some();
        drop(sessions);

        if cached || resident {
            tracing::info!(session = %id, "session deleted");
        }
        Ok(cached || resident)
    }

    /// Ids of every session the canvas knows of, resident or cached.
    pub fn sessions(&self) -> Result<Vec<SessionId>> {
        let mut ids: HashSet<SessionId> = self.cache.sessions()?.into_iter().collect();
        ids.extend(self.sessions.read().keys().cloned());
        let mut ids: Vec<SessionId> = ids.into_iter().collect();
        ids.sort();
        Ok(ids)
    }

    pub fn snapshot(&self, id: &SessionId) -> Result<SessionDocument> {
        self.read(id, |s| Ok(s.to_document()))
    }

    // ========================================================================
    // Graph store
    // ========================================================================

    pub fn create_node(&self, id: &SessionId, new: NewNode) -> Result<Node> {
        self.mutate(id, |s| s.create_node(new))
    }

    pub fn create_edge(
        &self,
        id: &SessionId,
        source: NodeId,
        target: NodeId,
        relation: Relation,
        meta: Option<EdgeMeta>,
    ) -> Result<Edge> {
        self.mutate(id, |s| s.create_edge(source, target, relation, meta))
    }

    pub fn update_node_content(&self, id: &SessionId, node: NodeId, patch: NodePatch) -> Result<Node> {
        self.mutate(id, |s| s.update_node_content(node, patch))
    }

    pub fn node(&self, id: &SessionId, node: NodeId) -> Result<Node> {
        self.read(id, |s| s.graph().require_node(node).cloned())
    }

    pub fn node_at(&self, id: &SessionId, coord: GridCoordinate) -> Result<Option<Node>> {
        self.read(id, |s| Ok(s.graph().node_at(coord).cloned()))
    }

    /// Nodes reachable by one outgoing edge, in connection order.
    pub fn neighbors(&self, id: &SessionId, node: NodeId) -> Result<Vec<Node>> {
        self.read(id, |s| Ok(s.graph().neighbors(node)?.into_iter().cloned().collect()))
    }

    /// Nodes with an edge pointing at `node`.
    pub fn incoming(&self, id: &SessionId, node: NodeId) -> Result<Vec<Node>> {
        self.read(id, |s| Ok(s.graph().incoming(node)?.into_iter().cloned().collect()))
    }

    // ========================================================================
    // Expansion
    // ========================================================================

    pub fn expand(&self, id: &SessionId, req: &ExpandRequest) -> Result<Expansion> {
        let result = self.mutate(id, |s| s.expand(req, &self.expand_settings));
        if let Err(e) = &result {
            tracing::debug!(session = %id, base = %req.base, direction = %req.direction, error = %e, "expansion rejected");
        }
        result
    }

    /// Directions `node` can currently expand into.
    pub fn available_directions(&self, id: &SessionId, node: NodeId) -> Result<Vec<Direction>> {
        self.read(id, |s| expand::available_directions(s.graph(), node, &self.expand_settings))
    }

    // ========================================================================
    // Placement
    // ========================================================================

    pub fn advance(&self, id: &SessionId) -> Result<Advance> {
        self.mutate(id, |s| {
            let mut source = self.directions.lock();
            s.advance(&mut **source, &self.geometry)
        })
    }

    /// Advance, then place a node of `kind` on the new tile if it is free.
    pub fn advance_and_place(&self, id: &SessionId, kind: &str) -> Result<(Advance, Option<Node>)> {
        self.mutate(id, |s| {
            let mut source = self.directions.lock();
            s.advance_and_place(&mut **source, &self.geometry, kind)
        })
    }

    pub fn record_trail(&self, id: &SessionId, kind: TrailKind) -> Result<TrailPoint> {
        self.mutate(id, |s| Ok(s.record_trail(kind, &self.geometry)))
    }

    pub fn tile_at(&self, id: &SessionId, coord: GridCoordinate) -> Result<Option<Tile>> {
        self.read(id, |s| Ok(s.tiles().tile_at(coord).cloned()))
    }

    pub fn current_tile(&self, id: &SessionId) -> Result<Tile> {
        self.read(id, |s| Ok(s.tiles().current().clone()))
    }

    /// The most recent trail points, up to the configured display limit.
    pub fn visible_trail(&self, id: &SessionId) -> Result<Vec<TrailPoint>> {
        self.read(id, |s| Ok(s.tiles().visible_trail(self.config.trail_display_limit).to_vec()))
    }

    pub fn trail_stats(&self, id: &SessionId) -> Result<TrailStats> {
        self.read(id, |s| Ok(s.tiles().trail_stats()))
    }

    // ========================================================================
    // Remote sync
    // ========================================================================

    /// Push the local session, pull the remote's, and keep whichever has
    /// the later `lastUpdated`.
    ///
    /// A second sync for the same session while this one is pending fails
    /// with [`Error::SyncInProgress`]. Dropping the returned future abandons
    /// the sync; local state is only touched after a successful pull.
    pub async fn sync(&self, id: &SessionId) -> Result<SyncOutcome> {
        let _guard = SyncGuard::acquire(&self.syncing, id)?;
        let local = self.snapshot(id)?;
        tracing::info!(session = %id, local = %local.last_updated, "sync started");

        let pushed = local.to_json()?;
        self.remote_call(id, "push", self.remote.save(id, pushed)).await?;
        let pulled = self.remote_call(id, "pull", self.remote.load(id)).await?;

        let outcome = match pulled {
            None => SyncOutcome::LocalRetained,
            Some(text) => {
                let remote = self.parse_remote(id, &text)?;
                self.apply_remote(id, remote)?
            }
        };
        tracing::info!(session = %id, ?outcome, "sync finished");
        Ok(outcome)
    }

    /// Earlier remote versions of the session, oldest first.
    pub async fn remote_history(&self, id: &SessionId) -> Result<Vec<SessionDocument>> {
        let entries = self.remote_call(id, "history", self.remote.history(id)).await?;
        entries
            .iter()
            .map(|text| self.parse_remote(id, text).map(Session::into_document))
            .collect()
    }

    // ========================================================================
    // Export / import
    // ========================================================================

    pub fn export(&self, id: &SessionId, writer: &mut dyn Write) -> Result<()> {
        let doc = self.snapshot(id)?;
        export::export_session(&doc, writer)
    }

    /// Restore a session from an exported document, replacing any session
    /// with the same id. Nothing changes unless the whole document is valid.
    pub fn import(&self, reader: &mut dyn Read) -> Result<SessionDocument> {
        let doc = export::import_session(reader)?;
        let id = doc.session_id.clone();
        let session = Session::from_document(doc)?;
        self.replace(&id, session, ChangeCause::Imported)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn load_cached(&self, id: &SessionId) -> Result<Option<Session>> {
        match self.cache.fetch(id)? {
            Some(text) => {
                let doc = SessionDocument::from_json(&text)?;
                Ok(Some(Session::from_document(doc)?))
            }
            None => Ok(None),
        }
    }

    fn resident<'a>(&self, sessions: &'a mut HashMap<SessionId, Session>, id: &SessionId) -> Result<&'a mut Session> {
        if !sessions.contains_key(id) {
            let session = self.load_cached(id)?.ok_or_else(|| Error::UnknownSession(id.clone()))?;
            tracing::debug!(session = %id, "session loaded from cache");
            sessions.insert(id.clone(), session);
        }
        sessions.get_mut(id).ok_or_else(|| Error::UnknownSession(id.clone()))
    }

    fn read<T>(&self, id: &SessionId, f: impl FnOnce(&Session) -> Result<T>) -> Result<T> {
        if let Some(session) = self.sessions.read().get(id) {
            return f(session);
        }
        let mut sessions = self.sessions.write();
        let session = self.resident(&mut sessions, id)?;
        f(session)
    }

    /// Run `f` on a working copy; cache it, then swap it in.
    fn mutate<T>(&self, id: &SessionId, f: impl FnOnce(&mut Session) -> Result<T>) -> Result<T> {
        let mut sessions = self.sessions.write();
        let live = self.resident(&mut sessions, id)?;
        let mut working = live.clone();
        let out = f(&mut working)?;

        let document = working.to_document();
        self.cache.store(id, &document.to_json()?)?;
        *live = working;
        drop(sessions);

        self.publish(id, ChangeCause::Mutated, document);
        Ok(out)
    }

    fn replace(&self, id: &SessionId, session: Session, cause: ChangeCause) -> Result<SessionDocument> {
        let document = session.to_document();
        let mut sessions = self.sessions.write();
        self.cache.store(id, &document.to_json()?)?;
        sessions.insert(id.clone(), session);
        drop(sessions);

        tracing::info!(session = %id, ?cause, nodes = document.nodes.len(), "session replaced");
        self.publish(id, cause, document.clone());
        Ok(document)
    }

    fn publish(&self, id: &SessionId, cause: ChangeCause, document: SessionDocument) {
        if self.events.receiver_count() == 0 {
            return;
        }
        // Lagging or departed receivers are their own concern.
        let _ = self.events.send(CanvasEvent { session: id.clone(), cause, document: Arc::new(document) });
    }

    fn parse_remote(&self, id: &SessionId, text: &str) -> Result<Session> {
        let doc = SessionDocument::from_json(text).map_err(|e| {
            tracing::warn!(session = %id, error = %e, "remote returned a malformed document");
            Error::SyncUnavailable(format!("remote returned a malformed document: {e}"))
        })?;
        if doc.session_id != *id {
            tracing::warn!(session = %id, remote = %doc.session_id, "remote returned another session");
            return Err(Error::SyncUnavailable(format!(
                "remote returned session {} for {id}",
                doc.session_id
            )));
        }
        Session::from_document(doc).map_err(|e| Error::SyncUnavailable(e.to_string()))
    }

    fn apply_remote(&self, id: &SessionId, remote: Session) -> Result<SyncOutcome> {
        let mut sessions = self.sessions.write();
        let live = self.resident(&mut sessions, id)?;
        if remote.last_updated() <= live.last_updated() {
            return Ok(SyncOutcome::LocalRetained);
        }

        let document = remote.to_document();
        self.cache.store(id, &document.to_json()?)?;
        *live = remote;
        drop(sessions);

        self.publish(id, ChangeCause::RemoteApplied, document);
        Ok(SyncOutcome::RemoteApplied)
    }

    async fn remote_call<T>(&self, id: &SessionId, what: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.config.sync_timeout(), call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!(session = %id, call = what, error = %e, "remote call failed");
                Err(match e {
                    Error::SyncUnavailable(msg) => Error::SyncUnavailable(msg),
                    other => Error::SyncUnavailable(format!("remote {what} failed: {other}")),
                })
            }
            Err(_) => {
                tracing::warn!(session = %id, call = what, timeout_ms = self.config.sync_timeout_ms, "remote call timed out");
                Err(Error::SyncUnavailable(format!(
                    "remote {what} timed out after {} ms",
                    self.config.sync_timeout_ms
                )))
            }
        }
    }
}

/// Marks a session as syncing until dropped.
struct SyncGuard<'a> {
    set: &'a Mutex<HashSet<SessionId>>,
    id: SessionId,
}

impl<'a> SyncGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<SessionId>>, id: &SessionId) -> Result<Self> {
        if !set.lock().insert(id.clone()) {
            return Err(Error::SyncInProgress(id.clone()));
        }
        Ok(Self { set, id: id.clone() })
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.id);
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Coordinate {coord} is already occupied")]
    OccupiedCoordinate { coord: GridCoordinate },

    #[error("Unknown node: {id}")]
    UnknownNode { id: NodeId },

    #[error("Direction {direction} requires intent {expected}, got {supplied}")]
    InvalidDirectionIntent { direction: Direction, expected: Relation, supplied: Relation },

    #[error("No free neighbor around {coord}")]
    NoFreeNeighbor { coord: GridCoordinate },

    #[error("Invalid content: {0}")]
    InvalidContent(String),

    #[error("No {0} ids left in this session")]
    IdsExhausted(&'static str),

    #[error("Sync unavailable: {0}")]
    SyncUnavailable(String),

    #[error("Malformed import: {0}")]
    MalformedImport(String),

    #[error("Unknown session: {0}")]
    UnknownSession(SessionId),

    #[error("Sync already in progress for session {0}")]
    SyncInProgress(SessionId),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
