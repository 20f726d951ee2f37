//! End-to-end tests for the local durable cache.
//!
//! Every mutation lands in the cache before the call returns, so a new
//! canvas over the same directory picks up exactly where the old one
//! stopped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pretty_assertions::assert_eq;
use thought_grid::{
    Canvas, Direction, EngineConfig, Error, ExpandRequest, FileCache, LocalCache, MemoryCache,
    MemoryRemote, NewNode, Relation, ScriptedDirections, SessionId, TileStatus,
};

/// Memory cache whose writes can be switched off.
#[derive(Clone, Default)]
struct FlakyCache {
    inner: MemoryCache,
    failing: Arc<AtomicBool>,
}

impl FlakyCache {
    fn fail_writes(&self, on: bool) {
        self.failing.store(on, Ordering::SeqCst);
    }
}

impl LocalCache for FlakyCache {
    fn store(&self, session: &SessionId, document: &str) -> thought_grid::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Storage("disk full".into()));
        }
        self.inner.store(session, document)
    }

    fn fetch(&self, session: &SessionId) -> thought_grid::Result<Option<String>> {
        self.inner.fetch(session)
    }

    fn remove(&self, session: &SessionId) -> thought_grid::Result<bool> {
        self.inner.remove(session)
    }

    fn sessions(&self) -> thought_grid::Result<Vec<SessionId>> {
        self.inner.sessions()
    }
}

fn open(dir: &std::path::Path) -> Canvas<FileCache, MemoryRemote> {
    Canvas::new(EngineConfig::default(), FileCache::open(dir).unwrap(), MemoryRemote::new()).unwrap()
}

#[tokio::test]
async fn test_restart_restores_session() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionId::from("diary");

    let before = {
        let canvas = open(dir.path()).with_direction_source(ScriptedDirections::new([Direction::Down]));
        let doc = canvas.start_session(&session).unwrap();
        canvas
            .expand(&session, &ExpandRequest::new(doc.nodes[0].id, Direction::Right, Relation::Time))
            .unwrap();
        canvas.advance_and_place(&session, "idea").unwrap();
        canvas.snapshot(&session).unwrap()
    };

    let canvas = open(dir.path());
    assert_eq!(canvas.sessions().unwrap(), vec![session.clone()]);
    let restored = canvas.open_session(&session).unwrap();
    assert_eq!(restored, before);
    assert_eq!(restored.nodes.len(), 3);
    assert_eq!(canvas.current_tile(&session).unwrap().position, thought_grid::GridCoordinate::new(0, 1));

    // Reads on a cached but not yet opened session load it lazily.
    let lazy = open(dir.path());
    assert_eq!(lazy.snapshot(&session).unwrap(), before);
}

#[tokio::test]
async fn test_failed_mutation_is_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionId::from("steady");
    let canvas = open(dir.path());
    canvas.start_session(&session).unwrap();
    let cached = canvas.cache().fetch(&session).unwrap();

    let err = canvas.create_node(&session, NewNode::new((0, 0), "idea")).unwrap_err();
    assert!(matches!(err, Error::OccupiedCoordinate { .. }));
    assert_eq!(canvas.cache().fetch(&session).unwrap(), cached);
}

#[tokio::test]
async fn test_corrupt_cache_entry() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionId::from("broken");
    std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

    let canvas = open(dir.path());
    let err = canvas.open_session(&session).unwrap_err();
    assert!(matches!(err, Error::MalformedImport(_)));

    // Resetting replaces the unreadable entry.
    let doc = canvas.reset_session(&session).unwrap();
    assert_eq!(doc.tiles.len(), 1);
    assert!(canvas.open_session(&session).is_ok());
}

#[tokio::test]
async fn test_reset_clears_everything() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionId::from("wipe");
    let canvas = open(dir.path());
    let doc = canvas.start_session(&session).unwrap();
    canvas
        .expand(&session, &ExpandRequest::new(doc.nodes[0].id, Direction::Up, Relation::Summary))
        .unwrap();

    let reset = canvas.reset_session(&session).unwrap();
    assert!(reset.nodes.is_empty());
    assert!(reset.edges.is_empty());
    assert_eq!(reset.tiles.len(), 1);
    assert_eq!(reset.tiles[0].status, TileStatus::Current);

    let reopened = open(dir.path()).open_session(&session).unwrap();
    assert_eq!(reopened, reset);
}

#[tokio::test]
async fn test_unsafe_session_id_rejected_by_file_cache() {
    let dir = tempfile::tempdir().unwrap();
    let canvas = open(dir.path());
    let err = canvas.open_session(&SessionId::from("../outside")).unwrap_err();
    assert!(matches!(err, Error::Storage(_)));
}

#[tokio::test]
async fn test_failed_reset_keeps_session() {
    let canvas = Canvas::new(EngineConfig::default(), FlakyCache::default(), MemoryRemote::new()).unwrap();
    let session = SessionId::from("kept");
    let doc = canvas.start_session(&session).unwrap();
    let cached = canvas.cache().fetch(&session).unwrap();

    canvas.cache().fail_writes(true);
    let err = canvas.reset_session(&session).unwrap_err();
    assert!(matches!(err, Error::Storage(_)));

    assert_eq!(canvas.snapshot(&session).unwrap(), doc);
    assert_eq!(canvas.cache().fetch(&session).unwrap(), cached);
    assert_eq!(canvas.sessions().unwrap(), vec![session.clone()]);

    canvas.cache().fail_writes(false);
    assert!(canvas.reset_session(&session).unwrap().nodes.is_empty());
}

#[tokio::test]
async fn test_delete_session_removes_backing_store() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionId::from("gone");
    let canvas = open(dir.path());
    canvas.start_session(&session).unwrap();

    assert!(canvas.delete_session(&session).unwrap());
    assert!(!dir.path().join("gone.json").exists());
    assert!(canvas.sessions().unwrap().is_empty());
    assert!(matches!(canvas.snapshot(&session), Err(Error::UnknownSession(_))));
    assert!(!canvas.delete_session(&session).unwrap());
}
