//! End-to-end tests for tile exploration and the trail.
//!
//! Direction choice is scripted so every walk is reproducible.

use proptest::prelude::*;
use thought_grid::{
    Canvas, Direction, Error, GridCoordinate, MemoryCache, MemoryRemote, PixelPosition,
    RandomDirections, ScriptedDirections, SessionId, TileStatus, TrailKind,
};

fn scripted(script: impl IntoIterator<Item = Direction>) -> (Canvas<MemoryCache, MemoryRemote>, SessionId) {
    let canvas = Canvas::open_memory(MemoryRemote::new())
        .unwrap()
        .with_direction_source(ScriptedDirections::new(script));
    let session = SessionId::from("walk");
    canvas.open_session(&session).unwrap();
    (canvas, session)
}

fn current_count(canvas: &Canvas<MemoryCache, MemoryRemote>, session: &SessionId) -> usize {
    canvas
        .snapshot(session)
        .unwrap()
        .tiles
        .iter()
        .filter(|t| t.status == TileStatus::Current)
        .count()
}

// ============================================================================
// 1. Fresh session: only the CURRENT origin tile
// ============================================================================

#[tokio::test]
async fn test_open_session_bootstrap() {
    let (canvas, session) = scripted([]);
    let doc = canvas.snapshot(&session).unwrap();

    assert!(doc.nodes.is_empty());
    assert_eq!(doc.tiles.len(), 1);
    assert_eq!(doc.tiles[0].position, GridCoordinate::ORIGIN);
    assert_eq!(doc.tiles[0].status, TileStatus::Current);
    assert_eq!(doc.character_position, PixelPosition::new(0.0, 0.0));
}

// ============================================================================
// 2. One advance: origin EXPLORED, one new CURRENT neighbor
// ============================================================================

#[tokio::test]
async fn test_advance_once() {
    let (canvas, session) = scripted([Direction::Left]);

    let step = canvas.advance(&session).unwrap();
    assert_eq!(step.tile.position, GridCoordinate::new(-1, 0));
    assert_eq!(step.position, PixelPosition::new(-400.0, 0.0));

    let doc = canvas.snapshot(&session).unwrap();
    assert_eq!(doc.tiles.len(), 2);
    assert_eq!(
        canvas.tile_at(&session, GridCoordinate::ORIGIN).unwrap().unwrap().status,
        TileStatus::Explored
    );
    assert_eq!(canvas.current_tile(&session).unwrap().position, GridCoordinate::new(-1, 0));
    assert_eq!(doc.character_position, PixelPosition::new(-400.0, 0.0));
    assert_eq!(current_count(&canvas, &session), 1);
}

// ============================================================================
// 3. Boxed in: NoFreeNeighbor and nothing changes
// ============================================================================

#[tokio::test]
async fn test_boxed_in_walk() {
    use Direction::*;
    // Ends on (0, 1) with (0,0), (1,1), (-1,1) and (0,2) all visited.
    let (canvas, session) = scripted([Right, Down, Down, Left, Left, Up, Right]);
    for _ in 0..7 {
        canvas.advance(&session).unwrap();
    }
    assert_eq!(canvas.current_tile(&session).unwrap().position, GridCoordinate::new(0, 1));

    let before = canvas.snapshot(&session).unwrap();
    let err = canvas.advance(&session).unwrap_err();
    assert!(matches!(err, Error::NoFreeNeighbor { coord } if coord == GridCoordinate::new(0, 1)));
    assert_eq!(canvas.snapshot(&session).unwrap(), before);
}

// ============================================================================
// 4. Advance-and-place anchors an idea node on the new tile
// ============================================================================

#[tokio::test]
async fn test_advance_and_place() {
    let (canvas, session) = scripted([Direction::Up, Direction::Up]);

    let (step, node) = canvas.advance_and_place(&session, "idea").unwrap();
    let node = node.unwrap();
    assert_eq!(node.position, GridCoordinate::new(0, -1));
    assert_eq!(node.kind, "idea");
    assert_eq!(step.tile.nodes.len(), 0);
    assert_eq!(canvas.current_tile(&session).unwrap().nodes.as_slice(), &[node.id]);

    // A node already sitting on the next cell is kept and anchored.
    let existing = canvas
        .create_node(&session, thought_grid::NewNode::new((0, -2), "reflection"))
        .unwrap();
    let (step, placed) = canvas.advance_and_place(&session, "idea").unwrap();
    assert!(placed.is_none());
    assert_eq!(step.tile.nodes.as_slice(), &[existing.id]);
    assert_eq!(canvas.snapshot(&session).unwrap().nodes.len(), 2);
}

// ============================================================================
// 5. Trail: bounded view, full history kept
// ============================================================================

#[tokio::test]
async fn test_trail_display_window() {
    let (canvas, session) = scripted([Direction::Right]);
    canvas.advance(&session).unwrap();
    for i in 0..24 {
        let kind = if i % 3 == 0 { TrailKind::Pause } else { TrailKind::Step };
        canvas.record_trail(&session, kind).unwrap();
    }

    let visible = canvas.visible_trail(&session).unwrap();
    assert_eq!(visible.len(), 20);
    assert!(visible.iter().all(|p| p.position == GridCoordinate::new(1, 0)));

    let stats = canvas.trail_stats(&session).unwrap();
    assert_eq!(stats.total, 25);
    assert_eq!(stats.explorations, 1);
    assert_eq!(stats.pauses, 8);
    assert_eq!(stats.steps, 16);
    assert_eq!(canvas.snapshot(&session).unwrap().trail.len(), 25);
}

// ============================================================================
// 6. Seeded randomness is reproducible
// ============================================================================

#[tokio::test]
async fn test_seeded_walks_match() {
    let walk = |seed| {
        let canvas = Canvas::open_memory(MemoryRemote::new())
            .unwrap()
            .with_direction_source(RandomDirections::seeded(seed));
        let session = SessionId::from("r");
        canvas.open_session(&session).unwrap();
        (0..6).map(|_| canvas.advance(&session).unwrap().tile.position).collect::<Vec<_>>()
    };
    assert_eq!(walk(11), walk(11));
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Whatever the walk, exactly one tile is CURRENT and it sits under the walker.
    #[test]
    fn prop_single_current(seed in any::<u64>(), steps in 1usize..30) {
        let canvas = Canvas::open_memory(MemoryRemote::new())
            .unwrap()
            .with_direction_source(RandomDirections::seeded(seed));
        let session = SessionId::from("p");
        canvas.open_session(&session).unwrap();

        for _ in 0..steps {
            let _ = canvas.advance(&session);
            prop_assert_eq!(current_count(&canvas, &session), 1);
        }

        let doc = canvas.snapshot(&session).unwrap();
        let current = canvas.current_tile(&session).unwrap();
        prop_assert_eq!(canvas.geometry().to_pixel(current.position), doc.character_position);
    }
}
