//! Exploration tiles and the walking trail.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::{GridCoordinate, NodeId, PixelPosition};

/// Opaque tile identifier, unique within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub u64);

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileStatus {
    /// Where the walker stands. Exactly one per session.
    Current,
    Explored,
    Unexplored,
}

/// Spatial exploration marker. Independent of node occupancy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    pub id: TileId,
    pub position: GridCoordinate,
    pub status: TileStatus,
    /// Nodes anchored to this cell.
    #[serde(default)]
    pub nodes: SmallVec<[NodeId; 2]>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

impl Tile {
    pub fn new(id: TileId, position: GridCoordinate, status: TileStatus, at: DateTime<Utc>) -> Self {
        Self {
            id,
            position,
            status,
            nodes: SmallVec::new(),
            updated_at: at,
        }
    }

    pub fn is_current(&self) -> bool {
        self.status == TileStatus::Current
    }

    pub(crate) fn set_status(&mut self, status: TileStatus, at: DateTime<Utc>) {
        if self.status != status {
            self.status = status;
            self.updated_at = at;
        }
    }

    pub(crate) fn anchor(&mut self, node: NodeId) {
        if !self.nodes.contains(&node) {
            self.nodes.push(node);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailKind {
    Step,
    Pause,
    Exploration,
}

/// One entry of the append-only walking history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailPoint {
    pub position: GridCoordinate,
    pub pixel: PixelPosition,
    pub at: DateTime<Utc>,
    pub kind: TrailKind,
}

/// Per-kind counts over the whole trail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrailStats {
    pub total: usize,
    pub steps: usize,
    pub pauses: usize,
    pub explorations: usize,
}

impl TrailStats {
    pub fn collect<'a>(points: impl IntoIterator<Item = &'a TrailPoint>) -> Self {
        points.into_iter().fold(Self::default(), |mut s, p| {
            s.total += 1;
            match p.kind {
                TrailKind::Step => s.steps += 1,
                TrailKind::Pause => s.pauses += 1,
                TrailKind::Exploration => s.explorations += 1,
            }
            s
        })
    }
}
