//! Edge (directed, typed relation) between two nodes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Direction, NodeId, SessionId};

/// Opaque edge identifier, unique within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub u64);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of follow-up thought the target is, relative to the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    /// Forward in time.
    Time,
    /// Higher abstraction.
    Summary,
    /// More detail.
    Detail,
    /// Opposing view.
    Contrast,
}

impl Relation {
    pub const ALL: [Relation; 4] = [Relation::Time, Relation::Summary, Relation::Detail, Relation::Contrast];

    /// The direction that produces this relation on expansion.
    pub const fn direction(self) -> Direction {
        match self {
            Relation::Time => Direction::Right,
            Relation::Summary => Direction::Up,
            Relation::Detail => Direction::Down,
            Relation::Contrast => Direction::Left,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Relation::Time => "time",
            Relation::Summary => "summary",
            Relation::Detail => "detail",
            Relation::Contrast => "contrast",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge metadata. Expansion records the compass direction it used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EdgeMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

impl EdgeMeta {
    pub fn direction(direction: Direction) -> Self {
        Self { direction: Some(direction) }
    }
}

/// A directed edge. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub session_id: SessionId,
    pub source: NodeId,
    pub target: NodeId,
    pub relation: Relation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<EdgeMeta>,
    pub created_at: DateTime<Utc>,
}

impl Edge {
    /// Direction recorded in metadata, if any.
    pub fn direction(&self) -> Option<Direction> {
        self.meta.and_then(|m| m.direction)
    }
}
