//! Node on the thought grid.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::{ContentMap, GridCoordinate, Value};

/// Opaque node identifier, unique within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outgoing adjacency. Expansion gives at most four neighbors, explicit
/// edges may spill.
pub type Adjacency = SmallVec<[NodeId; 4]>;

/// One unit of content placed on a grid cell.
///
/// Nodes never move. Content and title are mutated in place; everything
/// else is fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub position: GridCoordinate,
    /// Free-form tag such as `"idea"`, `"debate"`, `"expanded"`.
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub content: ContentMap,
    /// Ids of nodes this one points to, in edge creation order.
    #[serde(default)]
    pub connected: Adjacency,
    pub created_at: DateTime<Utc>,
}

impl Node {
    pub fn new(id: NodeId, position: GridCoordinate, kind: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            position,
            kind: kind.into(),
            title: None,
            content: ContentMap::new(),
            connected: Adjacency::new(),
            created_at,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.content.get(key)
    }

    pub fn is_connected_to(&self, other: NodeId) -> bool {
        self.connected.contains(&other)
    }
}

/// Parameters for placing a node directly at a chosen coordinate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewNode {
    pub position: GridCoordinate,
    pub kind: String,
    pub title: Option<String>,
    pub content: ContentMap,
}

impl NewNode {
    pub fn new(position: impl Into<GridCoordinate>, kind: impl Into<String>) -> Self {
        Self {
            position: position.into(),
            kind: kind.into(),
            title: None,
            content: ContentMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_content(mut self, content: ContentMap) -> Self {
        self.content = content;
        self
    }
}

/// In-place update of a node: content keys are merged, title replaced if given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    pub title: Option<String>,
    pub content: ContentMap,
}

impl NodePatch {
    pub fn content(content: ContentMap) -> Self {
        Self { title: None, content }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_empty()
    }
}
