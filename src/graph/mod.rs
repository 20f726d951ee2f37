//! # Graph Store
//!
//! The canonical node/edge collection of one session.
//!
//! Nodes and edges live in creation order (that order is what gets
//! persisted); hash indexes sit beside them for id lookup and cell
//! occupancy. Every mutating call validates first and mutates second, so
//! a returned error means nothing changed.
//!
//! The store does not own a clock. Callers pass the timestamp to stamp
//! onto created entities; the owning [`Session`](crate::session::Session)
//! uses the same instant for its last-updated marker.

use chrono::{DateTime, Utc};
use hashbrown::{HashMap, HashSet};

use crate::model::*;
use crate::{Error, Result};

/// Nodes and edges of a single session.
#[derive(Debug, Clone)]
pub struct GraphStore {
    session: SessionId,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    /// node id → position in `nodes`
    node_index: HashMap<NodeId, usize>,
    /// cell → occupying node
    occupancy: HashMap<GridCoordinate, NodeId>,
    next_node_id: u64,
    next_edge_id: u64,
}

impl GraphStore {
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            nodes: Vec::new(),
            edges: Vec::new(),
            node_index: HashMap::new(),
            occupancy: HashMap::new(),
            next_node_id: 1,
            next_edge_id: 1,
        }
    }

    /// Rebuild a store from persisted collections, checking every
    /// structural invariant. Violations are reported as `MalformedImport`.
    pub fn from_parts(session: SessionId, nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self> {
        let mut node_index = HashMap::with_capacity(nodes.len());
        let mut occupancy = HashMap::with_capacity(nodes.len());

        for (i, node) in nodes.iter().enumerate() {
            if node_index.insert(node.id, i).is_some() {
                return Err(malformed(format!("duplicate node id {}", node.id)));
            }
            if let Some(other) = occupancy.insert(node.position, node.id) {
                return Err(malformed(format!(
                    "nodes {other} and {} share coordinate {}",
                    node.id, node.position
                )));
            }
        }
        for node in &nodes {
            if let Some(missing) = node.connected.iter().find(|id| !node_index.contains_key(*id)) {
                return Err(malformed(format!("node {} is connected to unknown node {missing}", node.id)));
            }
        }

        let mut edge_ids = HashSet::with_capacity(edges.len());
        for edge in &edges {
            if !edge_ids.insert(edge.id) {
                return Err(malformed(format!("duplicate edge id {}", edge.id)));
            }
            if edge.session_id != session {
                return Err(malformed(format!(
                    "edge {} belongs to session {}, not {session}",
                    edge.id, edge.session_id
                )));
            }
            for end in [edge.source, edge.target] {
                if !node_index.contains_key(&end) {
                    return Err(malformed(format!("edge {} references unknown node {end}", edge.id)));
                }
            }
            if let Some(direction) = edge.direction() {
                if direction.relation() != edge.relation {
                    return Err(malformed(format!(
                        "edge {} was produced by {direction} but carries relation {}",
                        edge.id, edge.relation
                    )));
                }
            }
        }

        let next_node_id = next_id(nodes.iter().map(|n| n.id.0), "node")?;
        let next_edge_id = next_id(edges.iter().map(|e| e.id.0), "edge")?;

        Ok(Self { session, nodes, edges, node_index, occupancy, next_node_id, next_edge_id })
    }

    pub fn into_parts(self) -> (Vec<Node>, Vec<Edge>) {
        (self.nodes, self.edges)
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.node_index.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node_index.contains_key(&id)
    }

    pub fn node_at(&self, coord: GridCoordinate) -> Option<&Node> {
        self.occupancy.get(&coord).and_then(|id| self.node(*id))
    }

    pub fn is_occupied(&self, coord: GridCoordinate) -> bool {
        self.occupancy.contains_key(&coord)
    }

    /// Like [`node`](Self::node), but absent ids are an error.
    pub fn require_node(&self, id: NodeId) -> Result<&Node> {
        self.node(id).ok_or(Error::UnknownNode { id })
    }

    /// Nodes reachable by one outgoing edge, in adjacency order.
    pub fn neighbors(&self, id: NodeId) -> Result<Vec<&Node>> {
        let node = self.require_node(id)?;
        Ok(node.connected.iter().filter_map(|n| self.node(*n)).collect())
    }

    /// Nodes with an edge pointing at `id`. Derived from the edge list.
    pub fn incoming(&self, id: NodeId) -> Result<Vec<&Node>> {
        self.require_node(id)?;
        let mut seen = HashSet::new();
        Ok(self.edges.iter()
            .filter(|e| e.target == id && seen.insert(e.source))
            .filter_map(|e| self.node(e.source))
            .collect())
    }

    /// Outgoing edges of `id`, optionally restricted to one relation.
    pub fn edges_from(&self, id: NodeId, relation: Option<Relation>) -> Vec<&Edge> {
        self.edges.iter()
            .filter(|e| e.source == id)
            .filter(|e| relation.map_or(true, |r| e.relation == r))
            .collect()
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Place a node at an explicitly empty coordinate.
    pub fn create_node(&mut self, new: NewNode, at: DateTime<Utc>) -> Result<Node> {
        if self.is_occupied(new.position) {
            return Err(Error::OccupiedCoordinate { coord: new.position });
        }
        check_content(&new.content)?;
        let following = self.next_node_id.checked_add(1).ok_or(Error::IdsExhausted("node"))?;

        let id = NodeId(self.next_node_id);
        self.next_node_id = following;

        let node = Node {
            id,
            position: new.position,
            kind: new.kind,
            title: new.title,
            content: new.content,
            connected: Adjacency::new(),
            created_at: at,
        };

        self.occupancy.insert(node.position, id);
        self.node_index.insert(id, self.nodes.len());
        self.nodes.push(node.clone());

        tracing::debug!(session = %self.session, node = %id, coord = %node.position, kind = %node.kind, "node created");
        Ok(node)
    }

    /// Create a directed edge between two existing nodes.
    ///
    /// If `meta` names a direction, the relation must be the one that
    /// direction produces.
    pub fn create_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        relation: Relation,
        meta: Option<EdgeMeta>,
        at: DateTime<Utc>,
    ) -> Result<Edge> {
        self.require_node(source)?;
        self.require_node(target)?;
        if let Some(direction) = meta.and_then(|m| m.direction) {
            let expected = direction.relation();
            if expected != relation {
                return Err(Error::InvalidDirectionIntent { direction, expected, supplied: relation });
            }
        }
        let following = self.next_edge_id.checked_add(1).ok_or(Error::IdsExhausted("edge"))?;

        let id = EdgeId(self.next_edge_id);
        self.next_edge_id = following;

        let edge = Edge {
            id,
            session_id: self.session.clone(),
            source,
            target,
            relation,
            meta,
            created_at: at,
        };
        self.edges.push(edge.clone());

        let i = self.node_index[&source];
        let src = &mut self.nodes[i];
        if !src.connected.contains(&target) {
            src.connected.push(target);
        }

        tracing::debug!(session = %self.session, edge = %id, %source, %target, %relation, "edge created");
        Ok(edge)
    }

    /// Merge `patch` into a node's content (and title, if given).
    pub fn update_node_content(&mut self, id: NodeId, patch: NodePatch) -> Result<Node> {
        let &i = self.node_index.get(&id).ok_or(Error::UnknownNode { id })?;
        check_content(&patch.content)?;
        let node = &mut self.nodes[i];
        if let Some(title) = patch.title {
            node.title = Some(title);
        }
        merge_content(&mut node.content, patch.content);
        Ok(node.clone())
    }
}

fn malformed(msg: String) -> Error {
    Error::MalformedImport(msg)
}

/// The id after the largest of `ids`; a persisted id at `u64::MAX` leaves
/// no room and is rejected.
fn next_id(ids: impl Iterator<Item = u64>, what: &str) -> Result<u64> {
    ids.max()
        .unwrap_or(0)
        .checked_add(1)
        .ok_or_else(|| malformed(format!("{what} id {} leaves no room for new ids", u64::MAX)))
}

// ============================================================================
// Tests
// ============================================================================
