//! Session — one isolated graph + tile namespace, and its persisted form.
//!
//! A [`Session`] owns a [`GraphStore`] and a [`TileMap`] plus the walker's
//! pixel position and a last-updated stamp. Every successful mutation
//! moves the stamp forward; failed ones leave the whole session untouched.
//!
//! [`SessionDocument`] is the single persisted shape. The local cache,
//! the remote actor and export files all carry exactly this document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::expand::{self, ExpandRequest, ExpandSettings, Expansion};
use crate::graph::GraphStore;
use crate::model::*;
use crate::placement::{Advance, DirectionSource, TileMap};
use crate::{Error, Result};

// ============================================================================
// SessionDocument
// ============================================================================

/// Portable snapshot of a whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDocument {
    pub session_id: SessionId,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub tiles: Vec<Tile>,
    #[serde(default)]
    pub trail: Vec<TrailPoint>,
    pub character_position: PixelPosition,
    pub last_updated: DateTime<Utc>,
}

impl SessionDocument {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Storage(format!("serialize session {}: {e}", self.session_id)))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::Storage(format!("serialize session {}: {e}", self.session_id)))
    }

    /// Parse and structurally validate a document.
    pub fn from_json(text: &str) -> Result<Self> {
        let doc: SessionDocument = serde_json::from_str(text)
            .map_err(|e| Error::MalformedImport(format!("not a session document: {e}")))?;
        doc.validate()?;
        Ok(doc)
    }

    /// Check every structural invariant without building a session.
    pub fn validate(&self) -> Result<()> {
        Session::from_document(self.clone()).map(|_| ())
    }
}

// ============================================================================
// Session
// ============================================================================

#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    graph: GraphStore,
    tiles: TileMap,
    character_position: PixelPosition,
    last_updated: DateTime<Utc>,
}

impl Session {
    /// Fresh session: only the origin tile, walker at the origin.
    pub fn new(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            graph: GraphStore::new(id.clone()),
            id,
            tiles: TileMap::with_origin(now),
            character_position: PixelPosition::default(),
            last_updated: now,
        }
    }

    /// Fresh session seeded with an origin node of `kind`, anchored to the origin tile.
    pub fn seeded(id: SessionId, kind: &str) -> Result<Self> {
        let mut session = Self::new(id);
        session.create_node(NewNode::new(GridCoordinate::ORIGIN, kind))?;
        Ok(session)
    }

    pub fn from_document(doc: SessionDocument) -> Result<Self> {
        let graph = GraphStore::from_parts(doc.session_id.clone(), doc.nodes, doc.edges)?;
        let tiles = TileMap::from_parts(doc.tiles, doc.trail)?;
        for tile in tiles.tiles() {
            if let Some(missing) = tile.nodes.iter().find(|n| !graph.contains_node(**n)) {
                return Err(Error::MalformedImport(format!(
                    "tile {} anchors unknown node {missing}",
                    tile.id
                )));
            }
        }
        Ok(Self {
            id: doc.session_id,
            graph,
            tiles,
            character_position: doc.character_position,
            last_updated: doc.last_updated,
        })
    }

    pub fn to_document(&self) -> SessionDocument {
        SessionDocument {
            session_id: self.id.clone(),
            nodes: self.graph.nodes().to_vec(),
            edges: self.graph.edges().to_vec(),
            tiles: self.tiles.tiles().to_vec(),
            trail: self.tiles.trail().to_vec(),
            character_position: self.character_position,
            last_updated: self.last_updated,
        }
    }

    pub fn into_document(self) -> SessionDocument {
        let (nodes, edges) = self.graph.into_parts();
        let (tiles, trail) = self.tiles.into_parts();
        SessionDocument {
            session_id: self.id,
            nodes,
            edges,
            tiles,
            trail,
            character_position: self.character_position,
            last_updated: self.last_updated,
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    pub fn tiles(&self) -> &TileMap {
        &self.tiles
    }

    pub fn character_position(&self) -> PixelPosition {
        self.character_position
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    pub fn create_node(&mut self, new: NewNode) -> Result<Node> {
        let at = self.next_stamp();
        let node = self.graph.create_node(new, at)?;
        self.tiles.anchor(node.position, node.id);
        self.last_updated = at;
        Ok(node)
    }

    pub fn create_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        relation: Relation,
        meta: Option<EdgeMeta>,
    ) -> Result<Edge> {
        let at = self.next_stamp();
        let edge = self.graph.create_edge(source, target, relation, meta, at)?;
        self.last_updated = at;
        Ok(edge)
    }

    pub fn update_node_content(&mut self, id: NodeId, patch: NodePatch) -> Result<Node> {
        let at = self.next_stamp();
        let node = self.graph.update_node_content(id, patch)?;
        self.last_updated = at;
        Ok(node)
    }

    pub fn expand(&mut self, req: &ExpandRequest, settings: &ExpandSettings) -> Result<Expansion> {
        let at = self.next_stamp();
        let out = expand::expand(&mut self.graph, req, settings, at)?;
        self.tiles.anchor(out.node.position, out.node.id);
        self.last_updated = at;
        Ok(out)
    }

    /// One exploration step; the walker moves onto the new tile. A node
    /// already sitting on that cell is anchored to the tile.
    pub fn advance(&mut self, source: &mut dyn DirectionSource, geometry: &GridGeometry) -> Result<Advance> {
        let at = self.next_stamp();
        let mut step = self.tiles.advance(source, geometry, at)?;
        if let Some(node) = self.graph.node_at(step.tile.position) {
            self.tiles.anchor(step.tile.position, node.id);
            step.tile = self.tiles.current().clone();
        }
        self.character_position = step.position;
        self.last_updated = at;
        Ok(step)
    }

    /// Advance, then place a node of `kind` on the new tile unless one is there.
    pub fn advance_and_place(
        &mut self,
        source: &mut dyn DirectionSource,
        geometry: &GridGeometry,
        kind: &str,
    ) -> Result<(Advance, Option<Node>)> {
        let step = self.advance(source, geometry)?;
        if self.graph.is_occupied(step.tile.position) {
            return Ok((step, None));
        }
        let node = self.create_node(NewNode::new(step.tile.position, kind))?;
        Ok((step, Some(node)))
    }

    pub fn record_trail(&mut self, kind: TrailKind, geometry: &GridGeometry) -> TrailPoint {
        let at = self.next_stamp();
        let point = self.tiles.record(kind, geometry, at);
        self.last_updated = at;
        point
    }

    /// Timestamp for the next mutation; never earlier than the current stamp.
    fn next_stamp(&self) -> DateTime<Utc> {
        Utc::now().max(self.last_updated)
    }
}
