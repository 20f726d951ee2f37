//! # Directional Expansion
//!
//! The only way to grow the graph outward from an existing node.
//!
//! Expansion has no state of its own: the graph snapshot *is* the state.
//! [`plan`] is a pure function over a `&GraphStore` that either rejects the
//! request or returns an [`ExpansionPlan`]; [`execute`] applies a plan.
//! Callers hold `&mut GraphStore` across both, so nothing can occupy the
//! target cell in between.
//!
//! ```text
//! ExpandRequest ──plan(&graph)──▶ ExpansionPlan ──execute(&mut graph)──▶ Expansion { node, edge }
//!                    │
//!                    ├─ UnknownNode            base id absent
//!                    ├─ InvalidDirectionIntent direction ↛ intent
//!                    └─ OccupiedCoordinate     target cell taken
//! ```
//!
//! Direction → relation table (hard rule, no defaults):
//!
//! | direction | relation | meaning |
//! |-----------|----------|---------|
//! | right | time | forward in time |
//! | up | summary | higher abstraction |
//! | down | detail | more detail |
//! | left | contrast | opposing view |

use chrono::{DateTime, Utc};

use crate::graph::GraphStore;
use crate::model::*;
use crate::{Error, Result};

/// Knobs that shape every expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandSettings {
    /// Grid units between a base node and its expansion.
    pub step: i32,
    /// Kind given to new nodes when the request names none.
    pub default_kind: String,
}

impl Default for ExpandSettings {
    fn default() -> Self {
        Self { step: 1, default_kind: "expanded".into() }
    }
}

/// Request to grow the graph from `base` towards `direction`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandRequest {
    pub base: NodeId,
    pub direction: Direction,
    pub intent: Relation,
    pub kind: Option<String>,
    pub title: Option<String>,
    pub content: ContentMap,
}

impl ExpandRequest {
    pub fn new(base: NodeId, direction: Direction, intent: Relation) -> Self {
        Self { base, direction, intent, kind: None, title: None, content: ContentMap::new() }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
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

/// A validated expansion, ready to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionPlan {
    pub base: NodeId,
    pub direction: Direction,
    pub relation: Relation,
    pub node: NewNode,
}

impl ExpansionPlan {
    pub fn position(&self) -> GridCoordinate {
        self.node.position
    }
}

/// The entities created by one expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub node: Node,
    pub edge: Edge,
}

/// Check the direction → intent table.
pub fn validate_intent(direction: Direction, intent: Relation) -> Result<()> {
    let expected = direction.relation();
    if expected == intent {
        Ok(())
    } else {
        Err(Error::InvalidDirectionIntent { direction, expected, supplied: intent })
    }
}

/// Validate `req` against the current graph and compute what it would create.
pub fn plan(graph: &GraphStore, req: &ExpandRequest, settings: &ExpandSettings) -> Result<ExpansionPlan> {
    let base = graph.require_node(req.base)?;
    validate_intent(req.direction, req.intent)?;

    let position = base.position.offset(req.direction, settings.step);
    if graph.is_occupied(position) {
        return Err(Error::OccupiedCoordinate { coord: position });
    }

    let kind = req.kind.clone().unwrap_or_else(|| settings.default_kind.clone());
    let title = req.title.clone().or_else(|| Some(format!("Expanded {}", req.direction)));

    Ok(ExpansionPlan {
        base: req.base,
        direction: req.direction,
        relation: req.intent,
        node: NewNode { position, kind, title, content: req.content.clone() },
    })
}

/// Apply a plan produced by [`plan`] against the same graph state.
pub fn execute(graph: &mut GraphStore, plan: ExpansionPlan, at: DateTime<Utc>) -> Result<Expansion> {
    let node = graph.create_node(plan.node, at)?;
    let edge = graph.create_edge(
        plan.base,
        node.id,
        plan.relation,
        Some(EdgeMeta::direction(plan.direction)),
        at,
    )?;
    tracing::debug!(
        session = %graph.session_id(),
        base = %plan.base,
        direction = %plan.direction,
        node = %node.id,
        "expanded"
    );
    Ok(Expansion { node, edge })
}

/// Plan and execute in one step.
pub fn expand(
    graph: &mut GraphStore,
    req: &ExpandRequest,
    settings: &ExpandSettings,
    at: DateTime<Utc>,
) -> Result<Expansion> {
    let plan = plan(graph, req, settings)?;
    execute(graph, plan, at)
}

/// Directions in which `node` can currently expand.
pub fn available_directions(graph: &GraphStore, node: NodeId, settings: &ExpandSettings) -> Result<Vec<Direction>> {
    let base = graph.require_node(node)?;
    Ok(Direction::ALL
        .into_iter()
        .filter(|d| !graph.is_occupied(base.position.offset(*d, settings.step)))
        .collect())
}

// ============================================================================
// Tests
// ============================================================================
