//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::expand::ExpandSettings;
use crate::model::GridGeometry;
use crate::{Error, Result};

/// Runtime configuration for a [`Canvas`](crate::Canvas).
///
/// Every field has a default, so a partial JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Edge length of one grid cell in pixels.
    /// Default: 400.
    pub cell_size: f64,

    /// Grid units between a node and the node it expands into.
    /// Default: 1.
    pub expand_step: i32,

    /// Kind given to expansion nodes when the request names none.
    /// Default: `"expanded"`.
    pub expanded_kind: String,

    /// Kind of the origin node placed by `start_session`, and of nodes
    /// auto-placed by `advance_and_place` callers that use the default.
    /// Default: `"idea"`.
    pub origin_kind: String,

    /// How many recent trail points the presentation layer is given.
    /// Default: 20.
    pub trail_display_limit: usize,

    /// Deadline for each remote call during sync, in milliseconds.
    /// Default: 10 000.
    pub sync_timeout_ms: u64,

    /// Buffer of the change-event channel.
    /// Default: 64.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cell_size: 400.0,
            expand_step: 1,
            expanded_kind: "expanded".into(),
            origin_kind: "idea".into(),
            trail_display_limit: 20,
            sync_timeout_ms: 10_000,
            event_capacity: 64,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(text).map_err(|e| Error::Config(format!("invalid engine config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(Error::Config(format!("cellSize must be positive, got {}", self.cell_size)));
        }
        if self.expand_step <= 0 {
            return Err(Error::Config(format!("expandStep must be positive, got {}", self.expand_step)));
        }
        if self.expanded_kind.trim().is_empty() || self.origin_kind.trim().is_empty() {
            return Err(Error::Config("node kinds must not be empty".into()));
        }
        if self.sync_timeout_ms == 0 {
            return Err(Error::Config("syncTimeoutMs must be positive".into()));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("eventCapacity must be positive".into()));
        }
        Ok(())
    }

    pub fn geometry(&self) -> GridGeometry {
        GridGeometry::new(self.cell_size)
    }

    pub fn expand_settings(&self) -> ExpandSettings {
        ExpandSettings { step: self.expand_step, default_kind: self.expanded_kind.clone() }
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }
}
