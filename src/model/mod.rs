//! # Thought Grid Model
//!
//! Clean DTOs for the spatial thought graph: grid addressing, nodes,
//! edges, tiles and the opaque content payload.
//!
//! Plain data without I/O or locking; these types cross every boundary
//! (store ↔ cache ↔ remote ↔ API).

pub mod coord;
pub mod node;
pub mod edge;
pub mod tile;
pub mod value;
pub mod content;
pub mod session_id;

pub use coord::{Direction, GridCoordinate, GridGeometry, PixelPosition, PixelRect};
pub use node::{Adjacency, NewNode, Node, NodeId, NodePatch};
pub use edge::{Edge, EdgeId, EdgeMeta, Relation};
pub use tile::{Tile, TileId, TileStatus, TrailKind, TrailPoint, TrailStats};
pub use value::Value;
pub use content::{ContentMap, check_content, content_from_json, merge_content};
pub use session_id::SessionId;
