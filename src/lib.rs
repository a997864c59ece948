//! Terrain-draped polyline walls.
//!
//! A [`LogicalLine`] draped on terrain is decomposed into short vertical
//! [`WallSegment`]s that are batched together. Each line keeps a contiguous
//! range of segments in the batch, and [`InstanceAttributes`] presents that
//! range as a single instance whose attributes can be read and written.

pub mod attribute;
pub mod batch;
pub mod error;
pub mod geometry;
pub mod math;
pub mod operations;
pub mod primitive;

pub use attribute::{AttributeValue, ComponentDatatype, InstanceAttribute};
pub use batch::{BatchTable, IndexRange, InstanceRangeIndex};
pub use error::{DrapeError, Result};
pub use geometry::{LineId, LogicalLine, TerrainHeights, WallSegment};
pub use operations::{DecomposeAll, DecomposeOptions, DecomposeWall};
pub use primitive::{DrapedWallPrimitive, InstanceAttributes, LineKey};
