pub mod line;
pub mod segment;
pub mod terrain;
pub mod wall_vertices;

pub use line::{path_length, LineId, LogicalLine, MAX_LINE_SAMPLES};
pub use segment::{SegmentDistance, WallSegment};
pub use terrain::TerrainHeights;
pub use wall_vertices::WallVertexSet;
