use std::collections::BTreeMap;

use crate::attribute::InstanceAttribute;
use crate::math::{Point3, Vector3};

use super::line::LineId;

/// Distance metrics used for dash and arrow shading along a line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentDistance {
    /// Distance from the start of the line to the start of this segment.
    pub start: f64,
    /// Length of this segment.
    pub length: f64,
    /// Length of the whole line.
    pub total: f64,
}

impl SegmentDistance {
    /// Distance from the start of the line to the end of this segment.
    #[must_use]
    pub fn end(&self) -> f64 {
        self.start + self.length
    }
}

/// One vertical wall quad produced by decomposing a logical line.
#[derive(Debug, Clone)]
pub struct WallSegment {
    /// Logical line this segment belongs to.
    pub id: LineId,
    /// Corners in order: bottom start, bottom end, top end, top start.
    pub positions: [Point3; 4],
    /// Right-facing normals at the start and end edges.
    pub right_normals: [Vector3; 2],
    pub distance: SegmentDistance,
    /// Per-instance attributes keyed by name.
    pub attributes: BTreeMap<String, InstanceAttribute>,
}

impl WallSegment {
    /// Bottom edge as `(start, end)`.
    #[must_use]
    pub fn bottom_edge(&self) -> (Point3, Point3) {
        (self.positions[0], self.positions[1])
    }

    /// Top edge as `(start, end)`.
    #[must_use]
    pub fn top_edge(&self) -> (Point3, Point3) {
        (self.positions[3], self.positions[2])
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&InstanceAttribute> {
        self.attributes.get(name)
    }
}
