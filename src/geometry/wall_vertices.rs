use crate::error::GeometryError;
use crate::math::{Ellipsoid, Point3, Vector3, TOLERANCE};

use super::terrain::TerrainHeights;

/// Components per packed entry.
pub const STRIDE: usize = 3;

/// Wall vertices extruded from a sampled path, packed as `x, y, z` triples.
///
/// For every surface sample the set holds a bottom position at the minimum
/// terrain height, a top position at the maximum terrain height, and a unit
/// normal facing the line's right side. All four buffers have the same length.
#[derive(Debug, Clone, Default)]
pub struct WallVertexSet {
    surface: Vec<f64>,
    bottom: Vec<f64>,
    top: Vec<f64>,
    normals: Vec<f64>,
}

impl WallVertexSet {
    /// Builds the vertex set from surface samples.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Degenerate`] if a sample has no surface normal
    /// or the path runs parallel to it.
    pub fn new(
        samples: &[Point3],
        ellipsoid: &Ellipsoid,
        terrain: &TerrainHeights,
    ) -> Result<Self, GeometryError> {
        let n = samples.len();
        let mut set = Self {
            surface: Vec::with_capacity(n * STRIDE),
            bottom: Vec::with_capacity(n * STRIDE),
            top: Vec::with_capacity(n * STRIDE),
            normals: Vec::with_capacity(n * STRIDE),
        };

        for (i, sample) in samples.iter().enumerate() {
            let up = ellipsoid.geodetic_surface_normal(sample).ok_or_else(|| {
                GeometryError::Degenerate("sample at the ellipsoid center".to_owned())
            })?;

            let incoming = (i > 0).then(|| samples[i] - samples[i - 1]);
            let outgoing = (i + 1 < n).then(|| samples[i + 1] - samples[i]);
            let right = match (incoming, outgoing) {
                (None, None) => Vector3::zeros(),
                (Some(d), None) | (None, Some(d)) => right_of(d, up)?,
                (Some(a), Some(b)) => right_of(average_direction(a, b), up)?,
            };

            let bottom = *sample + up * terrain.minimum;
            let top = *sample + up * terrain.maximum;
            set.surface.extend_from_slice(sample.coords.as_slice());
            set.bottom.extend_from_slice(bottom.coords.as_slice());
            set.top.extend_from_slice(top.coords.as_slice());
            set.normals.extend_from_slice(right.as_slice());
        }

        Ok(set)
    }

    /// Returns the number of packed components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bottom.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bottom.is_empty()
    }

    /// Returns the number of wall vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.bottom.len() / STRIDE
    }

    #[must_use]
    pub fn top_positions(&self) -> &[f64] {
        &self.top
    }

    #[must_use]
    pub fn right_normals(&self) -> &[f64] {
        &self.normals
    }

    /// Bottom position of the triple starting at packed `offset`.
    #[must_use]
    pub fn bottom(&self, offset: usize) -> Point3 {
        point_at(&self.bottom, offset)
    }

    /// Top position of the triple starting at packed `offset`.
    #[must_use]
    pub fn top(&self, offset: usize) -> Point3 {
        point_at(&self.top, offset)
    }

    /// Right-facing normal of the triple starting at packed `offset`.
    #[must_use]
    pub fn right_normal(&self, offset: usize) -> Vector3 {
        point_at(&self.normals, offset).coords
    }

    /// Surface sample of the triple starting at packed `offset`.
    #[must_use]
    pub fn surface(&self, offset: usize) -> Point3 {
        point_at(&self.surface, offset)
    }
}

fn point_at(buffer: &[f64], offset: usize) -> Point3 {
    Point3::new(buffer[offset], buffer[offset + 1], buffer[offset + 2])
}

/// Unit vector pointing right of travel direction `forward` when `up` is up.
fn right_of(forward: Vector3, up: Vector3) -> Result<Vector3, GeometryError> {
    forward
        .cross(&up)
        .try_normalize(TOLERANCE)
        .ok_or_else(|| GeometryError::Degenerate("path is parallel to the surface normal".to_owned()))
}

/// Returns the normalized average of two directions.
fn average_direction(a: Vector3, b: Vector3) -> Vector3 {
    let a = a.normalize();
    let b = b.normalize();
    let avg = a + b;
    let len = avg.norm();
    if len < f64::EPSILON {
        // Path doubles back: keep the incoming direction.
        a
    } else {
        avg / len
    }
}
