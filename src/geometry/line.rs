use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use crate::attribute::{InstanceAttribute, COLOR, DISTANCE, SHOW, WIDTH};
use crate::error::GeometryError;
use crate::math::{Cartographic, Ellipsoid, Point3, TOLERANCE};

/// Upper bound on the surface samples of one line after subdivision.
pub const MAX_LINE_SAMPLES: usize = 1 << 20;

/// Client-supplied identifier of a logical line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineId(String);

impl LineId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for LineId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LineId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for LineId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A polyline draped on terrain, addressed by its [`LineId`].
///
/// Positions are geodetic; their heights are ignored because the wall built
/// from the line spans the terrain height bounds instead.
#[derive(Debug, Clone)]
pub struct LogicalLine {
    id: LineId,
    positions: Vec<Cartographic>,
    width: f64,
    ellipsoid: Ellipsoid,
    attributes: BTreeMap<String, InstanceAttribute>,
}

impl LogicalLine {
    /// Creates a line on the WGS84 ellipsoid.
    #[must_use]
    pub fn new(id: impl Into<LineId>, positions: Vec<Cartographic>, width: f64) -> Self {
        Self {
            id: id.into(),
            positions,
            width,
            ellipsoid: Ellipsoid::wgs84(),
            attributes: BTreeMap::new(),
        }
    }

    /// Replaces the reference ellipsoid.
    #[must_use]
    pub fn with_ellipsoid(mut self, ellipsoid: Ellipsoid) -> Self {
        self.ellipsoid = ellipsoid;
        self
    }

    /// Adds a per-instance attribute replicated onto every segment.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, attribute: InstanceAttribute) -> Self {
        let _ = self.attributes.insert(name.into(), attribute);
        self
    }

    /// Adds an RGBA [`COLOR`] attribute.
    #[must_use]
    pub fn with_color(self, rgba: [u8; 4]) -> Self {
        self.with_attribute(COLOR, InstanceAttribute::color(rgba))
    }

    /// Adds a [`SHOW`] visibility attribute.
    #[must_use]
    pub fn with_show(self, visible: bool) -> Self {
        self.with_attribute(SHOW, InstanceAttribute::show(visible))
    }

    #[must_use]
    pub fn id(&self) -> &LineId {
        &self.id
    }

    #[must_use]
    pub fn positions(&self) -> &[Cartographic] {
        &self.positions
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[must_use]
    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, InstanceAttribute> {
        &self.attributes
    }

    /// Checks that the line can be decomposed.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidInputGeometry`] if the line has fewer
    /// than 2 positions, a non-finite position, a non-positive width, or an
    /// attribute that shadows one produced by decomposition.
    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.positions.len() < 2 {
            return Err(GeometryError::InvalidInputGeometry(format!(
                "line {} needs at least 2 positions, got {}",
                self.id,
                self.positions.len()
            )));
        }
        if !self.width.is_finite() || self.width <= 0.0 {
            return Err(GeometryError::InvalidInputGeometry(format!(
                "line {} has non-positive width {}",
                self.id, self.width
            )));
        }
        if self.positions.iter().any(|p| !p.is_finite()) {
            return Err(GeometryError::InvalidInputGeometry(format!(
                "line {} has a non-finite position",
                self.id
            )));
        }
        if let Some(name) = [WIDTH, DISTANCE]
            .into_iter()
            .find(|name| self.attributes.contains_key(*name))
        {
            return Err(GeometryError::InvalidInputGeometry(format!(
                "line {} overrides the derived attribute {name}",
                self.id
            )));
        }
        Ok(())
    }

    /// Samples the path on the ellipsoid surface.
    ///
    /// Consecutive duplicate positions are dropped and every leg is split so
    /// that no piece subtends more than `granularity` radians. Subdivision
    /// points are projected back onto the surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the line fails [`Self::validate`] or a leg joins
    /// antipodal points, and [`GeometryError::InvalidParameters`] if
    /// `granularity` would produce more than [`MAX_LINE_SAMPLES`] samples.
    pub fn surface_samples(&self, granularity: f64) -> Result<Vec<Point3>, GeometryError> {
        self.validate()?;

        let mut distinct: Vec<Point3> = Vec::with_capacity(self.positions.len());
        for position in &self.positions {
            let surface = Cartographic::new(position.longitude, position.latitude, 0.0);
            let point = self.ellipsoid.cartographic_to_cartesian(&surface);
            if distinct
                .last()
                .is_none_or(|last| (point - *last).norm() > TOLERANCE)
            {
                distinct.push(point);
            }
        }

        let max_chord = granularity * self.ellipsoid.maximum_radius();
        let pieces: Vec<u32> = distinct
            .windows(2)
            .map(|pair| subdivision_count((pair[1] - pair[0]).norm(), max_chord))
            .collect();
        let count = pieces
            .iter()
            .map(|p| usize::try_from(*p).unwrap_or(usize::MAX))
            .fold(1_usize, usize::saturating_add);
        if count > MAX_LINE_SAMPLES {
            return Err(GeometryError::InvalidParameters(format!(
                "line {} needs {count} samples at granularity {granularity}, limit is {MAX_LINE_SAMPLES}",
                self.id
            )));
        }

        let mut samples = Vec::with_capacity(count);
        for (pair, pieces) in distinct.windows(2).zip(pieces) {
            let (a, b) = (pair[0], pair[1]);
            samples.push(a);

            for j in 1..pieces {
                let t = f64::from(j) / f64::from(pieces);
                let chord_point = a + (b - a) * t;
                let projected = self
                    .ellipsoid
                    .scale_to_geocentric_surface(&chord_point)
                    .ok_or_else(|| {
                        GeometryError::Degenerate(format!(
                            "line {} has a leg between antipodal points",
                            self.id
                        ))
                    })?;
                samples.push(projected);
            }
        }
        if let Some(last) = distinct.last() {
            samples.push(*last);
        }

        Ok(samples)
    }

    /// Returns the length of the sampled path on the ellipsoid surface.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Self::surface_samples`].
    pub fn length_on_ellipsoid(&self, granularity: f64) -> Result<f64, GeometryError> {
        Ok(path_length(&self.surface_samples(granularity)?))
    }
}

/// Sums the chord lengths of consecutive points.
#[must_use]
pub fn path_length(points: &[Point3]) -> f64 {
    points
        .windows(2)
        .fold(0.0, |total, pair| total + (pair[1] - pair[0]).norm())
}

/// Number of pieces a chord of `length` is cut into so none exceeds `max_chord`.
fn subdivision_count(length: f64, max_chord: f64) -> u32 {
    if max_chord <= 0.0 || length <= max_chord {
        return 1;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let n = (length / max_chord).ceil().min(f64::from(u32::MAX)) as u32;
    n.max(1)
}
