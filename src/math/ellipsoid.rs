use serde::{Deserialize, Serialize};

use super::{Point3, Vector3, TOLERANCE};
use crate::error::GeometryError;

/// WGS84 semi-axes in meters.
const WGS84_RADII: Vector3 = Vector3::new(6_378_137.0, 6_378_137.0, 6_356_752.314_245_179);

/// A geodetic position: longitude and latitude in radians, height in meters
/// above the ellipsoid surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cartographic {
    pub longitude: f64,
    pub latitude: f64,
    pub height: f64,
}

impl Cartographic {
    /// Creates a position from radians.
    #[must_use]
    pub fn new(longitude: f64, latitude: f64, height: f64) -> Self {
        Self {
            longitude,
            latitude,
            height,
        }
    }

    /// Creates a position from longitude and latitude in degrees.
    #[must_use]
    pub fn from_degrees(longitude: f64, latitude: f64, height: f64) -> Self {
        Self::new(longitude.to_radians(), latitude.to_radians(), height)
    }

    /// Returns `true` if every component is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.longitude.is_finite() && self.latitude.is_finite() && self.height.is_finite()
    }
}

/// A triaxial reference ellipsoid centered at the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    radii: Vector3,
    radii_squared: Vector3,
    one_over_radii_squared: Vector3,
}

impl Ellipsoid {
    /// Creates an ellipsoid from its three semi-axes.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidParameters`] if any radius is not a
    /// positive finite number.
    pub fn new(x: f64, y: f64, z: f64) -> Result<Self, GeometryError> {
        let radii = Vector3::new(x, y, z);
        if radii.iter().any(|r| !r.is_finite() || *r <= 0.0) {
            return Err(GeometryError::InvalidParameters(format!(
                "ellipsoid radii must be positive, got ({x}, {y}, {z})"
            )));
        }
        Ok(Self::from_radii(radii))
    }

    /// The WGS84 ellipsoid.
    #[must_use]
    pub fn wgs84() -> Self {
        Self::from_radii(WGS84_RADII)
    }

    /// A sphere of radius 1.
    #[must_use]
    pub fn unit_sphere() -> Self {
        Self::from_radii(Vector3::new(1.0, 1.0, 1.0))
    }

    fn from_radii(radii: Vector3) -> Self {
        let radii_squared = radii.component_mul(&radii);
        Self {
            radii,
            radii_squared,
            one_over_radii_squared: radii_squared.map(|r| 1.0 / r),
        }
    }

    /// Returns the largest semi-axis.
    #[must_use]
    pub fn maximum_radius(&self) -> f64 {
        self.radii.max()
    }

    /// Returns the unit surface normal at the given geodetic position.
    #[must_use]
    pub fn geodetic_surface_normal_cartographic(position: &Cartographic) -> Vector3 {
        let cos_lat = position.latitude.cos();
        Vector3::new(
            cos_lat * position.longitude.cos(),
            cos_lat * position.longitude.sin(),
            position.latitude.sin(),
        )
        .normalize()
    }

    /// Returns the unit surface normal of the ellipsoid at `point`, or `None`
    /// for the origin.
    #[must_use]
    pub fn geodetic_surface_normal(&self, point: &Point3) -> Option<Vector3> {
        point
            .coords
            .component_mul(&self.one_over_radii_squared)
            .try_normalize(TOLERANCE)
    }

    /// Converts a geodetic position to earth-fixed cartesian coordinates.
    #[must_use]
    pub fn cartographic_to_cartesian(&self, position: &Cartographic) -> Point3 {
        let n = Self::geodetic_surface_normal_cartographic(position);
        let k = self.radii_squared.component_mul(&n);
        let gamma = n.dot(&k).sqrt();
        Point3::from(k / gamma + n * position.height)
    }

    /// Scales `point` along the geocentric ray so that it lies on the surface.
    ///
    /// Returns `None` for the origin, which has no such ray.
    #[must_use]
    pub fn scale_to_geocentric_surface(&self, point: &Point3) -> Option<Point3> {
        let scaled = point
            .coords
            .component_mul(&point.coords)
            .dot(&self.one_over_radii_squared);
        if scaled < TOLERANCE {
            return None;
        }
        Some(Point3::from(point.coords / scaled.sqrt()))
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::wgs84()
    }
}
