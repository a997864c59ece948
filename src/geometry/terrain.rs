use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Conservative lower bound of terrain height in meters.
pub const DEFAULT_MINIMUM_HEIGHT: f64 = -11_000.0;

/// Conservative upper bound of terrain height in meters.
pub const DEFAULT_MAXIMUM_HEIGHT: f64 = 9_000.0;

/// Vertical extent a draped wall must cover so that it always contains the
/// terrain surface beneath its line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainHeights {
    pub minimum: f64,
    pub maximum: f64,
}

impl TerrainHeights {
    /// Creates validated height bounds.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidTerrainBounds`] if either bound is not
    /// finite or `minimum > maximum`.
    pub fn new(minimum: f64, maximum: f64) -> Result<Self, GeometryError> {
        let heights = Self { minimum, maximum };
        heights.validate()?;
        Ok(heights)
    }

    /// Checks that the bounds are finite and ordered.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidTerrainBounds`] otherwise.
    pub fn validate(&self) -> Result<(), GeometryError> {
        if !self.minimum.is_finite() || !self.maximum.is_finite() || self.minimum > self.maximum {
            return Err(GeometryError::InvalidTerrainBounds {
                minimum: self.minimum,
                maximum: self.maximum,
            });
        }
        Ok(())
    }
}

impl Default for TerrainHeights {
    fn default() -> Self {
        Self {
            minimum: DEFAULT_MINIMUM_HEIGHT,
            maximum: DEFAULT_MAXIMUM_HEIGHT,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ordered_bounds_are_valid() {
        assert!(TerrainHeights::new(-100.0, 100.0).is_ok());
        assert!(TerrainHeights::new(0.0, 0.0).is_ok());
        assert!(TerrainHeights::default().validate().is_ok());
    }

    #[test]
    fn inverted_or_nan_bounds_fail() {
        assert!(matches!(
            TerrainHeights::new(10.0, -10.0),
            Err(GeometryError::InvalidTerrainBounds { .. })
        ));
        assert!(TerrainHeights::new(f64::NAN, 1.0).is_err());
    }
}
