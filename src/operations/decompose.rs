use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::attribute::{AttributeValue, ComponentDatatype, InstanceAttribute, DISTANCE, WIDTH};
use crate::batch::{AttributeDefinition, IndexRange, InstanceRangeIndex};
use crate::error::{BatchError, DrapeError, GeometryError, Result};
use crate::geometry::wall_vertices::STRIDE;
use crate::geometry::{
    path_length, LineId, LogicalLine, SegmentDistance, TerrainHeights, WallSegment, WallVertexSet,
};

/// Default subdivision granularity: one degree of arc.
pub const DEFAULT_GRANULARITY: f64 = std::f64::consts::PI / 180.0;

/// Parameters controlling decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecomposeOptions {
    /// Largest angle, in radians, a single wall segment may subtend.
    pub granularity: f64,
    /// Drop the source lines once they have been decomposed.
    pub release_geometry: bool,
}

impl DecomposeOptions {
    /// Checks that the granularity is a positive finite angle.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidParameters`] otherwise.
    pub fn validate(&self) -> std::result::Result<(), GeometryError> {
        if !self.granularity.is_finite() || self.granularity <= 0.0 {
            return Err(GeometryError::InvalidParameters(format!(
                "granularity must be positive, got {}",
                self.granularity
            )));
        }
        Ok(())
    }
}

impl Default for DecomposeOptions {
    fn default() -> Self {
        Self {
            granularity: DEFAULT_GRANULARITY,
            release_geometry: false,
        }
    }
}

/// Splits one logical line into wall segments.
#[derive(Debug)]
pub struct DecomposeWall<'a> {
    line: &'a LogicalLine,
    terrain: TerrainHeights,
    granularity: f64,
}

impl<'a> DecomposeWall<'a> {
    /// Creates a decomposition of `line` spanning `terrain`.
    #[must_use]
    pub fn new(line: &'a LogicalLine, terrain: TerrainHeights) -> Self {
        Self {
            line,
            terrain,
            granularity: DEFAULT_GRANULARITY,
        }
    }

    /// Overrides the subdivision granularity.
    #[must_use]
    pub fn with_granularity(mut self, granularity: f64) -> Self {
        self.granularity = granularity;
        self
    }

    /// Appends the line's segments to `output` and returns their index range.
    ///
    /// Segment lengths are chords between consecutive surface samples, so
    /// they sum to the line's [`path_length`].
    ///
    /// Returns `Ok(None)` when the line collapses to fewer than two distinct
    /// samples; nothing is appended in that case.
    ///
    /// # Errors
    ///
    /// Returns a [`GeometryError`] if the line, the terrain bounds or the
    /// granularity is invalid. `output` is left untouched on error.
    pub fn execute(&self, output: &mut Vec<WallSegment>) -> Result<Option<IndexRange>> {
        self.terrain.validate()?;
        DecomposeOptions {
            granularity: self.granularity,
            release_geometry: false,
        }
        .validate()?;

        let samples = self.line.surface_samples(self.granularity)?;
        let total = path_length(&samples);
        let vertices = WallVertexSet::new(&samples, self.line.ellipsoid(), &self.terrain)?;

        let width = InstanceAttribute::read_only(
            ComponentDatatype::Float,
            false,
            AttributeValue::Scalar(self.line.width()),
        );

        let start_index = output.len();
        let mut running = 0.0;
        // The last triple only closes the final segment.
        for i in (0..vertices.len().saturating_sub(STRIDE)).step_by(STRIDE) {
            let j = i + STRIDE;
            let length = (vertices.surface(j) - vertices.surface(i)).norm();
            let distance = SegmentDistance {
                start: running,
                length,
                total,
            };
            running += length;

            let mut attributes: BTreeMap<String, InstanceAttribute> = self.line.attributes().clone();
            let _ = attributes.insert(WIDTH.to_owned(), width);
            let _ = attributes.insert(DISTANCE.to_owned(), distance_attribute(&distance));

            output.push(WallSegment {
                id: self.line.id().clone(),
                positions: [
                    vertices.bottom(i),
                    vertices.bottom(j),
                    vertices.top(j),
                    vertices.top(i),
                ],
                right_normals: [vertices.right_normal(i), vertices.right_normal(j)],
                distance,
                attributes,
            });
        }

        if output.len() == start_index {
            debug!(id = %self.line.id(), "line produced no segments");
            return Ok(None);
        }

        let range = IndexRange::new(start_index, output.len() - 1)?;
        debug!(
            id = %self.line.id(),
            segments = range.len(),
            length = total,
            "decomposed line"
        );
        Ok(Some(range))
    }
}

fn distance_attribute(distance: &SegmentDistance) -> InstanceAttribute {
    InstanceAttribute::read_only(
        ComponentDatatype::Float,
        false,
        AttributeValue::from([distance.start, distance.length, distance.total]),
    )
}

/// Segments and ranges produced by decomposing a set of lines.
#[derive(Debug, Default)]
pub struct Decomposition {
    /// Segments of every line, concatenated in line order.
    pub segments: Vec<WallSegment>,
    pub ranges: InstanceRangeIndex,
    /// Lines that were skipped and why.
    pub skipped: Vec<(LineId, DrapeError)>,
}

/// Decomposes many lines into one flattened segment sequence.
///
/// A line that fails is skipped; its siblings still decompose. Every kept
/// line shares the attribute layout of the first kept line, so the segments
/// always fit one batch.
#[derive(Debug)]
pub struct DecomposeAll {
    terrain: TerrainHeights,
    options: DecomposeOptions,
}

impl DecomposeAll {
    #[must_use]
    pub fn new(terrain: TerrainHeights, options: DecomposeOptions) -> Self {
        Self { terrain, options }
    }

    /// Decomposes `lines` in order.
    ///
    /// # Errors
    ///
    /// Returns an error only for invalid terrain bounds or options; per-line
    /// failures are collected in [`Decomposition::skipped`].
    pub fn execute<'a, I>(&self, lines: I) -> Result<Decomposition>
    where
        I: IntoIterator<Item = &'a LogicalLine>,
    {
        self.terrain.validate()?;
        self.options.validate()?;

        let mut result = Decomposition::default();
        let mut layout: Option<Vec<AttributeDefinition>> = None;
        for line in lines {
            let id = line.id();
            if result.ranges.lookup(id.as_str()).is_some() {
                let err: DrapeError = BatchError::DuplicateIdentifier(id.to_string()).into();
                warn!(id = %id, "skipping line: {err}");
                result.skipped.push((id.clone(), err));
                continue;
            }

            let start = result.segments.len();
            let outcome = DecomposeWall::new(line, self.terrain)
                .with_granularity(self.options.granularity)
                .execute(&mut result.segments)
                .and_then(|range| -> Result<()> {
                    let Some(range) = range else {
                        return Ok(());
                    };
                    let line_layout = AttributeDefinition::layout_of(&result.segments[range.first()]);
                    if layout.as_ref().is_some_and(|expected| *expected != line_layout) {
                        return Err(BatchError::InconsistentAttributes(format!(
                            "line {id} declares a different attribute layout from earlier lines"
                        ))
                        .into());
                    }
                    let _ = result.ranges.register(id.clone(), range.first(), range.last())?;
                    let _ = layout.get_or_insert(line_layout);
                    Ok(())
                });

            if let Err(err) = outcome {
                result.segments.truncate(start);
                warn!(id = %id, "skipping line: {err}");
                result.skipped.push((id.clone(), err));
            }
        }

        debug!(
            lines = result.ranges.len(),
            segments = result.segments.len(),
            skipped = result.skipped.len(),
            "decomposed lines"
        );
        Ok(result)
    }
}
