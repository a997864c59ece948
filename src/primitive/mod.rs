mod instance_attributes;

pub use instance_attributes::InstanceAttributes;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use slotmap::SlotMap;
use tracing::info;

use crate::batch::{BatchTable, InstanceRangeIndex};
use crate::error::{BatchError, DrapeError, GeometryError, Result};
use crate::geometry::{LineId, LogicalLine, TerrainHeights, WallSegment};
use crate::operations::{DecomposeAll, DecomposeOptions};

slotmap::new_key_type! {
    /// Handle to a logical line held by a [`DrapedWallPrimitive`].
    pub struct LineKey;
}

/// Owns a set of draped lines, their decomposed wall segments and the batch
/// those segments are stored in.
///
/// Lifecycle: add lines, [`decompose`](Self::decompose), then
/// [`build_batch`](Self::build_batch); after that
/// [`attributes_for`](Self::attributes_for) hands out cached per-line views.
#[derive(Debug, Default)]
pub struct DrapedWallPrimitive {
    lines: SlotMap<LineKey, LogicalLine>,
    options: DecomposeOptions,
    segments: Vec<WallSegment>,
    ranges: InstanceRangeIndex,
    decomposed: bool,
    batch: Option<Rc<RefCell<BatchTable>>>,
    views: HashMap<LineId, Rc<InstanceAttributes>>,
}

impl DrapedWallPrimitive {
    #[must_use]
    pub fn new(options: DecomposeOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn options(&self) -> &DecomposeOptions {
        &self.options
    }

    /// Adds a line; it takes part in the next [`decompose`](Self::decompose).
    pub fn add_line(&mut self, line: LogicalLine) -> LineKey {
        self.lines.insert(line)
    }

    /// Returns the line behind `key`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::StaleLine`] if the line has been released.
    pub fn line(&self, key: LineKey) -> std::result::Result<&LogicalLine, GeometryError> {
        self.lines.get(key).ok_or(GeometryError::StaleLine)
    }

    /// Number of lines still held.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Decomposes every held line into wall segments.
    ///
    /// Replaces any previous segments, drops the batch and every cached view.
    /// Lines that fail are skipped and returned with their errors. With
    /// [`DecomposeOptions::release_geometry`] set, the lines are released
    /// afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid terrain bounds or options.
    pub fn decompose(&mut self, terrain: TerrainHeights) -> Result<Vec<(LineId, DrapeError)>> {
        let result = DecomposeAll::new(terrain, self.options).execute(self.lines.values())?;

        self.release_batch();
        self.segments = result.segments;
        self.ranges = result.ranges;
        self.decomposed = true;

        if self.options.release_geometry {
            let _ = self.release_geometry();
        }
        Ok(result.skipped)
    }

    /// Releases the source lines and hands them back to the caller.
    ///
    /// Outstanding [`LineKey`]s become stale; segments and ranges are kept.
    pub fn release_geometry(&mut self) -> Vec<LogicalLine> {
        let released: Vec<LogicalLine> = self.lines.drain().map(|(_, line)| line).collect();
        info!(lines = released.len(), "released source geometry");
        released
    }

    /// Decomposed segments in batch order.
    #[must_use]
    pub fn segments(&self) -> &[WallSegment] {
        &self.segments
    }

    #[must_use]
    pub fn range_index(&self) -> &InstanceRangeIndex {
        &self.ranges
    }

    /// Builds the batched attribute store from the decomposed segments,
    /// replacing any previous batch and clearing cached views.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::NotDecomposed`] before
    /// [`decompose`](Self::decompose), or an error if the segment attributes
    /// cannot be batched.
    pub fn build_batch(&mut self) -> Result<()> {
        if !self.decomposed {
            return Err(BatchError::NotDecomposed.into());
        }
        let table = BatchTable::from_segments(&self.segments)?;
        self.release_batch();
        info!(
            instances = table.instance_count(),
            attributes = table.attribute_count(),
            lines = self.ranges.len(),
            "built wall batch"
        );
        self.batch = Some(Rc::new(RefCell::new(table)));
        Ok(())
    }

    /// Returns `true` once a batch is available.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.batch.is_some()
    }

    /// Returns the batched attribute store, if built.
    #[must_use]
    pub fn batch(&self) -> Option<&Rc<RefCell<BatchTable>>> {
        self.batch.as_ref()
    }

    /// Returns the attribute view for line `id`.
    ///
    /// Views are created on first access and cached until the batch is
    /// rebuilt or the primitive destroyed. Lines that produced no segments
    /// yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::BatchNotBuilt`] before
    /// [`build_batch`](Self::build_batch).
    pub fn attributes_for(&mut self, id: &str) -> Result<Option<Rc<InstanceAttributes>>> {
        let Some(batch) = &self.batch else {
            return Err(BatchError::BatchNotBuilt.into());
        };
        if let Some(view) = self.views.get(id) {
            return Ok(Some(Rc::clone(view)));
        }
        let Some(range) = self.ranges.lookup(id) else {
            return Ok(None);
        };

        let id = LineId::from(id);
        let view = Rc::new(InstanceAttributes::new(id.clone(), range, batch));
        let _ = self.views.insert(id, Rc::clone(&view));
        Ok(Some(view))
    }

    /// Rebuilds the batch from the current segments. Cached views are
    /// discarded; views handed out earlier report the old batch as released.
    ///
    /// # Errors
    ///
    /// See [`build_batch`](Self::build_batch).
    pub fn rebuild(&mut self) -> Result<()> {
        self.build_batch()
    }

    /// Drops the batch, segments, ranges and cached views.
    pub fn destroy(&mut self) {
        self.release_batch();
        self.segments.clear();
        self.ranges = InstanceRangeIndex::default();
        self.decomposed = false;
    }

    fn release_batch(&mut self) {
        self.views.clear();
        self.batch = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::attribute::{AttributeValue, COLOR, DISTANCE, WIDTH};
    use crate::math::Cartographic;

    fn line(id: &str, samples: usize) -> LogicalLine {
        let positions = (0..samples)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let lat = 0.002 * i as f64;
                Cartographic::from_degrees(20.0, lat, 0.0)
            })
            .collect();
        LogicalLine::new(id, positions, 2.0).with_color([0, 0, 255, 255])
    }

    fn terrain() -> TerrainHeights {
        TerrainHeights::new(-100.0, 100.0).unwrap()
    }

    fn built(lines: Vec<LogicalLine>) -> DrapedWallPrimitive {
        let mut primitive = DrapedWallPrimitive::default();
        for l in lines {
            let _ = primitive.add_line(l);
        }
        let skipped = primitive.decompose(terrain()).unwrap();
        assert!(skipped.is_empty());
        primitive.build_batch().unwrap();
        primitive
    }

    #[test]
    fn access_before_batch_is_a_usage_error() {
        let mut primitive = DrapedWallPrimitive::default();
        let _ = primitive.add_line(line("a", 3));
        assert!(matches!(
            primitive.attributes_for("a"),
            Err(DrapeError::Batch(BatchError::BatchNotBuilt))
        ));
        let _ = primitive.decompose(terrain()).unwrap();
        assert!(primitive.attributes_for("a").is_err());
        assert!(!primitive.is_ready());
    }

    #[test]
    fn build_before_decompose_fails() {
        let mut primitive = DrapedWallPrimitive::default();
        assert!(matches!(
            primitive.build_batch(),
            Err(DrapeError::Batch(BatchError::NotDecomposed))
        ));
    }

    #[test]
    fn unknown_id_is_absent() {
        let mut primitive = built(vec![line("a", 3)]);
        assert!(primitive.attributes_for("nonexistent-id").unwrap().is_none());
    }

    #[test]
    fn views_are_cached() {
        let mut primitive = built(vec![line("a", 3)]);
        let first = primitive.attributes_for("a").unwrap().unwrap();
        let second = primitive.attributes_for("a").unwrap().unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn rebuild_invalidates_cache() {
        let mut primitive = built(vec![line("a", 3)]);
        let before = primitive.attributes_for("a").unwrap().unwrap();
        primitive.rebuild().unwrap();
        let after = primitive.attributes_for("a").unwrap().unwrap();
        assert!(!Rc::ptr_eq(&before, &after));
        assert!(matches!(
            before.get(COLOR),
            Err(DrapeError::Batch(BatchError::BatchReleased))
        ));
        assert!(after.get(COLOR).is_ok());
    }

    #[test]
    fn set_color_spans_five_segments() {
        let mut primitive = built(vec![line("a", 3), line("five", 6), line("c", 4)]);
        let view = primitive.attributes_for("five").unwrap().unwrap();
        assert_eq!(view.range().len(), 5);

        view.set_components(COLOR, &[255.0, 0.0, 0.0, 255.0]).unwrap();
        assert_eq!(
            view.get(COLOR).unwrap(),
            AttributeValue::from([255.0, 0.0, 0.0, 255.0])
        );

        let batch = primitive.batch().unwrap().borrow();
        let color = batch.attribute_index(COLOR).unwrap();
        for index in 0..batch.instance_count() {
            let raw = batch.get_raw(index, color).unwrap();
            if view.range().contains(index) {
                assert_eq!(raw, &[255.0, 0.0, 0.0, 255.0]);
            } else {
                assert_eq!(raw, &[0.0, 0.0, 255.0, 255.0]);
            }
        }
    }

    #[test]
    fn derived_attributes_are_read_only() {
        let mut primitive = built(vec![line("a", 4)]);
        let view = primitive.attributes_for("a").unwrap().unwrap();
        assert_eq!(view.get(WIDTH).unwrap(), AttributeValue::Scalar(2.0));
        assert!(view.set(WIDTH, 5.0).is_err());
        assert!(view.set(DISTANCE, [0.0, 1.0, 2.0]).is_err());
        assert_eq!(view.is_writable(COLOR), Some(true));
    }

    #[test]
    fn distance_reads_first_segment() {
        let mut primitive = built(vec![line("a", 4)]);
        let view = primitive.attributes_for("a").unwrap().unwrap();
        let AttributeValue::Vec3(distance) = view.get(DISTANCE).unwrap() else {
            panic!("distance should be a 3-vector");
        };
        assert_eq!(distance.x, 0.0);
        assert!(distance.y > 0.0);
        assert!(distance.z > distance.y);
    }

    #[test]
    fn degenerate_line_has_no_view() {
        let p = Cartographic::from_degrees(1.0, 1.0, 0.0);
        let mut primitive = built(vec![
            line("a", 3),
            LogicalLine::new("dot", vec![p, p], 1.0).with_color([0, 0, 0, 255]),
        ]);
        assert!(primitive.range_index().lookup("dot").is_none());
        assert!(primitive.attributes_for("dot").unwrap().is_none());
    }

    #[test]
    fn release_geometry_keeps_ranges() {
        let options = DecomposeOptions {
            release_geometry: true,
            ..DecomposeOptions::default()
        };
        let mut primitive = DrapedWallPrimitive::new(options);
        let key = primitive.add_line(line("a", 3));
        assert!(primitive.line(key).is_ok());

        let _ = primitive.decompose(terrain()).unwrap();
        assert!(matches!(primitive.line(key), Err(GeometryError::StaleLine)));
        assert_eq!(primitive.line_count(), 0);
        assert_eq!(primitive.segments().len(), 2);

        primitive.build_batch().unwrap();
        let view = primitive.attributes_for("a").unwrap().unwrap();
        assert_eq!(view.range().first(), 0);
        assert_eq!(view.range().last(), 1);
    }

    #[test]
    fn explicit_release_returns_lines() {
        let mut primitive = DrapedWallPrimitive::default();
        let key = primitive.add_line(line("a", 3));
        let _ = primitive.decompose(terrain()).unwrap();
        let lines = primitive.release_geometry();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].id().as_str(), "a");
        assert!(primitive.line(key).is_err());
        assert_eq!(primitive.range_index().len(), 1);
    }

    #[test]
    fn skipped_lines_are_reported() {
        let mut primitive = DrapedWallPrimitive::default();
        let _ = primitive.add_line(line("good", 3));
        let _ = primitive.add_line(LogicalLine::new("bad", vec![], 1.0));
        let skipped = primitive.decompose(terrain()).unwrap();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].0.as_str(), "bad");
        assert!(primitive.range_index().lookup("good").is_some());
    }

    #[test]
    fn mismatched_line_does_not_block_the_batch() {
        let mut primitive = DrapedWallPrimitive::default();
        let _ = primitive.add_line(line("colored", 3));
        let plain = LogicalLine::new(
            "plain",
            vec![
                Cartographic::from_degrees(30.0, 0.0, 0.0),
                Cartographic::from_degrees(30.0, 0.002, 0.0),
                Cartographic::from_degrees(30.0, 0.004, 0.0),
            ],
            1.0,
        );
        let _ = primitive.add_line(plain);

        let skipped = primitive.decompose(terrain()).unwrap();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].0.as_str(), "plain");

        primitive.build_batch().unwrap();
        let colored = primitive.attributes_for("colored").unwrap().unwrap();
        assert_eq!(
            colored.get(COLOR).unwrap(),
            AttributeValue::from([0.0, 0.0, 255.0, 255.0])
        );
        assert!(primitive.attributes_for("plain").unwrap().is_none());
    }

    #[test]
    fn destroy_releases_everything() {
        let mut primitive = built(vec![line("a", 3)]);
        let view = primitive.attributes_for("a").unwrap().unwrap();
        primitive.destroy();
        assert!(!primitive.is_ready());
        assert!(primitive.segments().is_empty());
        assert!(view.get(COLOR).is_err());
        assert!(primitive.build_batch().is_err());
    }
}
