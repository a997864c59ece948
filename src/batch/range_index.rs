use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;

use crate::error::BatchError;
use crate::geometry::LineId;

/// Inclusive range of segment indices produced by one logical line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexRange {
    first: usize,
    last: usize,
}

impl IndexRange {
    /// Creates a range covering `first..=last`.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::InvalidRange`] if `first > last`.
    pub fn new(first: usize, last: usize) -> Result<Self, BatchError> {
        if first > last {
            return Err(BatchError::InvalidRange { first, last });
        }
        Ok(Self { first, last })
    }

    #[must_use]
    pub fn first(&self) -> usize {
        self.first
    }

    #[must_use]
    pub fn last(&self) -> usize {
        self.last
    }

    /// Number of segments in the range; never zero.
    #[must_use]
    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }

    /// Always `false`; empty ranges are never constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        (self.first..=self.last).contains(&index)
    }

    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.first <= other.last && other.first <= self.last
    }

    /// Iterates over the segment indices.
    #[must_use]
    pub fn indices(&self) -> RangeInclusive<usize> {
        self.first..=self.last
    }
}

/// Maps each logical line to the contiguous segment range it produced.
///
/// Ranges are immutable once registered and never overlap.
#[derive(Debug, Clone, Default)]
pub struct InstanceRangeIndex {
    by_id: HashMap<LineId, IndexRange>,
    by_first: BTreeMap<usize, LineId>,
}

impl InstanceRangeIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the range `first..=last` for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::InvalidRange`] if `first > last`,
    /// [`BatchError::DuplicateIdentifier`] if `id` already has a range, or
    /// [`BatchError::OverlappingRange`] if the range intersects another one.
    pub fn register(
        &mut self,
        id: LineId,
        first: usize,
        last: usize,
    ) -> Result<IndexRange, BatchError> {
        let range = IndexRange::new(first, last)?;
        if self.by_id.contains_key(&id) {
            return Err(BatchError::DuplicateIdentifier(id.to_string()));
        }

        // Only the nearest ranges on either side can intersect.
        let before = self.by_first.range(..=last).next_back();
        let after = self.by_first.range(first..).next();
        for (_, other) in before.into_iter().chain(after) {
            if self.by_id[other].overlaps(&range) {
                return Err(BatchError::OverlappingRange {
                    id: id.to_string(),
                    first,
                    last,
                });
            }
        }

        let _ = self.by_first.insert(first, id.clone());
        let _ = self.by_id.insert(id, range);
        Ok(range)
    }

    /// Returns the range registered for `id`, if any.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<IndexRange> {
        self.by_id.get(id).copied()
    }

    /// Returns the line owning segment `index`, if any.
    #[must_use]
    pub fn owner_of(&self, index: usize) -> Option<&LineId> {
        let (_, id) = self.by_first.range(..=index).next_back()?;
        self.by_id[id].contains(index).then_some(id)
    }

    /// Number of registered lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Total number of segments covered by all ranges.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.by_id.values().map(IndexRange::len).sum()
    }

    /// Iterates over `(id, range)` pairs in segment order.
    pub fn iter(&self) -> impl Iterator<Item = (&LineId, IndexRange)> + '_ {
        self.by_first.values().map(|id| (id, self.by_id[id]))
    }
}
