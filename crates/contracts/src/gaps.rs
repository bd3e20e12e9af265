//! GapSet - ordered set of half-open sample-index ranges.
//!
//! Marks spans of sample indices known to be missing or invalid. Ranges are
//! kept sorted, merged and non-overlapping at all times. Because flag ranges
//! travel in fixed-size wire records, a set can be bounded to a maximum range
//! count by widening the tail into a single final range (lossy but bounded).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A half-open range `[begin, end)` of sample indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapRange {
    /// First index in the range.
    pub begin: i64,
    /// One past the last index in the range.
    pub end: i64,
}

impl GapRange {
    /// Create a range; an inverted range is normalized to empty.
    pub fn new(begin: i64, end: i64) -> Self {
        Self {
            begin,
            end: end.max(begin),
        }
    }

    /// Number of indices covered.
    #[inline]
    pub fn len(&self) -> i64 {
        self.end - self.begin
    }

    /// Whether the range covers no indices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end <= self.begin
    }

    /// Whether `index` falls inside the range.
    #[inline]
    pub fn contains(&self, index: i64) -> bool {
        index >= self.begin && index < self.end
    }

    /// Intersection with another range, if non-empty.
    pub fn intersect(&self, other: &GapRange) -> Option<GapRange> {
        let begin = self.begin.max(other.begin);
        let end = self.end.min(other.end);
        (begin < end).then_some(GapRange { begin, end })
    }
}

impl fmt::Display for GapRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.begin, self.end)
    }
}

/// An ordered, non-overlapping set of `[begin, end)` index ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapSet {
    ranges: Vec<GapRange>,
}

impl GapSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from arbitrary ranges, normalizing as needed.
    pub fn from_ranges(ranges: impl IntoIterator<Item = GapRange>) -> Self {
        let mut set = Self::new();
        for range in ranges {
            set.insert(range);
        }
        set
    }

    /// The normalized ranges, sorted by begin.
    #[inline]
    pub fn ranges(&self) -> &[GapRange] {
        &self.ranges
    }

    /// Number of ranges in the set.
    #[inline]
    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    /// Whether the set covers no indices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Total number of indices covered.
    pub fn covered_samples(&self) -> i64 {
        self.ranges.iter().map(GapRange::len).sum()
    }

    /// Whether `index` is covered by any range.
    pub fn contains(&self, index: i64) -> bool {
        match self.ranges.binary_search_by(|r| r.begin.cmp(&index)) {
            Ok(_) => true,
            Err(0) => false,
            Err(pos) => self.ranges[pos - 1].contains(index),
        }
    }

    /// Add a range, merging with overlapping or adjacent ranges.
    pub fn insert(&mut self, range: GapRange) {
        if range.is_empty() {
            return;
        }

        // Find the block of existing ranges that touch the new one.
        let start = self.ranges.partition_point(|r| r.end < range.begin);
        let stop = self.ranges.partition_point(|r| r.begin <= range.end);

        let mut merged = range;
        if start < stop {
            merged.begin = merged.begin.min(self.ranges[start].begin);
            merged.end = merged.end.max(self.ranges[stop - 1].end);
        }
        self.ranges.splice(start..stop, std::iter::once(merged));
    }

    /// Remove all coverage of `range`, splitting partially covered ranges.
    pub fn remove(&mut self, range: GapRange) {
        if range.is_empty() || self.ranges.is_empty() {
            return;
        }

        let mut result = Vec::with_capacity(self.ranges.len() + 1);
        for r in &self.ranges {
            if r.end <= range.begin || r.begin >= range.end {
                result.push(*r);
                continue;
            }
            if r.begin < range.begin {
                result.push(GapRange::new(r.begin, range.begin));
            }
            if r.end > range.end {
                result.push(GapRange::new(range.end, r.end));
            }
        }
        self.ranges = result;
    }

    /// Union with another set.
    pub fn union(&mut self, other: &GapSet) {
        for range in other.ranges() {
            self.insert(*range);
        }
    }

    /// Intersection of the set with a window, as a new set.
    pub fn clip(&self, window: GapRange) -> GapSet {
        let ranges = self
            .ranges
            .iter()
            .filter_map(|r| r.intersect(&window))
            .collect();
        GapSet { ranges }
    }

    /// Shift every range by `offset` (e.g. absolute indices to window-local).
    pub fn shift(&self, offset: i64) -> GapSet {
        GapSet {
            ranges: self
                .ranges
                .iter()
                .map(|r| GapRange::new(r.begin + offset, r.end + offset))
                .collect(),
        }
    }

    /// Truncate to at most `max_ranges` ranges.
    ///
    /// When the set exceeds the bound, the tail is widened into a single
    /// final range spanning from the first excess range's begin to the last
    /// range's end. Lossy (coverage only grows), idempotent.
    pub fn bound(&mut self, max_ranges: usize) {
        if max_ranges == 0 {
            self.ranges.clear();
            return;
        }
        if self.ranges.len() <= max_ranges {
            return;
        }
        let tail = GapRange::new(
            self.ranges[max_ranges - 1].begin,
            self.ranges[self.ranges.len() - 1].end,
        );
        self.ranges.truncate(max_ranges - 1);
        self.ranges.push(tail);
    }
}

impl fmt::Display for GapSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, r) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{r}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ranges: &[(i64, i64)]) -> GapSet {
        GapSet::from_ranges(ranges.iter().map(|&(b, e)| GapRange::new(b, e)))
    }

    #[test]
    fn test_insert_merges_overlapping() {
        let mut g = set(&[(0, 10), (20, 30)]);
        g.insert(GapRange::new(5, 25));
        assert_eq!(g.ranges(), &[GapRange::new(0, 30)]);
    }

    #[test]
    fn test_insert_merges_adjacent() {
        let mut g = set(&[(0, 10)]);
        g.insert(GapRange::new(10, 15));
        assert_eq!(g.ranges(), &[GapRange::new(0, 15)]);
    }

    #[test]
    fn test_insert_keeps_disjoint_sorted() {
        let g = set(&[(40, 60), (0, 10), (80, 90)]);
        assert_eq!(
            g.ranges(),
            &[
                GapRange::new(0, 10),
                GapRange::new(40, 60),
                GapRange::new(80, 90)
            ]
        );
        assert_eq!(g.covered_samples(), 40);
    }

    #[test]
    fn test_remove_splits_range() {
        let mut g = set(&[(0, 100)]);
        g.remove(GapRange::new(40, 60));
        assert_eq!(g.ranges(), &[GapRange::new(0, 40), GapRange::new(60, 100)]);
    }

    #[test]
    fn test_contains() {
        let g = set(&[(10, 20), (30, 40)]);
        assert!(g.contains(10));
        assert!(g.contains(19));
        assert!(!g.contains(20));
        assert!(!g.contains(25));
        assert!(g.contains(39));
        assert!(!g.contains(9));
    }

    #[test]
    fn test_clip_and_shift() {
        let g = set(&[(0, 10), (40, 60), (90, 120)]);
        let clipped = g.clip(GapRange::new(50, 100));
        assert_eq!(
            clipped.ranges(),
            &[GapRange::new(50, 60), GapRange::new(90, 100)]
        );
        let local = clipped.shift(-50);
        assert_eq!(
            local.ranges(),
            &[GapRange::new(0, 10), GapRange::new(40, 50)]
        );
    }

    #[test]
    fn test_bound_widens_tail() {
        let mut g = set(&[(0, 1), (10, 11), (20, 21), (30, 31)]);
        g.bound(2);
        assert_eq!(g.ranges(), &[GapRange::new(0, 1), GapRange::new(10, 31)]);
    }

    #[test]
    fn test_bound_is_idempotent() {
        let mut g = set(&[(0, 1), (10, 11), (20, 21), (30, 31), (50, 55)]);
        g.bound(3);
        let once = g.clone();
        g.bound(3);
        assert_eq!(g, once);
    }

    #[test]
    fn test_bound_noop_within_limit() {
        let mut g = set(&[(0, 5), (10, 15)]);
        let before = g.clone();
        g.bound(4);
        assert_eq!(g, before);
    }
}
