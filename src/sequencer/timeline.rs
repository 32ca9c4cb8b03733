// TrackTimeline - Ordered pattern placements on one track
// Splice semantics: insert, or atomically replace a measure range

use crate::sequencer::queue_data::PatternRef;

/// A pattern placed on a track for the measure range
/// `[start_measure, start_measure + length_measures)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PatternPlacement {
    pub start_measure: u32,
    pub length_measures: u32,
    pub pattern: PatternRef,
    pub loop_enabled: bool,
}

impl PatternPlacement {
    /// Creates a new placement. Length must be at least one measure.
    pub fn new(
        start_measure: u32,
        length_measures: u32,
        pattern: PatternRef,
        loop_enabled: bool,
    ) -> Self {
        assert!(length_measures >= 1, "Placement must span at least one measure");
        Self {
            start_measure,
            length_measures,
            pattern,
            loop_enabled,
        }
    }

    /// First measure after the placement.
    pub fn end_measure(&self) -> u32 {
        self.start_measure + self.length_measures
    }

    /// True if `measure` falls inside the placement.
    pub fn contains(&self, measure: u32) -> bool {
        measure >= self.start_measure && measure < self.end_measure()
    }

    fn overlaps(&self, start: u32, end: u32) -> bool {
        self.start_measure < end && self.end_measure() > start
    }
}

/// Ordered, non-overlapping placements of one track.
///
/// The list accumulates the song as performed: placements that finished
/// playing stay behind as history. Mutation happens only through splices;
/// external readers must treat returned placements as point-in-time copies
/// since a later splice may replace them.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrackTimeline {
    placements: Vec<PatternPlacement>,
}

impl TrackTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// All placements, sorted by start measure.
    pub fn placements(&self) -> &[PatternPlacement] {
        &self.placements
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// The placement covering `measure`, if any.
    pub fn placement_at(&self, measure: u32) -> Option<&PatternPlacement> {
        self.placements.iter().find(|p| p.contains(measure))
    }

    /// The placement whose range ends exactly at `measure`, if any.
    pub fn placement_ending_at(&self, measure: u32) -> Option<&PatternPlacement> {
        self.placements.iter().find(|p| p.end_measure() == measure)
    }

    /// Insert a placement at `start_measure`.
    ///
    /// With `replace_existing`, placements overlapping the new range are
    /// removed, or truncated when they started before the splice point, so
    /// that no transient overlap is observable. Returns the slots whose
    /// placements were removed or cut short, for the scheduler's
    /// bookkeeping.
    ///
    /// Without `replace_existing`, overlap is a caller bug: fatal in debug
    /// builds, contained (inserted regardless) in release.
    pub fn splice_at(
        &mut self,
        start_measure: u32,
        length_measures: u32,
        pattern: PatternRef,
        loop_enabled: bool,
        replace_existing: bool,
    ) -> Vec<PatternRef> {
        let end = start_measure + length_measures;
        let mut displaced = Vec::new();

        if replace_existing {
            let mut kept = Vec::with_capacity(self.placements.len());
            for mut placement in self.placements.drain(..) {
                if !placement.overlaps(start_measure, end) {
                    kept.push(placement);
                } else if placement.start_measure < start_measure {
                    // keep the part that already played
                    if !displaced.contains(&placement.pattern) {
                        displaced.push(placement.pattern);
                    }
                    placement.length_measures = start_measure - placement.start_measure;
                    kept.push(placement);
                } else if !displaced.contains(&placement.pattern) {
                    displaced.push(placement.pattern);
                }
            }
            self.placements = kept;
        } else {
            debug_assert!(
                self.placements.iter().all(|p| !p.overlaps(start_measure, end)),
                "Overlapping splice at measure {start_measure} without replace"
            );
        }

        let placement = PatternPlacement::new(start_measure, length_measures, pattern, loop_enabled);
        let at = self
            .placements
            .partition_point(|p| p.start_measure < start_measure);
        self.placements.insert(at, placement);
        debug_assert!(self.is_sorted_and_disjoint());

        displaced
    }

    /// Remove everything. Used when a song is torn down.
    pub fn clear(&mut self) {
        self.placements.clear();
    }

    /// Invariant check: sorted by start, no two placements overlap.
    pub fn is_sorted_and_disjoint(&self) -> bool {
        self.placements
            .windows(2)
            .all(|w| w[0].end_measure() <= w[1].start_measure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a01() -> PatternRef {
        PatternRef::new(0, 0)
    }

    fn a02() -> PatternRef {
        PatternRef::new(0, 1)
    }

    #[test]
    fn test_placement_range() {
        let placement = PatternPlacement::new(4, 2, a01(), true);

        assert_eq!(placement.end_measure(), 6);
        assert!(placement.contains(4));
        assert!(placement.contains(5));
        assert!(!placement.contains(6));
        assert!(!placement.contains(3));
    }

    #[test]
    #[should_panic(expected = "at least one measure")]
    fn test_zero_length_placement_rejected() {
        PatternPlacement::new(0, 0, a01(), false);
    }

    #[test]
    fn test_splice_keeps_placements_sorted() {
        let mut timeline = TrackTimeline::new();

        timeline.splice_at(4, 1, a01(), true, false);
        timeline.splice_at(0, 1, a02(), true, false);
        timeline.splice_at(2, 1, a01(), true, false);

        let starts: Vec<u32> = timeline.placements().iter().map(|p| p.start_measure).collect();
        assert_eq!(starts, vec![0, 2, 4]);
        assert!(timeline.is_sorted_and_disjoint());
    }

    #[test]
    fn test_placement_lookup() {
        let mut timeline = TrackTimeline::new();
        timeline.splice_at(2, 2, a01(), true, false);

        assert_eq!(timeline.placement_at(3).map(|p| p.pattern), Some(a01()));
        assert!(timeline.placement_at(4).is_none());
        assert_eq!(
            timeline.placement_ending_at(4).map(|p| p.pattern),
            Some(a01())
        );
        assert!(timeline.placement_ending_at(3).is_none());
    }

    #[test]
    fn test_replacing_splice_removes_covered_placement() {
        let mut timeline = TrackTimeline::new();
        timeline.splice_at(3, 1, a01(), true, false);

        let displaced = timeline.splice_at(3, 1, a02(), true, true);

        assert_eq!(displaced, vec![a01()]);
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.placement_at(3).map(|p| p.pattern), Some(a02()));
    }

    #[test]
    fn test_replacing_splice_truncates_running_placement() {
        let mut timeline = TrackTimeline::new();
        // two-measure placement [1, 3)
        timeline.splice_at(1, 2, a01(), true, false);

        let displaced = timeline.splice_at(2, 1, a02(), true, true);

        assert_eq!(displaced, vec![a01()]);
        // the part of A that already played survives as [1, 2)
        let first = &timeline.placements()[0];
        assert_eq!(first.pattern, a01());
        assert_eq!(first.start_measure, 1);
        assert_eq!(first.end_measure(), 2);
        assert_eq!(timeline.placement_at(2).map(|p| p.pattern), Some(a02()));
        assert!(timeline.is_sorted_and_disjoint());
    }

    #[test]
    fn test_replacing_splice_with_no_overlap_displaces_nothing() {
        let mut timeline = TrackTimeline::new();
        timeline.splice_at(0, 1, a01(), true, false);

        let displaced = timeline.splice_at(1, 1, a01(), true, true);

        assert!(displaced.is_empty());
        assert_eq!(timeline.len(), 2);
        assert!(timeline.is_sorted_and_disjoint());
    }
}
