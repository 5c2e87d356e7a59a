//! Cut sections and the finalization sort/merge
//!
//! Analyzers emit candidate time ranges; finalization concatenates them,
//! sorts by start time, restores per-segment stability, and merges
//! overlapping or touching ranges into a disjoint list. Ranges never
//! merge across gamestate segments because their server-time axes are
//! unrelated.

/// One output time range, tagged with the segment it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutSection {
    pub game_state_index: u32,
    pub start_time_ms: i32,
    pub end_time_ms: i32,
    /// Tiny label naming the analyzer that produced the range
    pub very_short_desc: &'static str,
}

impl CutSection {
    /// Whether `next` overlaps or touches this range within one segment.
    fn absorbs(&self, next: &CutSection) -> bool {
        self.game_state_index == next.game_state_index && self.end_time_ms >= next.start_time_ms
    }
}

/// Merge a list that is already ordered (one analyzer's output) into
/// `out` as disjoint ranges.
pub fn merge_ordered(out: &mut Vec<CutSection>, input: &[CutSection]) {
    for cut in input {
        match out.last_mut() {
            Some(last) if last.absorbs(cut) => {
                last.end_time_ms = last.end_time_ms.max(cut.end_time_ms);
            }
            _ => out.push(*cut),
        }
    }
}

/// Finalize the combined output of several analyzers.
///
/// Two sorting passes: an unordered sort on start time, then a stable
/// sort on `game_state_index` that preserves the first pass through
/// explicit order tags. Coincident ranges keep the description of
/// whichever sorted first.
pub fn finalize(analyzer_outputs: &[&[CutSection]]) -> Vec<CutSection> {
    // One analyzer emits in order already; skip the sorting machinery.
    if let [only] = analyzer_outputs {
        let mut merged = Vec::new();
        merge_ordered(&mut merged, only);
        return merged;
    }

    struct Tagged {
        cut: CutSection,
        order: usize,
    }

    let mut tagged: Vec<Tagged> = analyzer_outputs
        .iter()
        .flat_map(|cuts| cuts.iter())
        .map(|&cut| Tagged { cut, order: 0 })
        .collect();

    // Pass 1: start time ascending. A proper three-way compare; the time
    // axis is i32 but differences may not fit one. Stable, so coincident
    // starts keep registration order and the merge keeps the first
    // analyzer's description.
    tagged.sort_by(|a, b| a.cut.start_time_ms.cmp(&b.cut.start_time_ms));

    // Pass 2: stable on segment, preserving pass 1 through the tags.
    for (position, item) in tagged.iter_mut().enumerate() {
        item.order = position;
    }
    tagged.sort_by(|a, b| {
        a.cut
            .game_state_index
            .cmp(&b.cut.game_state_index)
            .then(a.order.cmp(&b.order))
    });

    let mut merged = Vec::new();
    merge_ordered(
        &mut merged,
        &tagged.iter().map(|t| t.cut).collect::<Vec<_>>(),
    );
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cut(gs: u32, start: i32, end: i32) -> CutSection {
        CutSection {
            game_state_index: gs,
            start_time_ms: start,
            end_time_ms: end,
            very_short_desc: "test",
        }
    }

    #[test]
    fn test_touching_ranges_merge() {
        let a = [cut(0, 0, 100)];
        let b = [cut(0, 100, 200)];
        let merged = finalize(&[&a, &b]);
        assert_eq!(merged, vec![cut(0, 0, 200)]);
    }

    #[test]
    fn test_disjoint_ranges_stay_apart() {
        let a = [cut(0, 0, 100)];
        let b = [cut(0, 150, 250)];
        let merged = finalize(&[&a, &b]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].start_time_ms, 0);
        assert_eq!(merged[1].start_time_ms, 150);
    }

    #[test]
    fn test_no_merge_across_segments() {
        let a = [cut(0, 0, 200)];
        let b = [cut(1, 100, 300)];
        let merged = finalize(&[&a, &b]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].game_state_index, 0);
        assert_eq!(merged[1].game_state_index, 1);
    }

    #[test]
    fn test_segment_sort_is_stable_on_equal_start() {
        // Same start time, different segments, listed backwards.
        let a = [cut(1, 50, 60)];
        let b = [cut(0, 50, 60)];
        let merged = finalize(&[&a, &b]);
        assert_eq!(merged[0].game_state_index, 0);
        assert_eq!(merged[1].game_state_index, 1);
    }

    #[test]
    fn test_coincident_start_keeps_first_description() {
        let a = [CutSection {
            very_short_desc: "frag",
            ..cut(0, 50, 80)
        }];
        let b = [CutSection {
            very_short_desc: "rail",
            ..cut(0, 50, 90)
        }];
        let merged = finalize(&[&a, &b]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].very_short_desc, "frag");
        assert_eq!(merged[0].end_time_ms, 90);
    }

    #[test]
    fn test_wide_time_spans_compare_correctly() {
        // A difference that overflows i32 subtraction must still order.
        let a = [cut(0, i32::MIN + 10, i32::MIN + 20)];
        let b = [cut(0, i32::MAX - 20, i32::MAX - 10)];
        let merged = finalize(&[&b, &a]);
        assert_eq!(merged[0].start_time_ms, i32::MIN + 10);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_single_analyzer_skips_sorting() {
        let a = [cut(0, 0, 100), cut(0, 50, 150), cut(0, 400, 500)];
        let merged = finalize(&[&a]);
        assert_eq!(merged, vec![cut(0, 0, 150), cut(0, 400, 500)]);
    }

    #[test]
    fn test_overlap_merge_in_three() {
        let a = [cut(0, 0, 100), cut(0, 90, 120)];
        let b = [cut(0, 110, 180)];
        let merged = finalize(&[&a, &b]);
        assert_eq!(merged, vec![cut(0, 0, 180)]);
    }
}
