// The classification grid: where accepted melodies are kept.
//
// Accepted melodies are sorted by shape into a dense square of buckets
// indexed by (direction changes, tone count). Both axes run from zero to
// `max_melody_intervals + 1`, which covers every key a legal melody can
// produce, so the grid is allocated once and never grows. Each bucket is a
// `MelodySubset` that further splits its melodies by final interval, one
// group per entry of LAST_INTERVALS, in that order.
//
// The grid is the only artifact the formatting layers see. They read it
// through `non_empty_subsets` and `MelodySubset::capped_melodies`, which
// applies the per-group cap after the generator's fairness shuffle.
//
// An out-of-range key or an unclosable final interval means the search
// stored something it never should have; both panic.

use crate::intervals::{Interval, LAST_INTERVALS, last_interval_slot};
use crate::melody::Melody;
use hindemith_prng::MelodyRng;
use serde::{Deserialize, Serialize};

/// One bucket: melodies sharing a direction-change count and length.
#[derive(Debug, Clone)]
pub struct MelodySubset {
    direction_changes: usize,
    melody_size: usize,
    /// Indexed by slot within LAST_INTERVALS.
    groups: [Vec<Melody>; LAST_INTERVALS.len()],
}

impl MelodySubset {
    fn new(direction_changes: usize, melody_size: usize) -> Self {
        MelodySubset {
            direction_changes,
            melody_size,
            groups: Default::default(),
        }
    }

    pub fn direction_changes(&self) -> usize {
        self.direction_changes
    }

    /// Number of tones in every melody of this subset.
    pub fn melody_size(&self) -> usize {
        self.melody_size
    }

    /// Stable name combining both keys; also used as the score file name.
    pub fn name(&self) -> String {
        format!(
            "Melodies with {} direction changes and length {}",
            self.direction_changes, self.melody_size
        )
    }

    pub fn append(&mut self, melody: Melody) {
        let final_interval = melody.last_interval();
        let slot = final_interval
            .and_then(last_interval_slot)
            .unwrap_or_else(|| panic!("melody cannot close on {:?}", final_interval));
        self.groups[slot].push(melody);
    }

    pub fn num_melodies(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(Vec::is_empty)
    }

    /// Melodies ending on `final_interval`, in stored order.
    pub fn group(&self, final_interval: Interval) -> &[Melody] {
        match last_interval_slot(final_interval) {
            Some(slot) => &self.groups[slot],
            None => &[],
        }
    }

    /// (final interval, melodies) pairs in LAST_INTERVALS order.
    pub fn groups(&self) -> impl Iterator<Item = (Interval, &[Melody])> {
        LAST_INTERVALS
            .iter()
            .copied()
            .zip(self.groups.iter().map(Vec::as_slice))
    }

    /// At most `cap` melodies from each final-interval group, groups in
    /// LAST_INTERVALS order.
    pub fn capped_melodies(&self, cap: usize) -> Vec<&Melody> {
        self.groups
            .iter()
            .flat_map(|group| group.iter().take(cap))
            .collect()
    }

    /// Shuffle every group holding more than `cap` melodies. Returns how many
    /// groups were shuffled.
    fn shuffle_over_full(&mut self, cap: usize, rng: &mut MelodyRng) -> usize {
        let mut shuffled = 0;
        for group in self.groups.iter_mut().filter(|g| g.len() > cap) {
            rng.shuffle(group);
            shuffled += 1;
        }
        shuffled
    }
}

/// Per-subset counts, for logging and the JSON summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsetSummary {
    pub direction_changes: usize,
    pub length: usize,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSummary {
    pub subsets: Vec<SubsetSummary>,
    pub total: usize,
}

/// Dense (direction changes × length) table of subsets.
#[derive(Debug, Clone)]
pub struct ClassificationGrid {
    side: usize,
    /// Row-major: `subsets[direction_changes * side + length]`.
    subsets: Vec<MelodySubset>,
}

impl ClassificationGrid {
    /// Allocate every bucket a melody of up to `max_melody_intervals`
    /// intervals can land in.
    pub fn new(max_melody_intervals: usize) -> Self {
        let side = max_melody_intervals + 2;
        let subsets = (0..side)
            .flat_map(|dc| (0..side).map(move |len| MelodySubset::new(dc, len)))
            .collect();
        ClassificationGrid { side, subsets }
    }

    /// Number of entries along each axis.
    pub fn side(&self) -> usize {
        self.side
    }

    fn index(&self, direction_changes: usize, length: usize) -> usize {
        assert!(
            direction_changes < self.side && length < self.side,
            "bucket ({}, {}) outside {}x{} grid",
            direction_changes,
            length,
            self.side,
            self.side
        );
        direction_changes * self.side + length
    }

    pub fn subset(&self, direction_changes: usize, length: usize) -> &MelodySubset {
        &self.subsets[self.index(direction_changes, length)]
    }

    /// File a (closed, already centered) melody under its shape keys.
    pub fn insert(&mut self, melody: Melody) {
        let idx = self.index(melody.direction_changes(), melody.num_tones());
        self.subsets[idx].append(melody);
    }

    /// All subsets, ordered by direction changes then length.
    pub fn subsets(&self) -> impl Iterator<Item = &MelodySubset> {
        self.subsets.iter()
    }

    pub fn non_empty_subsets(&self) -> impl Iterator<Item = &MelodySubset> {
        self.subsets.iter().filter(|s| !s.is_empty())
    }

    pub fn num_melodies(&self) -> usize {
        self.subsets.iter().map(MelodySubset::num_melodies).sum()
    }

    /// Randomly permute every final-interval group larger than `cap`, so a
    /// later take-first-`cap` is an unbiased sample rather than the earliest
    /// discoveries. Returns how many groups were shuffled.
    pub fn shuffle_over_full(&mut self, cap: usize, rng: &mut MelodyRng) -> usize {
        self.subsets
            .iter_mut()
            .map(|subset| subset.shuffle_over_full(cap, rng))
            .sum()
    }

    pub fn summary(&self) -> GridSummary {
        let subsets: Vec<SubsetSummary> = self
            .non_empty_subsets()
            .map(|s| SubsetSummary {
                direction_changes: s.direction_changes(),
                length: s.melody_size(),
                count: s.num_melodies(),
            })
            .collect();
        let total = subsets.iter().map(|s| s.count).sum();
        GridSummary { subsets, total }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tone::{MIDI_E3, Tone};

    fn melody(intervals: &[Interval]) -> Melody {
        Melody::from_intervals(Tone::new(MIDI_E3), intervals)
    }

    #[test]
    fn test_grid_dimensions() {
        let grid = ClassificationGrid::new(14);
        assert_eq!(grid.side(), 16);
        assert_eq!(grid.subsets().count(), 256);
        assert_eq!(
            grid.subset(15, 15).name(),
            "Melodies with 15 direction changes and length 15"
        );
        assert_eq!(grid.num_melodies(), 0);
        assert_eq!(grid.non_empty_subsets().count(), 0);
    }

    #[test]
    fn test_insert_files_by_shape() {
        let mut grid = ClassificationGrid::new(6);
        grid.insert(melody(&[2, 3, -4, -1]));
        grid.insert(melody(&[-2, -1, 4, -1]));

        let subset = grid.subset(1, 5);
        assert_eq!(subset.num_melodies(), 1);
        assert_eq!(subset.group(-1).len(), 1);
        assert_eq!(subset.group(2).len(), 0);

        // -2 -1 +4 -1: two direction changes.
        assert_eq!(grid.subset(2, 5).group(-1).len(), 1);
        assert_eq!(grid.num_melodies(), 2);
        assert_eq!(grid.non_empty_subsets().count(), 2);
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn test_out_of_range_bucket_panics() {
        let grid = ClassificationGrid::new(4);
        grid.subset(0, 6);
    }

    #[test]
    #[should_panic(expected = "cannot close")]
    fn test_illegal_final_interval_panics() {
        let mut grid = ClassificationGrid::new(6);
        grid.insert(melody(&[2, 3, 1, -6]));
    }

    #[test]
    fn test_capped_melodies_take_prefix_per_group() {
        let mut subset = MelodySubset::new(1, 5);
        for _ in 0..5 {
            subset.append(melody(&[2, 3, -4, -1]));
        }
        for _ in 0..2 {
            subset.append(melody(&[3, 2, -1, -4]));
        }
        assert_eq!(subset.num_melodies(), 7);

        let capped = subset.capped_melodies(3);
        assert_eq!(capped.len(), 5);
        // -4 group precedes -1 in LAST_INTERVALS order.
        assert_eq!(capped[0].last_interval(), Some(-4));
        assert_eq!(capped[4].last_interval(), Some(-1));
    }

    #[test]
    fn test_shuffle_only_over_full_groups() {
        let mut grid = ClassificationGrid::new(6);
        let big: Vec<Melody> = [
            &[2, 3, -4, -1][..],
            &[3, 2, -4, -1],
            &[4, 1, -4, -1],
            &[5, -2, -2, -1],
            &[2, 4, -5, -1],
            &[1, 4, -4, -1],
        ]
        .iter()
        .map(|ivs| melody(ivs))
        .collect();
        for m in &big {
            grid.insert(m.clone());
        }
        let small = melody(&[-2, -1, 4, -1]);
        grid.insert(small.clone());

        let mut rng = MelodyRng::new(11);
        let shuffled = grid.shuffle_over_full(3, &mut rng);
        assert_eq!(shuffled, 1);

        let group = grid.subset(1, 5).group(-1);
        let mut sorted: Vec<_> = group.to_vec();
        let mut expected = big.clone();
        sorted.sort_by_key(|m| m.intervals().to_vec());
        expected.sort_by_key(|m| m.intervals().to_vec());
        assert_eq!(sorted, expected);
        assert_eq!(grid.subset(2, 5).group(-1), &[small]);
    }

    #[test]
    fn test_summary() {
        let mut grid = ClassificationGrid::new(6);
        grid.insert(melody(&[2, 3, -4, -1]));
        grid.insert(melody(&[3, 2, -4, -1]));
        grid.insert(melody(&[-2, -1, 4, -1]));
        let summary = grid.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(
            summary.subsets,
            vec![
                SubsetSummary {
                    direction_changes: 1,
                    length: 5,
                    count: 2,
                },
                SubsetSummary {
                    direction_changes: 2,
                    length: 5,
                    count: 1,
                },
            ]
        );
    }
}
