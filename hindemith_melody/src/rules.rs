// Legality rules for chapter-one melodies.
//
// Each rule is an independent pure predicate over the melody as it stands
// right after an append. `first_violation` runs them in a fixed order and
// stops at the first one that fires; the search treats any violation as a
// signal to pop and try the next candidate, never as an error.
//
// Several rules only inspect the newest interval or tone. That is sound
// because the search appends one interval at a time and re-checks after
// every append, so every earlier prefix has already passed.
//
// Rules:
// - ClosedTooShort:          returned home before `min_intervals`
// - DuplicateTone:           newest tone repeats an interior tone
// - DuplicateInterval:       newest step repeats a step two or more back
// - UnamelioratedTritone:    tritone not resolved by a perfect leap
// - TooLargeARange:          span exceeds `max_height`
// - TooManyInSameDirection:  last five steps all move the same way
// - TwoSequencesOfThree:     last two steps repeat (or mirror) an earlier pair
// - ThreeSequencesOfTwo:     some step value used three times
// - TooManyDirectionChanges: more than `max_direction_changes` sign changes
// - IllegalClosingInterval:  closed on a step outside LAST_INTERVALS

use crate::intervals::{Interval, PERFECT_DOWN, PERFECT_UP, TRITONE, is_last_interval};
use crate::melody::Melody;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric ceilings the rules are checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleLimits {
    pub min_intervals: usize,
    pub max_height: i16,
    pub max_direction_changes: usize,
}

impl Default for RuleLimits {
    fn default() -> Self {
        RuleLimits {
            min_intervals: 4,
            max_height: 19,
            max_direction_changes: 14,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rule {
    ClosedTooShort,
    DuplicateTone,
    DuplicateInterval,
    UnamelioratedTritone,
    TooLargeARange,
    TooManyInSameDirection,
    TwoSequencesOfThree,
    ThreeSequencesOfTwo,
    TooManyDirectionChanges,
    IllegalClosingInterval,
}

impl Rule {
    /// Evaluation order used by `first_violation`.
    pub const PIPELINE: [Rule; 10] = [
        Rule::ClosedTooShort,
        Rule::DuplicateTone,
        Rule::DuplicateInterval,
        Rule::UnamelioratedTritone,
        Rule::TooLargeARange,
        Rule::TooManyInSameDirection,
        Rule::TwoSequencesOfThree,
        Rule::ThreeSequencesOfTwo,
        Rule::TooManyDirectionChanges,
        Rule::IllegalClosingInterval,
    ];

    pub fn is_violated(self, melody: &Melody, limits: &RuleLimits) -> bool {
        match self {
            Rule::ClosedTooShort => {
                melody.is_closed() && melody.num_intervals() < limits.min_intervals
            }
            Rule::DuplicateTone => has_duplicate_tone(melody),
            Rule::DuplicateInterval => has_duplicate_interval(melody.intervals()),
            Rule::UnamelioratedTritone => has_unameliorated_tritone(melody.intervals()),
            Rule::TooLargeARange => melody.height() > limits.max_height,
            Rule::TooManyInSameDirection => has_too_many_in_same_direction(melody.intervals()),
            Rule::TwoSequencesOfThree => has_two_sequences_of_three(melody.intervals()),
            Rule::ThreeSequencesOfTwo => has_three_sequences_of_two(melody.intervals()),
            Rule::TooManyDirectionChanges => {
                melody.direction_changes() > limits.max_direction_changes
            }
            Rule::IllegalClosingInterval => {
                melody.is_closed() && !melody.last_interval().is_some_and(is_last_interval)
            }
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Rule::ClosedTooShort => "returns to the first tone too soon",
            Rule::DuplicateTone => "repeats a tone",
            Rule::DuplicateInterval => "repeats an interval",
            Rule::UnamelioratedTritone => "leaves a tritone unresolved",
            Rule::TooLargeARange => "spans too large a range",
            Rule::TooManyInSameDirection => "moves too long in one direction",
            Rule::TwoSequencesOfThree => "repeats a three-note shape",
            Rule::ThreeSequencesOfTwo => "uses one interval three times",
            Rule::TooManyDirectionChanges => "changes direction too often",
            Rule::IllegalClosingInterval => "closes on an illegal interval",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// The first rule `melody` breaks, if any. Melodies with fewer than two
/// intervals are provisionally legal.
pub fn first_violation(melody: &Melody, limits: &RuleLimits) -> Option<Rule> {
    if melody.num_intervals() < 2 {
        return None;
    }
    Rule::PIPELINE
        .iter()
        .copied()
        .find(|rule| rule.is_violated(melody, limits))
}

pub fn is_legal(melody: &Melody, limits: &RuleLimits) -> bool {
    first_violation(melody, limits).is_none()
}

fn has_duplicate_tone(melody: &Melody) -> bool {
    // Landing back on the first tone is closure, not duplication.
    if melody.is_closed() {
        return false;
    }
    let Some((newest, earlier)) = melody.tones().split_last() else {
        return false;
    };
    earlier.iter().skip(1).any(|tone| tone == newest)
}

fn has_duplicate_interval(intervals: &[Interval]) -> bool {
    let Some((&newest, _)) = intervals.split_last() else {
        return false;
    };
    intervals[..intervals.len().saturating_sub(2)].contains(&newest)
}

fn has_unameliorated_tritone(intervals: &[Interval]) -> bool {
    let n = intervals.len();
    if n < 2 {
        return false;
    }
    let resolved_by = |tritone: Interval| {
        if tritone == -TRITONE {
            Some(&PERFECT_UP)
        } else if tritone == TRITONE {
            Some(&PERFECT_DOWN)
        } else {
            None
        }
    };

    if n == 2 {
        return match resolved_by(intervals[0]) {
            Some(perfect) => !perfect.contains(&intervals[1]),
            None => false,
        };
    }
    match resolved_by(intervals[n - 2]) {
        Some(perfect) => {
            !perfect.contains(&intervals[n - 3]) && !perfect.contains(&intervals[n - 1])
        }
        None => false,
    }
}

fn has_too_many_in_same_direction(intervals: &[Interval]) -> bool {
    let n = intervals.len();
    if n < 5 {
        return false;
    }
    let window = &intervals[n - 5..];
    window.iter().all(|&iv| iv > 0) || window.iter().all(|&iv| iv < 0)
}

fn has_two_sequences_of_three(intervals: &[Interval]) -> bool {
    let n = intervals.len();
    if n < 4 {
        return false;
    }
    let pattern = (intervals[n - 2], intervals[n - 1]);
    let mirrored = (-pattern.0, -pattern.1);
    // Pairs that end before the pattern starts.
    intervals[..n - 2]
        .windows(2)
        .map(|pair| (pair[0], pair[1]))
        .any(|pair| pair == pattern || pair == mirrored)
}

fn has_three_sequences_of_two(intervals: &[Interval]) -> bool {
    let mut counts = [0u8; 256];
    for &iv in intervals {
        let slot = &mut counts[iv as u8 as usize];
        *slot += 1;
        if *slot > 2 {
            return true;
        }
    }
    false
}
