// Interval rule tables: which melodic steps may open, follow, and close a
// melody.
//
// The successor table is hand-authored after the exercises in Hindemith's
// "Elementary Training for Musicians" (chapter one). It is an opaque oracle,
// not a formula: the generator reproduces it verbatim.
//
// Table order matters. The generator walks successors in exactly the order
// listed here, so reordering an entry changes which melodies are discovered
// first (and therefore the pre-shuffle bucket order).

/// A signed melodic step in semitones.
pub type Interval = i8;

/// Every nonzero step up to a perfect fifth, in either direction.
pub const FIRST_INTERVALS: [Interval; 14] = [-7, -6, -5, -4, -3, -2, -1, 1, 2, 3, 4, 5, 6, 7];

/// Steps allowed to land on the closing tone.
pub const LAST_INTERVALS: [Interval; 8] = [-7, -4, -3, -2, -1, 1, 2, 5];

/// Perfect fourth / fifth leaps up that resolve a descending tritone.
pub const PERFECT_UP: [Interval; 2] = [5, 7];

/// Perfect fourth / fifth leaps down that resolve an ascending tritone.
pub const PERFECT_DOWN: [Interval; 2] = [-7, -5];

/// Magnitude of the tritone.
pub const TRITONE: Interval = 6;

/// Intervals legally permitted to follow `previous`.
///
/// Returns an empty slice for a value outside `FIRST_INTERVALS`; the search
/// never appends one, so an empty slice simply ends that branch.
pub fn successors(previous: Interval) -> &'static [Interval] {
    match previous {
        -7 => &[-2, -1, 1, 2, 5, 6],
        -6 => &[-2, -1, 1, 2, 4, 5, 7],
        -5 => &[-2, -1, 1, 2, 3, 4, 6, 7],
        -4 => &[-2, -1, 1, 2, 3, 5, 6],
        -3 => &[-2, -1, 1, 2, 4, 5],
        -2 => &[-7, -6, -5, -4, -3, 1, 3, 4, 5, 6, 7],
        -1 => &[-7, -6, -5, -4, -3, 2, 3, 4, 5, 6, 7],
        1 => &[-7, -6, -5, -4, -3, -2, 3, 4, 5, 6, 7],
        2 => &[-7, -6, -5, -4, -3, -1, 3, 4, 5, 6, 7],
        3 => &[-5, -4, -2, -1, 1, 2],
        4 => &[-6, -5, -3, -2, -1, 1, 2],
        5 => &[-7, -6, -4, -3, -2, -1, 1, 2],
        6 => &[-7, -5, -4, -2, -1, 1, 2],
        7 => &[-6, -5, -2, -1, 1, 2],
        _ => &[],
    }
}

pub fn is_last_interval(interval: Interval) -> bool {
    LAST_INTERVALS.contains(&interval)
}

/// Slot of `interval` within `LAST_INTERVALS`, used to index bucket groups.
pub fn last_interval_slot(interval: Interval) -> Option<usize> {
    LAST_INTERVALS.iter().position(|&iv| iv == interval)
}
