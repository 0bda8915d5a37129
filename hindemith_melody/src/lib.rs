// Hindemith Melody Generator
//
// Enumerates every short melody allowed by the rules of the first chapter of
// Hindemith's "Elementary Training for Musicians": a depth-first search over
// legal interval successions, pruned by a fixed pipeline of counterpoint
// rules. Accepted melodies are centered on the start pitch and filed by shape
// (direction changes x length x final interval), then sampled fairly for
// export.
//
// Architecture:
// - tone.rs: MIDI-number tones and their sharps-only spelling
// - intervals.rs: First/last interval sets and the successor table
// - melody.rs: Push/pop tone + interval sequence, centering, labels
// - rules.rs: Ordered legality pipeline reporting the first broken rule
// - buckets.rs: Dense classification grid of final-interval groups
// - generator.rs: Backtracking search, progress logging, fairness shuffle
// - config.rs: Serde-loadable generator settings and vocal-range presets
// - lilypond.rs: One LilyPond score per non-empty grid subset
// - midi.rs: NotePlayer preview trait and a MIDI-file recorder
// - error.rs: Error type for the layers around the search
//
// The search is deterministic; the only randomness is the seeded shuffle.

pub mod buckets;
pub mod config;
pub mod error;
pub mod generator;
pub mod intervals;
pub mod lilypond;
pub mod melody;
pub mod midi;
pub mod rules;
pub mod tone;
