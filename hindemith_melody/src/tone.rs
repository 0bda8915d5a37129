// Tones: absolute semitone values and their sharps-only spelling.
//
// A `Tone` is a MIDI note number. Everything else about it (letter name,
// accidental, octave) is derived relative to A0 (MIDI 21), the bottom of the
// piano range, using a fixed A-based pitch-class table. Octave numbers are
// scientific: they tick over at C, so B2 is immediately followed by C3.
//
// Output spelling never uses flats. The reverse table (`pitch_class_of`)
// accepts flats and the enharmonic oddities (B♯, C♭, E♯, F♭) so that
// vocal-range presets like "B♭2" can be written the way singers write them.
//
// Consumed by melody.rs for labels, lilypond.rs for engraving, and config.rs
// for vocal-range presets.

use crate::error::MelodyError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// MIDI note number of A0, the reference point for note numbers.
pub const MIDI_A0: i16 = 21;

/// MIDI note number of E3, the default start (and centering) pitch.
pub const MIDI_E3: i16 = 52;

/// Pitch-class spellings indexed by `note_number % 12` (A = 0).
const NOTE_TO_SPELLING: [&str; 12] = [
    "A", "A♯", "B", "C", "C♯", "D", "D♯", "E", "F", "F♯", "G", "G♯",
];

/// Accepted spellings and the A-based pitch class they name.
const SPELLING_TO_NOTE: [(&str, u8); 21] = [
    ("A", 0),
    ("A♯", 1),
    ("B♭", 1),
    ("B", 2),
    ("C♭", 2),
    ("B♯", 3),
    ("C", 3),
    ("C♯", 4),
    ("D♭", 4),
    ("D", 5),
    ("D♯", 6),
    ("E♭", 6),
    ("E", 7),
    ("F♭", 7),
    ("E♯", 8),
    ("F", 8),
    ("F♯", 9),
    ("G♭", 9),
    ("G", 10),
    ("G♯", 11),
    ("A♭", 11),
];

/// Pitch class of C in the A-based numbering. Octave numbers change here.
const C_PITCH_CLASS: u8 = 3;

/// A single pitch, stored as a MIDI note number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tone {
    pub midi_note: i16,
}

impl Tone {
    pub fn new(midi_note: i16) -> Self {
        Tone { midi_note }
    }

    /// Semitones above A0.
    pub fn note_number(self) -> i16 {
        self.midi_note - MIDI_A0
    }

    /// A-based pitch class, 0 (A) through 11 (G♯).
    pub fn pitch_class(self) -> u8 {
        self.note_number().rem_euclid(12) as u8
    }

    /// Scientific octave number (C4 = middle C = MIDI 60).
    pub fn octave(self) -> i16 {
        (self.note_number() + 12 - C_PITCH_CLASS as i16).div_euclid(12)
    }

    /// Letter plus optional sharp, e.g. "F♯".
    pub fn spelling(self) -> &'static str {
        NOTE_TO_SPELLING[self.pitch_class() as usize]
    }

    /// Uppercase letter name without accidental.
    pub fn letter(self) -> char {
        // Every table entry starts with an ASCII letter.
        self.spelling().chars().next().unwrap_or('?')
    }

    pub fn is_sharp(self) -> bool {
        self.spelling().ends_with('♯')
    }

    /// Spelling with octave, e.g. "E3" or "C♯4".
    pub fn spelling_and_octave(self) -> String {
        format!("{}{}", self.spelling(), self.octave())
    }

    /// MIDI key if the tone is playable (0..=127).
    pub fn midi_key(self) -> Option<u8> {
        u8::try_from(self.midi_note).ok().filter(|&k| k <= 127)
    }

    /// Parse a spelling with octave such as "C4", "B♭2" or "F#3".
    pub fn from_spelling_and_octave(text: &str) -> Result<Tone, MelodyError> {
        let unknown = || MelodyError::UnknownSpelling(text.to_string());
        let split = text
            .find(|c: char| c.is_ascii_digit() || c == '-')
            .ok_or_else(unknown)?;
        let (name, octave) = text.split_at(split);
        let pitch_class = pitch_class_of(name).ok_or_else(unknown)?;
        let octave: i16 = octave.parse().map_err(|_| unknown())?;

        // A, A♯ and B sit above the C that starts their octave.
        let octaves_above_a0 = if pitch_class < C_PITCH_CLASS {
            Some(octave)
        } else {
            octave.checked_sub(1)
        };
        let midi_note = octaves_above_a0
            .and_then(|n| n.checked_mul(12))
            .and_then(|n| n.checked_add(pitch_class as i16 + MIDI_A0))
            .ok_or_else(unknown)?;
        Ok(Tone::new(midi_note))
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spelling_and_octave())
    }
}

/// Reverse spelling lookup. Accepts `♯`/`#` and `♭`/`b` accidentals.
pub fn pitch_class_of(spelling: &str) -> Option<u8> {
    let mut normalized = String::with_capacity(spelling.len());
    for (i, c) in spelling.chars().enumerate() {
        match c {
            '#' => normalized.push('♯'),
            'b' if i > 0 => normalized.push('♭'),
            c => normalized.push(c.to_ascii_uppercase()),
        }
    }
    SPELLING_TO_NOTE
        .iter()
        .find(|(name, _)| *name == normalized)
        .map(|&(_, pc)| pc)
}
