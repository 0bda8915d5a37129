// The melody under construction: a tone sequence and the steps between them.
//
// A `Melody` always holds one more tone than it has intervals, with
// `tones[i + 1] == tones[i] + intervals[i]`. The only mutations are
// `push_interval` and `pop_interval`, so the search can treat it as a stack:
// push a candidate, test the rules, recurse, pop. The rules in rules.rs look
// mostly at the newest elements and rely on that discipline.
//
// Snapshots stored in the classification grid are plain clones, re-centered
// once with `centered_on` and otherwise never touched.

use crate::intervals::Interval;
use crate::tone::Tone;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Melody {
    tones: Vec<Tone>,
    intervals: Vec<Interval>,
}

impl Melody {
    /// A one-tone melody starting at `start`.
    pub fn new(start: Tone) -> Self {
        Melody {
            tones: vec![start],
            intervals: Vec::new(),
        }
    }

    /// Build a melody by pushing `intervals` in order from `start`.
    pub fn from_intervals(start: Tone, intervals: &[Interval]) -> Self {
        let mut melody = Melody::new(start);
        for &iv in intervals {
            melody.push_interval(iv);
        }
        melody
    }

    pub fn push_interval(&mut self, interval: Interval) {
        let next = self.last_tone().midi_note + interval as i16;
        self.intervals.push(interval);
        self.tones.push(Tone::new(next));
    }

    /// Remove the newest interval and its tone. The start tone is never
    /// removed.
    pub fn pop_interval(&mut self) -> Option<Interval> {
        let interval = self.intervals.pop()?;
        self.tones.pop();
        Some(interval)
    }

    pub fn tones(&self) -> &[Tone] {
        &self.tones
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn num_tones(&self) -> usize {
        self.tones.len()
    }

    pub fn num_intervals(&self) -> usize {
        self.intervals.len()
    }

    pub fn first_tone(&self) -> Tone {
        self.tones[0]
    }

    pub fn last_tone(&self) -> Tone {
        self.tones[self.tones.len() - 1]
    }

    pub fn last_interval(&self) -> Option<Interval> {
        self.intervals.last().copied()
    }

    /// True once the melody has returned to its first tone. A melody with no
    /// intervals is not closed.
    pub fn is_closed(&self) -> bool {
        !self.intervals.is_empty() && self.first_tone() == self.last_tone()
    }

    pub fn lowest(&self) -> Tone {
        self.tones.iter().copied().min().unwrap_or(self.tones[0])
    }

    pub fn highest(&self) -> Tone {
        self.tones.iter().copied().max().unwrap_or(self.tones[0])
    }

    /// Span in semitones between the lowest and highest tone.
    pub fn height(&self) -> i16 {
        self.highest().midi_note - self.lowest().midi_note
    }

    /// Number of times consecutive intervals switch sign.
    pub fn direction_changes(&self) -> usize {
        self.intervals
            .windows(2)
            .filter(|pair| (pair[0] > 0) != (pair[1] > 0))
            .count()
    }

    /// A copy transposed so that `floor((highest + lowest) / 2)` lands on
    /// `reference`.
    pub fn centered_on(&self, reference: Tone) -> Melody {
        let mid = (self.highest().midi_note + self.lowest().midi_note).div_euclid(2);
        let offset = reference.midi_note - mid;
        Melody {
            tones: self
                .tones
                .iter()
                .map(|t| Tone::new(t.midi_note + offset))
                .collect(),
            intervals: self.intervals.clone(),
        }
    }

    /// Tone spellings without octave, e.g. "E F♯ A F E".
    pub fn tones_string(&self) -> String {
        self.tones
            .iter()
            .map(|t| t.spelling())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Interval numbers, e.g. "2 3 -4 -1".
    pub fn intervals_string(&self) -> String {
        self.intervals
            .iter()
            .map(|iv| iv.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Display label: "tone-letters  /  interval-numbers".
    pub fn label(&self) -> String {
        format!("{}  /  {}", self.tones_string(), self.intervals_string())
    }
}

impl fmt::Display for Melody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tone::MIDI_E3;

    fn e3() -> Tone {
        Tone::new(MIDI_E3)
    }

    #[test]
    fn test_push_pop_keeps_tones_in_step() {
        let mut melody = Melody::new(e3());
        melody.push_interval(2);
        melody.push_interval(3);
        assert_eq!(melody.num_tones(), 3);
        assert_eq!(melody.last_tone(), Tone::new(57));

        assert_eq!(melody.pop_interval(), Some(3));
        assert_eq!(melody.num_tones(), 2);
        assert_eq!(melody.last_tone(), Tone::new(54));

        assert_eq!(melody.pop_interval(), Some(2));
        assert_eq!(melody.pop_interval(), None);
        assert_eq!(melody.tones(), &[e3()]);
    }

    #[test]
    fn test_closed() {
        let mut melody = Melody::new(e3());
        assert!(!melody.is_closed());
        melody.push_interval(2);
        assert!(!melody.is_closed());
        melody.push_interval(-2);
        assert!(melody.is_closed());
    }

    #[test]
    fn test_height_and_direction_changes() {
        let melody = Melody::from_intervals(e3(), &[2, 3, -4, -1]);
        assert_eq!(melody.height(), 5);
        assert_eq!(melody.direction_changes(), 1);

        let zigzag = Melody::from_intervals(e3(), &[2, -1, 3, -2, 1]);
        assert_eq!(zigzag.direction_changes(), 4);
        assert_eq!(Melody::new(e3()).direction_changes(), 0);
    }

    #[test]
    fn test_centering() {
        // Tones 52 54 57 53 52: mid = (57 + 52) / 2 = 54, shifted down 2.
        let melody = Melody::from_intervals(e3(), &[2, 3, -4, -1]);
        let centered = melody.centered_on(e3());
        let notes: Vec<i16> = centered.tones().iter().map(|t| t.midi_note).collect();
        assert_eq!(notes, vec![50, 52, 55, 51, 50]);
        assert_eq!(centered.intervals(), melody.intervals());
        // Source untouched.
        assert_eq!(melody.first_tone(), e3());
    }

    #[test]
    fn test_centering_floors_odd_spans() {
        // Span 52..55: (55 + 52) / 2 = 53.5 floors to 53.
        let melody = Melody::from_intervals(e3(), &[3, -1, -2]);
        let centered = melody.centered_on(e3());
        let mid = (centered.highest().midi_note + centered.lowest().midi_note).div_euclid(2);
        assert_eq!(mid, MIDI_E3);
        assert_eq!(centered.first_tone(), Tone::new(51));
    }

    #[test]
    fn test_labels() {
        let melody = Melody::from_intervals(e3(), &[2, 3, -4, -1]);
        assert_eq!(melody.tones_string(), "E F♯ A F E");
        assert_eq!(melody.intervals_string(), "2 3 -4 -1");
        assert_eq!(melody.label(), "E F♯ A F E  /  2 3 -4 -1");
        assert_eq!(melody.to_string(), melody.label());
    }
}
