// Generator configuration.
//
// Every tunable the search reads lives in `GeneratorConfig`. The defaults
// reproduce the chapter-one exercise set: melodies of 4 to 14 intervals
// starting on E3, spanning at most 19 semitones, with at most 14 direction
// changes and 100 melodies kept per final-interval group.
//
// Configs can be loaded from JSON; any field left out takes its default, so
// a file containing only `{"max_melody_intervals": 8}` is valid. CLI flags
// are applied on top of the loaded file (see main.rs).
//
// Vocal ranges are carried here as named presets for filtering exported
// melodies. The search never reads them.

use crate::error::MelodyError;
use crate::melody::Melody;
use crate::rules::RuleLimits;
use crate::tone::{MIDI_E3, Tone};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Low / comfortable-middle / high pitches of a voice type, as spellings
/// like "F2".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocalRange {
    pub low: String,
    pub mid: String,
    pub high: String,
}

impl VocalRange {
    pub fn new(low: &str, mid: &str, high: &str) -> Self {
        VocalRange {
            low: low.to_string(),
            mid: mid.to_string(),
            high: high.to_string(),
        }
    }

    pub fn low_tone(&self) -> Result<Tone, MelodyError> {
        Tone::from_spelling_and_octave(&self.low)
    }

    pub fn mid_tone(&self) -> Result<Tone, MelodyError> {
        Tone::from_spelling_and_octave(&self.mid)
    }

    pub fn high_tone(&self) -> Result<Tone, MelodyError> {
        Tone::from_spelling_and_octave(&self.high)
    }

    /// True if every tone of `melody` lies within `low..=high`.
    pub fn contains(&self, melody: &Melody) -> Result<bool, MelodyError> {
        let (low, high) = (self.low_tone()?, self.high_tone()?);
        Ok(melody.lowest() >= low && melody.highest() <= high)
    }
}

fn default_vocal_ranges() -> BTreeMap<String, VocalRange> {
    [
        ("soprano", VocalRange::new("C4", "B4", "G5")),
        ("mezzo-soprano", VocalRange::new("A3", "G4", "F5")),
        ("alto", VocalRange::new("G3", "F4", "D5")),
        ("tenor", VocalRange::new("C3", "B3", "A4")),
        ("baritone", VocalRange::new("G2", "F3", "E4")),
        ("bass", VocalRange::new("F2", "E3", "C4")),
    ]
    .into_iter()
    .map(|(name, range)| (name.to_string(), range))
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Shortest melody (in intervals) allowed to close.
    pub min_melody_intervals: usize,
    /// Search depth bound, in intervals.
    pub max_melody_intervals: usize,
    /// Largest allowed span between lowest and highest tone, in semitones.
    pub max_melody_height: i16,
    pub max_direction_changes: usize,
    /// Per final-interval group cap applied at export time.
    pub max_melodies_per_final_interval_subset: usize,
    /// MIDI note every melody starts on, and the pitch stored melodies are
    /// re-centered around.
    pub start_pitch: i16,
    /// Wall-clock interval between progress reports during the search.
    pub progress_update_seconds: u64,
    /// Whether over-full groups are shuffled after the search.
    pub shuffle: bool,
    /// Seed for the shuffle. `None` lets the caller pick one.
    pub seed: Option<u64>,
    pub vocal_ranges: BTreeMap<String, VocalRange>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            min_melody_intervals: 4,
            max_melody_intervals: 14,
            max_melody_height: 19,
            max_direction_changes: 14,
            max_melodies_per_final_interval_subset: 100,
            start_pitch: MIDI_E3,
            progress_update_seconds: 5,
            shuffle: true,
            seed: None,
            vocal_ranges: default_vocal_ranges(),
        }
    }
}

impl GeneratorConfig {
    /// Load and validate a config from a JSON file.
    pub fn load(path: &Path) -> Result<Self, MelodyError> {
        let data = std::fs::read_to_string(path)?;
        let config: GeneratorConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MelodyError> {
        let invalid = |msg: String| Err(MelodyError::InvalidConfig(msg));
        if self.max_melody_intervals < 2 {
            return invalid(format!(
                "max_melody_intervals must be at least 2, got {}",
                self.max_melody_intervals
            ));
        }
        if self.min_melody_intervals > self.max_melody_intervals {
            return invalid(format!(
                "min_melody_intervals ({}) exceeds max_melody_intervals ({})",
                self.min_melody_intervals, self.max_melody_intervals
            ));
        }
        if self.max_melodies_per_final_interval_subset == 0 {
            return invalid("max_melodies_per_final_interval_subset must be positive".to_string());
        }
        if self.max_melody_height <= 0 {
            return invalid(format!(
                "max_melody_height must be positive, got {}",
                self.max_melody_height
            ));
        }
        if Tone::new(self.start_pitch).midi_key().is_none() {
            return Err(MelodyError::PitchOutOfRange(self.start_pitch));
        }
        for range in self.vocal_ranges.values() {
            range.low_tone()?;
            range.mid_tone()?;
            range.high_tone()?;
        }
        Ok(())
    }

    pub fn rule_limits(&self) -> RuleLimits {
        RuleLimits {
            min_intervals: self.min_melody_intervals,
            max_height: self.max_melody_height,
            max_direction_changes: self.max_direction_changes,
        }
    }

    pub fn start_tone(&self) -> Tone {
        Tone::new(self.start_pitch)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress_update_seconds)
    }

    pub fn vocal_range(&self, name: &str) -> Result<&VocalRange, MelodyError> {
        self.vocal_ranges
            .get(name)
            .ok_or_else(|| MelodyError::UnknownVoice(name.to_string()))
    }
}
