// LilyPond sheet music output from the classification grid.
//
// Each non-empty subset becomes one .ly file named after the subset. Every
// melody is one system on a bass staff: whole notes, a title markup of the
// form "{direction changes}.{length}.{index}:  {label}" over the first note,
// then four bars of multi-measure rest and a final barline before the line
// break. Page layout is left to the engraver.
//
// Uses absolute pitches (not \relative). Sharps only, matching the tone
// spellings used in labels.

use crate::buckets::{ClassificationGrid, MelodySubset};
use crate::config::VocalRange;
use crate::error::MelodyError;
use crate::melody::Melody;
use crate::tone::Tone;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub const SCORE_TITLE: &str = "Hindemith-Compliant Melodies";

/// Scientific octave that LilyPond's unmarked `c` belongs to (MIDI 48).
const LY_BASE_OCTAVE: i16 = 3;

/// Convert a tone to a LilyPond absolute pitch, e.g. F♯3 -> "fis",
/// C4 -> "c'", B2 -> "b,".
pub fn ly_note(tone: Tone) -> String {
    let mut result = tone.letter().to_ascii_lowercase().to_string();
    if tone.is_sharp() {
        result.push_str("is");
    }
    let octave = tone.octave() - LY_BASE_OCTAVE;
    let mark = if octave > 0 { '\'' } else { ',' };
    for _ in 0..octave.unsigned_abs() {
        result.push(mark);
    }
    result
}

/// Escape a string for use inside a LilyPond double-quoted string.
fn ly_string(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// One melody as a single system: titled whole notes, rest bars, barline.
pub fn render_melody(melody: &Melody, title: &str) -> String {
    let mut out = String::new();
    for (i, tone) in melody.tones().iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{}1", ly_note(*tone));
        if i == 0 {
            let _ = write!(out, "^\\markup {{ \\bold \"{}\" }}", ly_string(title));
        }
    }
    out.push_str(" R1*4 \\bar \"|.\" \\break");
    out
}

/// Title line for the `index`th (1-based) melody of a subset.
pub fn melody_title(subset: &MelodySubset, index: usize, melody: &Melody) -> String {
    format!(
        "{}.{}.{}:  {}",
        subset.direction_changes(),
        subset.melody_size(),
        index,
        melody.label()
    )
}

/// A complete LilyPond document for one subset and the melodies chosen
/// from it.
pub fn subset_to_lilypond(subset: &MelodySubset, melodies: &[&Melody]) -> String {
    let mut ly = String::new();
    ly.push_str("\\version \"2.24.0\"\n\n");
    let _ = write!(
        ly,
        "\\header {{\n  title = \"{}\"\n  subtitle = \"{}\"\n  tagline = ##f\n}}\n\n",
        SCORE_TITLE,
        ly_string(&subset.name())
    );

    ly.push_str("\\score {\n");
    ly.push_str("  \\new Staff \\with { \\remove \"Time_signature_engraver\" } {\n");
    ly.push_str("    \\clef bass\n");
    ly.push_str("    \\compressEmptyMeasures\n");
    for (i, melody) in melodies.iter().enumerate() {
        let title = melody_title(subset, i + 1, melody);
        let _ = writeln!(ly, "    {}", render_melody(melody, &title));
    }
    ly.push_str("  }\n");
    ly.push_str("  \\layout { }\n");
    ly.push_str("}\n");
    ly
}

/// The melodies of `subset` that get exported: the capped view, narrowed to
/// `voice` when one is given.
pub fn select_melodies<'a>(
    subset: &'a MelodySubset,
    cap: usize,
    voice: Option<&VocalRange>,
) -> Result<Vec<&'a Melody>, MelodyError> {
    let mut melodies = Vec::new();
    for melody in subset.capped_melodies(cap) {
        let in_range = match voice {
            Some(range) => range.contains(melody)?,
            None => true,
        };
        if in_range {
            melodies.push(melody);
        }
    }
    Ok(melodies)
}

/// Write one `"{subset name}.ly"` per non-empty subset into `dir`, creating
/// it if needed. At most `cap` melodies per final-interval group are
/// engraved; with `voice` set, melodies outside that range are skipped and
/// subsets left empty produce no file. Returns the written paths.
pub fn write_scores(
    grid: &ClassificationGrid,
    cap: usize,
    voice: Option<&VocalRange>,
    dir: &Path,
) -> Result<Vec<PathBuf>, MelodyError> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for subset in grid.non_empty_subsets() {
        let melodies = select_melodies(subset, cap, voice)?;
        if melodies.is_empty() {
            continue;
        }

        let path = dir.join(format!("{}.ly", subset.name()));
        std::fs::write(&path, subset_to_lilypond(subset, &melodies))?;
        info!(path = %path.display(), melodies = melodies.len(), "Wrote score");
        written.push(path);
    }
    Ok(written)
}
