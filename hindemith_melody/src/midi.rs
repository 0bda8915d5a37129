// Audio preview of generated melodies.
//
// Playback goes through the `NotePlayer` trait: note on, note off, and a
// wait between them. `play_melody` sounds each tone at full velocity for the
// hold time, then waits out the pause before the next melody.
//
// `MidiRecorder` is the player shipped here. Instead of driving a device it
// records the calls into a single-track Standard MIDI File, so a preview of
// the exported melodies can be auditioned in any MIDI player. Waits become
// delta times at a fixed 60 BPM, so one second is one quarter note.
// Wrapping any player in `PacedPlayer` makes its waits block the calling
// thread, so the calls arrive at the speed they would be heard.
//
// Uses the `midly` crate for MIDI writing. Output is SMF Format 0.

use crate::error::MelodyError;
use crate::melody::Melody;
use crate::tone::Tone;
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Velocity used for every previewed note.
pub const PREVIEW_VELOCITY: u8 = 127;

/// Ticks per quarter note in MIDI output.
const TICKS_PER_QUARTER: u16 = 480;

/// Microseconds per quarter note: 60 BPM.
const TEMPO_MICROSECONDS: u32 = 1_000_000;

/// Largest delta time a track event can carry (28 bits).
const MAX_DELTA_TICKS: u32 = (1 << 28) - 1;

/// General MIDI program 52, choir aahs.
const CHOIR_PROGRAM: u8 = 52;

pub trait NotePlayer {
    fn note_on(&mut self, tone: Tone, velocity: u8) -> Result<(), MelodyError>;
    fn note_off(&mut self, tone: Tone) -> Result<(), MelodyError>;
    fn wait(&mut self, duration: Duration);
}

impl<P: NotePlayer + ?Sized> NotePlayer for &mut P {
    fn note_on(&mut self, tone: Tone, velocity: u8) -> Result<(), MelodyError> {
        (**self).note_on(tone, velocity)
    }

    fn note_off(&mut self, tone: Tone) -> Result<(), MelodyError> {
        (**self).note_off(tone)
    }

    fn wait(&mut self, duration: Duration) {
        (**self).wait(duration)
    }
}

/// Forwards every call to `inner`, sleeping through each wait first.
#[derive(Debug, Clone, Default)]
pub struct PacedPlayer<P> {
    inner: P,
}

impl<P: NotePlayer> PacedPlayer<P> {
    pub fn new(inner: P) -> Self {
        PacedPlayer { inner }
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: NotePlayer> NotePlayer for PacedPlayer<P> {
    fn note_on(&mut self, tone: Tone, velocity: u8) -> Result<(), MelodyError> {
        debug!(%tone, velocity, "Note on");
        self.inner.note_on(tone, velocity)
    }

    fn note_off(&mut self, tone: Tone) -> Result<(), MelodyError> {
        debug!(%tone, "Note off");
        self.inner.note_off(tone)
    }

    fn wait(&mut self, duration: Duration) {
        std::thread::sleep(duration);
        self.inner.wait(duration);
    }
}

/// Sound every tone of `melody` for `hold`, then rest for `pause`.
pub fn play_melody<P: NotePlayer + ?Sized>(
    player: &mut P,
    melody: &Melody,
    hold: Duration,
    pause: Duration,
) -> Result<(), MelodyError> {
    for &tone in melody.tones() {
        player.note_on(tone, PREVIEW_VELOCITY)?;
        player.wait(hold);
        player.note_off(tone)?;
    }
    player.wait(pause);
    Ok(())
}

/// Play a sequence of melodies back to back. Returns how many were played.
pub fn play_melodies<'a, P, I>(
    player: &mut P,
    melodies: I,
    hold: Duration,
    pause: Duration,
) -> Result<usize, MelodyError>
where
    P: NotePlayer + ?Sized,
    I: IntoIterator<Item = &'a Melody>,
{
    let mut played = 0;
    for melody in melodies {
        play_melody(player, melody, hold, pause)?;
        played += 1;
    }
    Ok(played)
}

/// Records `NotePlayer` calls as a single MIDI track.
#[derive(Debug, Clone)]
pub struct MidiRecorder {
    track: Track<'static>,
    channel: u4,
    /// Ticks accumulated by `wait` since the last event.
    pending_ticks: u32,
    notes: usize,
}

impl Default for MidiRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiRecorder {
    pub fn new() -> Self {
        let channel = u4::new(0);
        let track = vec![
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::TrackName(b"Melody preview")),
            },
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(TEMPO_MICROSECONDS))),
            },
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::ProgramChange {
                        program: u7::new(CHOIR_PROGRAM),
                    },
                },
            },
        ];
        MidiRecorder {
            track,
            channel,
            pending_ticks: 0,
            notes: 0,
        }
    }

    /// Notes started so far.
    pub fn num_notes(&self) -> usize {
        self.notes
    }

    fn push_midi(&mut self, message: MidiMessage) {
        let delta = self.take_pending();
        self.track.push(TrackEvent {
            delta,
            kind: TrackEventKind::Midi {
                channel: self.channel,
                message,
            },
        });
    }

    fn take_pending(&mut self) -> u28 {
        let ticks = self.pending_ticks.min(MAX_DELTA_TICKS);
        self.pending_ticks = 0;
        u28::new(ticks)
    }

    /// The recording as an in-memory SMF, closed with an end-of-track event
    /// after any trailing wait.
    pub fn to_smf(&self) -> Smf<'static> {
        let mut smf = Smf::new(Header::new(
            Format::SingleTrack,
            Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
        ));
        let mut track = self.track.clone();
        track.push(TrackEvent {
            delta: u28::new(self.pending_ticks.min(MAX_DELTA_TICKS)),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });
        smf.tracks.push(track);
        smf
    }

    pub fn write(&self, path: &Path) -> Result<(), MelodyError> {
        let mut buf = Vec::new();
        self.to_smf().write_std(&mut buf)?;
        std::fs::write(path, &buf)?;
        Ok(())
    }
}

fn duration_to_ticks(duration: Duration) -> u32 {
    let ticks = duration.as_micros() * TICKS_PER_QUARTER as u128 / TEMPO_MICROSECONDS as u128;
    u32::try_from(ticks).unwrap_or(u32::MAX)
}

fn key_of(tone: Tone) -> Result<u7, MelodyError> {
    tone.midi_key()
        .map(u7::new)
        .ok_or(MelodyError::PitchOutOfRange(tone.midi_note))
}

impl NotePlayer for MidiRecorder {
    fn note_on(&mut self, tone: Tone, velocity: u8) -> Result<(), MelodyError> {
        let key = key_of(tone)?;
        self.push_midi(MidiMessage::NoteOn {
            key,
            vel: u7::new(velocity.min(127)),
        });
        self.notes += 1;
        Ok(())
    }

    fn note_off(&mut self, tone: Tone) -> Result<(), MelodyError> {
        let key = key_of(tone)?;
        self.push_midi(MidiMessage::NoteOff {
            key,
            vel: u7::new(0),
        });
        Ok(())
    }

    fn wait(&mut self, duration: Duration) {
        self.pending_ticks = self.pending_ticks.saturating_add(duration_to_ticks(duration));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tone::MIDI_E3;
    use std::time::Instant;

    /// Logs calls instead of making sound.
    #[derive(Default)]
    struct LogPlayer {
        calls: Vec<String>,
    }

    impl NotePlayer for LogPlayer {
        fn note_on(&mut self, tone: Tone, velocity: u8) -> Result<(), MelodyError> {
            self.calls.push(format!("on {} {}", tone, velocity));
            Ok(())
        }

        fn note_off(&mut self, tone: Tone) -> Result<(), MelodyError> {
            self.calls.push(format!("off {}", tone));
            Ok(())
        }

        fn wait(&mut self, duration: Duration) {
            self.calls.push(format!("wait {}", duration.as_millis()));
        }
    }

    fn scenario_melody() -> Melody {
        Melody::from_intervals(Tone::new(MIDI_E3), &[2, 3, -4, -1])
    }

    #[test]
    fn test_play_melody_call_sequence() {
        let mut player = LogPlayer::default();
        let melody = Melody::from_intervals(Tone::new(MIDI_E3), &[2, -2]);
        play_melody(
            &mut player,
            &melody,
            Duration::from_millis(500),
            Duration::from_secs(2),
        )
        .unwrap();
        assert_eq!(
            player.calls,
            vec![
                "on E3 127",
                "wait 500",
                "off E3",
                "on F♯3 127",
                "wait 500",
                "off F♯3",
                "on E3 127",
                "wait 500",
                "off E3",
                "wait 2000",
            ]
        );
    }

    #[test]
    fn test_paced_player_blocks_for_waits() {
        let melody = Melody::from_intervals(Tone::new(MIDI_E3), &[2, -2]);
        let hold = Duration::from_millis(20);
        let pause = Duration::from_millis(30);

        let mut log = LogPlayer::default();
        let started = Instant::now();
        play_melody(&mut PacedPlayer::new(&mut log), &melody, hold, pause).unwrap();
        assert!(started.elapsed() >= hold * 3 + pause);

        let mut unpaced = LogPlayer::default();
        play_melody(&mut unpaced, &melody, hold, pause).unwrap();
        assert_eq!(log.calls, unpaced.calls);
    }

    #[test]
    fn test_paced_recorder_matches_unpaced() {
        let hold = Duration::from_millis(5);
        let pause = Duration::from_millis(10);
        let mut paced = PacedPlayer::new(MidiRecorder::new());
        play_melody(&mut paced, &scenario_melody(), hold, pause).unwrap();
        let mut plain = MidiRecorder::new();
        play_melody(&mut plain, &scenario_melody(), hold, pause).unwrap();
        assert_eq!(paced.into_inner().to_smf(), plain.to_smf());
    }

    #[test]
    fn test_recorder_counts_and_timing() {
        let mut recorder = MidiRecorder::new();
        let played = play_melodies(
            &mut recorder,
            [scenario_melody(), scenario_melody()].iter(),
            Duration::from_millis(500),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(played, 2);
        assert_eq!(recorder.num_notes(), 10);

        let smf = recorder.to_smf();
        assert_eq!(smf.tracks.len(), 1);
        let track = &smf.tracks[0];
        // 3 setup events, on+off per note, end of track.
        assert_eq!(track.len(), 3 + 20 + 1);
        // Half a second at 60 BPM is an eighth note.
        assert_eq!(track[4].delta.as_int(), 240);
        // Trailing pause lands on end of track.
        assert_eq!(track[track.len() - 1].delta.as_int(), 480);
    }

    #[test]
    fn test_recorder_rejects_unplayable_pitch() {
        let mut recorder = MidiRecorder::new();
        assert!(matches!(
            recorder.note_on(Tone::new(130), PREVIEW_VELOCITY),
            Err(MelodyError::PitchOutOfRange(130))
        ));
        assert_eq!(recorder.num_notes(), 0);
    }

    #[test]
    fn test_write_and_parse_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.mid");
        let mut recorder = MidiRecorder::new();
        play_melody(
            &mut recorder,
            &scenario_melody(),
            Duration::from_secs(1),
            Duration::from_secs(1),
        )
        .unwrap();
        recorder.write(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        let keys: Vec<u8> = smf.tracks[0]
            .iter()
            .filter_map(|event| match event.kind {
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOn { key, .. },
                    ..
                } => Some(key.as_int()),
                _ => None,
            })
            .collect();
        assert_eq!(keys, vec![52, 54, 57, 53, 52]);
    }
}
