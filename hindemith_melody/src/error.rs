// Errors from the layers around the search.
//
// The search itself is total: an illegal candidate is a pruning signal, not
// an error. Everything here comes from loading configuration, parsing note
// spellings, and writing scores or previews.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MelodyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown note spelling {0:?}")]
    UnknownSpelling(String),

    #[error("unknown vocal range {0:?}")]
    UnknownVoice(String),

    #[error("pitch {0} is outside the MIDI range")]
    PitchOutOfRange(i16),
}
