//! Error types for cuelight-engine
//!
//! Three classes of failure exist in the engine:
//! - invalid input (bad index, missing record, bad duration): returned to the caller
//! - transient network I/O: logged by the transmitter, never returned
//! - state conflicts (navigating a list that is not playing): returned like invalid input

use thiserror::Error;
use uuid::Uuid;

/// Main error type for cuelight-engine
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Cue index outside the list
    #[error("invalid cue index {index} (cue list has {count} cues)")]
    InvalidCueIndex { index: i64, count: usize },

    /// `next_cue` on the last cue
    #[error("already at last cue")]
    AlreadyAtLastCue,

    /// `previous_cue` on the first cue
    #[error("already at first cue")]
    AlreadyAtFirstCue,

    /// Navigation requested for a list that has no active playback
    #[error("no active playback for cue list {0}")]
    NoActivePlayback(Uuid),

    /// Missing cue list, scene or fixture
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration file loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Socket or file I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from the common crate (show file parsing, config files)
    #[error(transparent)]
    Common(#[from] cuelight_common::Error),
}

impl Error {
    /// True for errors the caller caused and should not retry
    pub fn is_invalid_input(&self) -> bool {
        match self {
            Error::InvalidInput(_)
            | Error::InvalidCueIndex { .. }
            | Error::AlreadyAtLastCue
            | Error::AlreadyAtFirstCue
            | Error::NoActivePlayback(_)
            | Error::NotFound(_) => true,
            Error::Common(inner) => matches!(
                inner,
                cuelight_common::Error::InvalidInput(_) | cuelight_common::Error::NotFound(_)
            ),
            Error::Config(_) | Error::Io(_) => false,
        }
    }
}

/// Convenience Result type using cuelight-engine Error
pub type Result<T> = std::result::Result<T, Error>;
