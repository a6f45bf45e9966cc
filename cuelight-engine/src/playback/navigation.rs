//! Cue index arithmetic for next / previous / go-to

use crate::error::{Error, Result};

/// Check a caller-supplied index against a list of `count` cues
pub fn validate_index(index: i64, count: usize) -> Result<usize> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < count)
        .ok_or(Error::InvalidCueIndex { index, count })
}

/// Index after `current`, rejecting movement past the last cue
pub fn next_index(current: usize, count: usize) -> Result<usize> {
    let next = current + 1;
    if next >= count {
        return Err(Error::AlreadyAtLastCue);
    }
    Ok(next)
}

/// Index before `current`, rejecting movement before the first cue
pub fn previous_index(current: usize) -> Result<usize> {
    current.checked_sub(1).ok_or(Error::AlreadyAtFirstCue)
}
