//! Cue playback: per-list state machine, navigation and timers

pub mod cue_player;
pub mod navigation;
pub mod timers;

pub use cue_player::{cue_list_transition_id, CuePlayer};
pub use timers::ListTimers;
