//! Fade engine: time-based transitions with per-channel last-wins ownership

pub mod engine;
pub mod transition;

pub use engine::{FadeEngine, BLACKOUT_TRANSITION_ID};
pub use transition::{interpolate, ChannelFade, Transition};
