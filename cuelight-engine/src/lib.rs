//! # cuelight engine
//!
//! Real-time stage-lighting control: a channel buffer per DMX universe, a
//! fixed-rate Art-Net transmitter, a fade engine with per-channel last-wins
//! ownership, and a cue playback state machine with follow timers.
//!
//! [`LightingEngine`] wires the parts together. Show data (fixtures, scenes,
//! cue lists) is read through the [`ShowData`] trait.

pub mod addressing;
pub mod config;
pub mod dmx;
pub mod engine;
pub mod error;
pub mod fade;
pub mod playback;
pub mod show;

pub use config::EngineConfig;
pub use engine::LightingEngine;
pub use error::{Error, Result};
pub use show::{ShowData, ShowFile, ShowLibrary};
