//! # cuelight Common Library
//!
//! Shared code for the lighting engine and anything that talks to it:
//! - Show data model (fixtures, scenes, cues, cue lists)
//! - Event types (LightingEvent enum), playback status and the EventBus
//! - Easing curve definitions and calculations
//! - Config file location resolution

pub mod config;
pub mod error;
pub mod events;
pub mod fade_curves;
pub mod model;

pub use error::{Error, Result};
pub use events::{CueListSubscription, EventBus, LightingEvent, PlaybackStatus};
pub use fade_curves::EasingCurve;
pub use model::{
    ChannelDefinition, ChannelType, Cue, CueList, FixtureInstance, FixtureValues, Scene,
};
