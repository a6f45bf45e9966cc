//! Show data model
//!
//! Records consumed from the persistence layer: fixture instances, scenes,
//! cues and cue lists. The engine treats all of them as read-only snapshots.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EasingCurve;

/// Semantic type of a fixture channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    Dimmer,
    Red,
    Green,
    Blue,
    Amber,
    White,
    Pan,
    Tilt,
    ColorWheel,
    Gobo,
    Shutter,
    Speed,
    #[default]
    Generic,
}

/// A channel in a fixture's layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDefinition {
    pub name: String,
    #[serde(default)]
    pub channel_type: ChannelType,
    /// Offset from the fixture's start channel (0 = first channel)
    pub offset: u16,
}

/// A patched fixture with a starting DMX address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureInstance {
    pub id: Uuid,
    pub name: String,
    /// Universe id (1-based)
    pub universe: u16,
    /// First channel used by this fixture (1-512)
    pub start_channel: u16,
    #[serde(default)]
    pub channels: Vec<ChannelDefinition>,
}

impl FixtureInstance {
    pub fn new(name: impl Into<String>, universe: u16, start_channel: u16) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            universe,
            start_channel,
            channels: Vec::new(),
        }
    }

    /// Append a channel at the next free offset
    pub fn with_channel(mut self, name: impl Into<String>, channel_type: ChannelType) -> Self {
        let offset = self.channels.len() as u16;
        self.channels.push(ChannelDefinition {
            name: name.into(),
            channel_type,
            offset,
        });
        self
    }

    /// Number of channels this fixture occupies
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Last channel used by this fixture, or `None` for a fixture without channels
    pub fn end_channel(&self) -> Option<u16> {
        if self.channels.is_empty() {
            None
        } else {
            Some(
                self.start_channel
                    .saturating_add(self.channels.len() as u16)
                    .saturating_sub(1),
            )
        }
    }
}

/// Raw channel values for one fixture inside a scene, aligned by offset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureValues {
    pub fixture_id: Uuid,
    pub values: Vec<u8>,
}

/// A named snapshot of channel values across one or more fixtures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub fixture_values: Vec<FixtureValues>,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            fixture_values: Vec::new(),
        }
    }

    /// Add the values for one fixture
    pub fn with_fixture(mut self, fixture_id: Uuid, values: Vec<u8>) -> Self {
        self.fixture_values.push(FixtureValues { fixture_id, values });
        self
    }
}

/// One step in a cue list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub id: Uuid,
    /// Sort key within the list (1, 1.5, 2, ...)
    pub cue_number: f64,
    #[serde(default)]
    pub name: String,
    pub scene_id: Uuid,
    /// Seconds
    #[serde(default)]
    pub fade_in_time: f64,
    /// Seconds
    #[serde(default)]
    pub fade_out_time: f64,
    /// Seconds after the fade-in completes before auto-advancing
    #[serde(default)]
    pub follow_time: Option<f64>,
    #[serde(default)]
    pub easing: EasingCurve,
}

impl Cue {
    pub fn new(cue_number: f64, scene_id: Uuid, fade_in_time: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            cue_number,
            name: String::new(),
            scene_id,
            fade_in_time,
            fade_out_time: 0.0,
            follow_time: None,
            easing: EasingCurve::Linear,
        }
    }

    pub fn with_follow_time(mut self, seconds: f64) -> Self {
        self.follow_time = Some(seconds);
        self
    }

    pub fn with_easing(mut self, easing: EasingCurve) -> Self {
        self.easing = easing;
        self
    }

    /// Follow delay, if this cue auto-advances
    ///
    /// Zero, negative and non-finite follow times count as "no follow".
    pub fn effective_follow_time(&self) -> Option<f64> {
        self.follow_time.filter(|t| t.is_finite() && *t > 0.0)
    }
}

/// An ordered sequence of cues
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CueList {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub cues: Vec<Cue>,
}

impl CueList {
    /// Create a cue list, ordering cues ascending by cue number
    pub fn new(name: impl Into<String>, cues: Vec<Cue>) -> Self {
        let mut list = Self {
            id: Uuid::new_v4(),
            name: name.into(),
            cues,
        };
        list.sort_cues();
        list
    }

    /// Restore ascending cue-number order (stable for equal numbers)
    pub fn sort_cues(&mut self) {
        self.cues.sort_by(|a, b| a.cue_number.total_cmp(&b.cue_number));
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Cue> {
        self.cues.get(index)
    }
}
