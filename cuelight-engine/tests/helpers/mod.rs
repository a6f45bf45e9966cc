//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use cuelight_common::{Cue, CueList, FixtureInstance, Scene};
use cuelight_engine::dmx::artnet::ARTNET_HEADER_LEN;
use cuelight_engine::dmx::FrameSink;
use cuelight_engine::{EngineConfig, LightingEngine, ShowLibrary};
use uuid::Uuid;

/// Frame sink recording the channel data of every frame sent
#[derive(Default)]
pub struct CaptureSink {
    frames: Mutex<Vec<(u16, Vec<u8>)>>,
}

impl CaptureSink {
    /// Channel data (512 bytes) of every captured frame for `universe`
    pub fn universe_frames(&self, universe: u16) -> Vec<Vec<u8>> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| *u == universe)
            .map(|(_, frame)| frame[ARTNET_HEADER_LEN..].to_vec())
            .collect()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }
}

impl FrameSink for CaptureSink {
    fn send_frame(&self, universe: u16, frame: &[u8]) -> io::Result<()> {
        self.frames.lock().unwrap().push((universe, frame.to_vec()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "capture"
    }
}

/// A one-universe rig: a 3-channel RGB fixture at channel 10 plus a show
pub struct TestRig {
    pub engine: LightingEngine,
    pub sink: Arc<CaptureSink>,
    pub show: Arc<ShowLibrary>,
    pub fixture: FixtureInstance,
}

impl TestRig {
    pub fn new() -> Self {
        Self::with_universes(1)
    }

    pub fn with_universes(universe_count: u16) -> Self {
        let config = EngineConfig {
            universe_count,
            artnet_enabled: false,
            ..Default::default()
        }
        .validate()
        .unwrap();

        let show = Arc::new(ShowLibrary::new());
        let fixture = FixtureInstance::new("RGB PAR", 1, 10)
            .with_channel("Red", cuelight_common::ChannelType::Red)
            .with_channel("Green", cuelight_common::ChannelType::Green)
            .with_channel("Blue", cuelight_common::ChannelType::Blue);
        show.insert_fixture(fixture.clone());

        let sink = Arc::new(CaptureSink::default());
        let engine = LightingEngine::with_sink(config, show.clone(), sink.clone());

        Self {
            engine,
            sink,
            show,
            fixture,
        }
    }

    /// Store a scene setting the fixture to `rgb`
    pub fn add_scene(&self, rgb: [u8; 3]) -> Uuid {
        let scene = Scene::new(format!("rgb {:?}", rgb)).with_fixture(self.fixture.id, rgb.to_vec());
        let id = scene.id;
        self.show.insert_scene(scene);
        id
    }

    /// Store a cue list; each cue is (fade_in, follow, rgb)
    pub fn add_cue_list(&self, cues: &[(f64, Option<f64>, [u8; 3])]) -> Uuid {
        let cues = cues
            .iter()
            .enumerate()
            .map(|(i, (fade_in, follow, rgb))| {
                let mut cue = Cue::new(i as f64 + 1.0, self.add_scene(*rgb), *fade_in);
                cue.follow_time = *follow;
                cue
            })
            .collect();
        let list = CueList::new("main", cues);
        let id = list.id;
        self.show.insert_cue_list(list);
        id
    }

    /// Current value of one channel in universe 1
    pub fn channel(&self, channel: u16) -> u8 {
        self.engine.get_universe_output(1).unwrap()[channel as usize - 1]
    }
}
