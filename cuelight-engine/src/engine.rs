//! LightingEngine: composition root
//!
//! Builds the universe store, transmitter, fade engine and cue player from one
//! [`EngineConfig`] and exposes the operations a control surface calls. No
//! globals; every engine is an isolated instance.

use std::sync::Arc;

use chrono::Utc;
use cuelight_common::{
    CueListSubscription, EasingCurve, EventBus, LightingEvent, PlaybackStatus,
};
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::addressing::resolve_scene;
use crate::config::EngineConfig;
use crate::dmx::{
    ChannelAddress, ChannelTarget, FrameSink, Transmitter, TransmitterStats, UniverseData,
    UniverseStore,
};
use crate::error::{Error, Result};
use crate::fade::FadeEngine;
use crate::playback::CuePlayer;
use crate::show::ShowData;

/// Fade engine transition id used by [`LightingEngine::play_scene`]
pub fn scene_transition_id(scene_id: Uuid) -> String {
    format!("scene:{}", scene_id)
}

pub struct LightingEngine {
    config: EngineConfig,
    show: Arc<dyn ShowData>,
    universes: Arc<UniverseStore>,
    transmitter: Arc<Transmitter>,
    fades: Arc<FadeEngine>,
    player: Arc<CuePlayer>,
    events: EventBus,
}

impl LightingEngine {
    /// Build an engine with the frame sink described by `config`
    pub fn new(config: EngineConfig, show: Arc<dyn ShowData>) -> Result<Self> {
        let sink = Transmitter::sink_from_config(&config)?;
        Ok(Self::with_sink(config, show, sink))
    }

    /// Build an engine sending frames to `sink`
    pub fn with_sink(config: EngineConfig, show: Arc<dyn ShowData>, sink: Arc<dyn FrameSink>) -> Self {
        let universes = Arc::new(UniverseStore::new(config.universe_count));
        let transmitter = Arc::new(Transmitter::new(
            universes.clone(),
            sink,
            config.refresh_interval(),
        ));
        let fades = Arc::new(FadeEngine::new(
            universes.clone(),
            config.fade_tick_interval(),
        ));
        let events = EventBus::new(config.event_capacity);
        let player = Arc::new(CuePlayer::new(
            show.clone(),
            fades.clone(),
            events.clone(),
            config.progress_interval(),
        ));

        Self {
            config,
            show,
            universes,
            transmitter,
            fades,
            player,
            events,
        }
    }

    /// Start the transmitter and fade ticks
    pub fn start(&self) {
        self.fades.start();
        self.transmitter.start();
        info!(
            "Lighting engine running: {} universes at {} Hz",
            self.config.universe_count, self.config.refresh_rate_hz
        );
    }

    /// Stop playback and black out the rig
    ///
    /// Lists stop first so no follow timer fires into a stopped fade engine;
    /// the transmitter goes last and sends the final all-zero frames.
    pub async fn shutdown(&self) {
        let stopped = self.player.stop_all_cue_lists();
        if stopped > 0 {
            info!("Stopped {} cue lists", stopped);
        }
        self.fades.stop().await;
        self.transmitter.shutdown().await;
        info!("Lighting engine shut down");
    }

    /// Manual override of one channel
    ///
    /// Clamps to 0-255 and takes the channel away from any running fade.
    pub fn set_channel_value(&self, universe: u16, channel: u16, value: i64) -> Result<()> {
        let address = ChannelAddress::new(universe, channel);
        if !self.universes.contains(address) {
            return Err(Error::InvalidInput(format!(
                "channel {} is outside the configured {} universes",
                address,
                self.universes.universe_count()
            )));
        }
        self.fades.release_channels(&[address]);
        self.universes.set_channel(universe, channel, value);
        Ok(())
    }

    pub fn get_universe_output(&self, universe: u16) -> Result<UniverseData> {
        self.universes.get_universe(universe).ok_or_else(|| {
            Error::InvalidInput(format!(
                "universe {} is not configured (1..={})",
                universe,
                self.universes.universe_count()
            ))
        })
    }

    pub fn get_all_universe_outputs(&self) -> Vec<(u16, UniverseData)> {
        self.universes.snapshot()
    }

    pub fn fade_to_scene(
        &self,
        targets: &[ChannelTarget],
        duration_secs: f64,
        transition_id: &str,
        easing: Option<EasingCurve>,
    ) -> Result<()> {
        self.fades
            .fade_to_scene(targets, duration_secs, transition_id, easing)
    }

    /// Fade to a stored scene under transition id `scene:<id>`
    pub fn play_scene(
        &self,
        scene_id: Uuid,
        duration_secs: f64,
        easing: Option<EasingCurve>,
    ) -> Result<()> {
        let scene = self
            .show
            .scene(scene_id)
            .ok_or_else(|| Error::NotFound(format!("scene {}", scene_id)))?;
        let targets = resolve_scene(&scene, self.show.as_ref())?;
        self.fades.fade_to_scene(
            &targets,
            duration_secs,
            &scene_transition_id(scene_id),
            easing,
        )?;
        info!("Playing scene '{}' over {:.2}s", scene.name, duration_secs);
        Ok(())
    }

    /// Stop every cue list and fade everything to black
    ///
    /// Lists stop first so no pending follow timer can bring a cue back up
    /// once the fade has started.
    pub fn fade_to_black(&self, duration_secs: f64) -> Result<()> {
        if !duration_secs.is_finite() || duration_secs < 0.0 {
            return Err(Error::InvalidInput(format!(
                "fade duration must be a non-negative number of seconds, got {}",
                duration_secs
            )));
        }

        let stopped = self.player.stop_all_cue_lists();
        if stopped > 0 {
            info!("Stopped {} cue lists for fade to black", stopped);
        }
        self.fades.fade_to_black(duration_secs)
    }

    /// [`LightingEngine::fade_to_black`] plus a `Blackout` event
    pub fn blackout(&self, duration_secs: f64) -> Result<()> {
        self.fade_to_black(duration_secs)?;
        self.events.emit_lossy(LightingEvent::Blackout {
            duration_secs,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    pub fn start_cue_list(&self, cue_list_id: Uuid, start_index: Option<i64>) -> Result<()> {
        self.player.start_cue_list(cue_list_id, start_index)
    }

    /// Stop a cue list. A list that is not playing is not an error.
    pub fn stop_cue_list(&self, cue_list_id: Uuid) -> Result<()> {
        self.player.stop_cue_list(cue_list_id);
        Ok(())
    }

    pub fn stop_all_cue_lists(&self) -> usize {
        self.player.stop_all_cue_lists()
    }

    pub fn jump_to_cue(&self, cue_list_id: Uuid, index: i64) -> Result<()> {
        self.player.jump_to_cue(cue_list_id, index)
    }

    pub fn next_cue(&self, cue_list_id: Uuid) -> Result<()> {
        self.player.next_cue(cue_list_id)
    }

    pub fn previous_cue(&self, cue_list_id: Uuid) -> Result<()> {
        self.player.previous_cue(cue_list_id)
    }

    /// Status of a cue list; idle when it has never been started or was stopped
    pub fn get_playback_status(&self, cue_list_id: Uuid) -> PlaybackStatus {
        self.player
            .get_playback_status(cue_list_id)
            .unwrap_or_else(|| PlaybackStatus::idle(cue_list_id))
    }

    pub fn all_playback_statuses(&self) -> Vec<PlaybackStatus> {
        self.player.all_playback_statuses()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LightingEvent> {
        self.events.subscribe()
    }

    pub fn subscribe_cue_list(&self, cue_list_id: Uuid) -> CueListSubscription {
        self.events.subscribe_cue_list(cue_list_id)
    }

    pub fn transmitter_stats(&self) -> TransmitterStats {
        self.transmitter.stats()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn universes(&self) -> &Arc<UniverseStore> {
        &self.universes
    }

    pub fn fades(&self) -> &Arc<FadeEngine> {
        &self.fades
    }

    pub fn transmitter(&self) -> &Arc<Transmitter> {
        &self.transmitter
    }
}
