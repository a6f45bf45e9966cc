//! Cue playback state machine
//!
//! One [`PlaybackStatus`] per cue list, `Idle` until a cue is started. Starting
//! a cue hands its scene to the fade engine under the list's transition id and
//! arms two timers: a progress ticker that republishes fade progress on its own
//! clock, and either an auto-advance timer (`fade_in + follow`) or a
//! fade-complete timer (`fade_in`).
//!
//! Every start or stop bumps a generation number. Timer tasks carry the
//! generation they were armed for and do nothing once it is stale, so an
//! aborted timer that already woke up cannot act on newer playback.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use cuelight_common::{Cue, CueList, EventBus, LightingEvent, PlaybackStatus};
use parking_lot::Mutex;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::navigation::{next_index, previous_index, validate_index};
use super::timers::ListTimers;
use crate::addressing::resolve_scene;
use crate::error::{Error, Result};
use crate::fade::FadeEngine;
use crate::show::ShowData;

/// Fade engine transition id used for a cue list's cues
pub fn cue_list_transition_id(cue_list_id: Uuid) -> String {
    format!("cuelist:{}", cue_list_id)
}

struct ListPlayback {
    status: PlaybackStatus,
    generation: u64,
    timers: ListTimers,
}

/// Sequences cues for any number of cue lists
pub struct CuePlayer {
    show: Arc<dyn ShowData>,
    fades: Arc<FadeEngine>,
    events: EventBus,
    progress_interval: Duration,
    lists: Mutex<HashMap<Uuid, ListPlayback>>,
    generations: AtomicU64,
}

impl CuePlayer {
    pub fn new(
        show: Arc<dyn ShowData>,
        fades: Arc<FadeEngine>,
        events: EventBus,
        progress_interval: Duration,
    ) -> Self {
        Self {
            show,
            fades,
            events,
            progress_interval,
            lists: Mutex::new(HashMap::new()),
            generations: AtomicU64::new(0),
        }
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn load_cue_list(&self, cue_list_id: Uuid) -> Result<CueList> {
        self.show
            .cue_list(cue_list_id)
            .ok_or_else(|| Error::NotFound(format!("cue list {}", cue_list_id)))
    }

    fn current_index(&self, cue_list_id: Uuid) -> Option<usize> {
        self.lists
            .lock()
            .get(&cue_list_id)
            .and_then(|list| list.status.current_cue_index)
    }

    /// Start playing `cue` as entry `index` of the list
    ///
    /// The scene is resolved and the fade scheduled before anything else
    /// changes, so a failure leaves the list exactly as it was.
    pub fn start_cue(self: &Arc<Self>, cue_list_id: Uuid, index: usize, cue: Cue) -> Result<()> {
        self.start_cue_if(cue_list_id, index, cue, None)
    }

    /// `start_cue`, skipped when `expected_generation` is no longer current
    fn start_cue_if(
        self: &Arc<Self>,
        cue_list_id: Uuid,
        index: usize,
        cue: Cue,
        expected_generation: Option<u64>,
    ) -> Result<()> {
        let scene = self.show.scene(cue.scene_id).ok_or_else(|| {
            Error::NotFound(format!("scene {} for cue {}", cue.scene_id, cue.cue_number))
        })?;
        let targets = resolve_scene(&scene, self.show.as_ref())?;

        let mut lists = self.lists.lock();

        if let Some(expected) = expected_generation {
            let current = lists.get(&cue_list_id).map(|l| l.generation);
            if current != Some(expected) {
                debug!("Cue list {} changed before follow fired, skipping", cue_list_id);
                return Ok(());
            }
        }

        self.fades.fade_to_scene(
            &targets,
            cue.fade_in_time,
            &cue_list_transition_id(cue_list_id),
            Some(cue.easing),
        )?;

        let generation = self.next_generation();
        let fade_in = cue.fade_in_time;
        let follow = cue.effective_follow_time();

        let status = PlaybackStatus {
            cue_list_id,
            current_cue_index: Some(index),
            current_cue: Some(cue.clone()),
            is_playing: true,
            fade_progress: 0.0,
            last_updated: Utc::now(),
        };

        let timers = ListTimers {
            follow: Some(self.arm_follow_timer(cue_list_id, generation, fade_in, follow)),
            progress: (fade_in > 0.0)
                .then(|| self.arm_progress_timer(cue_list_id, generation, index, fade_in)),
        };

        let entry = lists.entry(cue_list_id).or_insert_with(|| ListPlayback {
            status: PlaybackStatus::idle(cue_list_id),
            generation,
            timers: ListTimers::default(),
        });
        entry.timers.cancel();
        entry.timers = timers;
        entry.generation = generation;
        entry.status = status.clone();

        info!(
            "Cue list {}: GO cue {} (index {}, fade {:.2}s{})",
            cue_list_id,
            cue.cue_number,
            index,
            fade_in,
            follow
                .map(|f| format!(", follow {:.2}s", f))
                .unwrap_or_default()
        );

        self.events.emit_lossy(LightingEvent::PlaybackStateChanged {
            cue_list_id,
            status,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    fn arm_progress_timer(
        self: &Arc<Self>,
        cue_list_id: Uuid,
        generation: u64,
        cue_index: usize,
        fade_in: f64,
    ) -> tokio::task::JoinHandle<()> {
        let player: Weak<Self> = Arc::downgrade(self);
        let period = self.progress_interval;

        tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(player) = player.upgrade() else {
                    return;
                };
                let progress = (started.elapsed().as_secs_f64() / fade_in).clamp(0.0, 1.0);
                if !player.publish_progress(cue_list_id, generation, cue_index, progress)
                    || progress >= 1.0
                {
                    return;
                }
            }
        })
    }

    fn arm_follow_timer(
        self: &Arc<Self>,
        cue_list_id: Uuid,
        generation: u64,
        fade_in: f64,
        follow: Option<f64>,
    ) -> tokio::task::JoinHandle<()> {
        let player: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            match follow {
                Some(follow) => {
                    sleep(secs(fade_in + follow)).await;
                    if let Some(player) = player.upgrade() {
                        player.handle_follow(cue_list_id, generation);
                    }
                }
                None => {
                    sleep(secs(fade_in)).await;
                    if let Some(player) = player.upgrade() {
                        player.handle_fade_complete(cue_list_id, generation);
                    }
                }
            }
        })
    }

    /// Record sampled progress. Returns false once the generation is stale.
    fn publish_progress(
        &self,
        cue_list_id: Uuid,
        generation: u64,
        cue_index: usize,
        fade_progress: f64,
    ) -> bool {
        let mut lists = self.lists.lock();
        let Some(list) = lists.get_mut(&cue_list_id) else {
            return false;
        };
        if list.generation != generation {
            return false;
        }

        list.status.fade_progress = fade_progress;
        list.status.last_updated = Utc::now();

        self.events.emit_lossy(LightingEvent::CueProgress {
            cue_list_id,
            cue_index,
            fade_progress,
            timestamp: Utc::now(),
        });
        true
    }

    fn handle_fade_complete(&self, cue_list_id: Uuid, generation: u64) {
        let mut lists = self.lists.lock();
        let Some(list) = lists.get_mut(&cue_list_id) else {
            return;
        };
        if list.generation != generation {
            return;
        }

        list.status.is_playing = false;
        list.status.fade_progress = 1.0;
        list.status.last_updated = Utc::now();
        debug!("Cue list {}: fade complete", cue_list_id);

        self.events.emit_lossy(LightingEvent::PlaybackStateChanged {
            cue_list_id,
            status: list.status.clone(),
            timestamp: Utc::now(),
        });
    }

    /// Auto-advance after a follow delay
    ///
    /// Any failure stops the list; nothing propagates out of a timer.
    fn handle_follow(self: &Arc<Self>, cue_list_id: Uuid, generation: u64) {
        let current = {
            let lists = self.lists.lock();
            match lists.get(&cue_list_id) {
                Some(list) if list.generation == generation => list.status.current_cue_index,
                _ => return,
            }
        };

        let Some(current) = current else {
            return;
        };

        let cue_list = match self.load_cue_list(cue_list_id) {
            Ok(cue_list) => cue_list,
            Err(e) => {
                warn!("Follow on cue list {} failed: {}", cue_list_id, e);
                self.stop_if_current(cue_list_id, generation);
                return;
            }
        };

        let next = current + 1;
        let Some(cue) = cue_list.get(next).cloned() else {
            self.finish_list(cue_list_id, generation);
            return;
        };

        if let Err(e) = self.start_cue_if(cue_list_id, next, cue, Some(generation)) {
            warn!(
                "Follow to cue index {} on cue list {} failed, stopping: {}",
                next, cue_list_id, e
            );
            self.stop_if_current(cue_list_id, generation);
        }
    }

    /// Last cue followed with nothing after it: back to `Idle`, leaving the
    /// final look on stage
    fn finish_list(&self, cue_list_id: Uuid, generation: u64) {
        let mut lists = self.lists.lock();
        let Some(list) = lists.get_mut(&cue_list_id) else {
            return;
        };
        if list.generation != generation {
            return;
        }

        list.timers.cancel();
        list.status.is_playing = false;
        list.status.fade_progress = 1.0;
        list.status.last_updated = Utc::now();
        info!("Cue list {}: reached end of list", cue_list_id);

        self.events.emit_lossy(LightingEvent::PlaybackStateChanged {
            cue_list_id,
            status: list.status.clone(),
            timestamp: Utc::now(),
        });
    }

    fn stop_if_current(&self, cue_list_id: Uuid, generation: u64) {
        let current = self.lists.lock().get(&cue_list_id).map(|l| l.generation);
        if current == Some(generation) {
            self.stop_cue_list(cue_list_id);
        }
    }

    /// Start a cue list at `start_index` (default 0)
    pub fn start_cue_list(self: &Arc<Self>, cue_list_id: Uuid, start_index: Option<i64>) -> Result<()> {
        let cue_list = self.load_cue_list(cue_list_id)?;
        if cue_list.is_empty() {
            return Err(Error::InvalidInput(format!(
                "cue list '{}' has no cues",
                cue_list.name
            )));
        }
        let index = validate_index(start_index.unwrap_or(0), cue_list.len())?;
        let cue = cue_list.cues[index].clone();
        self.start_cue(cue_list_id, index, cue)
    }

    /// Go to an arbitrary cue
    pub fn jump_to_cue(self: &Arc<Self>, cue_list_id: Uuid, index: i64) -> Result<()> {
        let cue_list = self.load_cue_list(cue_list_id)?;
        let index = validate_index(index, cue_list.len())?;
        let cue = cue_list.cues[index].clone();
        self.start_cue(cue_list_id, index, cue)
    }

    pub fn next_cue(self: &Arc<Self>, cue_list_id: Uuid) -> Result<()> {
        let current = self
            .current_index(cue_list_id)
            .ok_or(Error::NoActivePlayback(cue_list_id))?;
        let cue_list = self.load_cue_list(cue_list_id)?;
        let index = next_index(current, cue_list.len())?;
        let cue = cue_list.cues[index].clone();
        self.start_cue(cue_list_id, index, cue)
    }

    pub fn previous_cue(self: &Arc<Self>, cue_list_id: Uuid) -> Result<()> {
        let current = self
            .current_index(cue_list_id)
            .ok_or(Error::NoActivePlayback(cue_list_id))?;
        let cue_list = self.load_cue_list(cue_list_id)?;
        let index = previous_index(current)?;
        let cue = cue_list
            .get(index)
            .cloned()
            .ok_or(Error::InvalidCueIndex {
                index: index as i64,
                count: cue_list.len(),
            })?;
        self.start_cue(cue_list_id, index, cue)
    }

    /// Stop a cue list: cancel its timers and clear its playback state
    ///
    /// Lighting stays as it is. Returns false when the list had no state.
    pub fn stop_cue_list(&self, cue_list_id: Uuid) -> bool {
        let Some(mut list) = self.lists.lock().remove(&cue_list_id) else {
            return false;
        };
        list.timers.cancel();
        // Stale timers compare against the removed entry and find nothing
        self.next_generation();

        info!("Cue list {}: stopped", cue_list_id);
        self.events.emit_lossy(LightingEvent::PlaybackStateChanged {
            cue_list_id,
            status: PlaybackStatus::idle(cue_list_id),
            timestamp: Utc::now(),
        });
        true
    }

    /// Stop every list with playback state. Returns how many were stopped.
    pub fn stop_all_cue_lists(&self) -> usize {
        let ids: Vec<Uuid> = self.lists.lock().keys().copied().collect();
        ids.into_iter()
            .filter(|id| self.stop_cue_list(*id))
            .count()
    }

    /// Current status, `None` when the list is idle with no state
    pub fn get_playback_status(&self, cue_list_id: Uuid) -> Option<PlaybackStatus> {
        self.lists
            .lock()
            .get(&cue_list_id)
            .map(|list| list.status.clone())
    }

    pub fn all_playback_statuses(&self) -> Vec<PlaybackStatus> {
        self.lists
            .lock()
            .values()
            .map(|list| list.status.clone())
            .collect()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }
}

fn secs(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or(Duration::MAX)
}
