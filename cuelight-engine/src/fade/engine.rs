//! Fade engine
//!
//! Owns every in-flight transition and samples them at a fixed tick, writing
//! the interpolated values into the universe store. Ownership is tracked per
//! channel: scheduling a transition takes over exactly the channels it lists,
//! starting each one from the value it had at that instant, while the older
//! transition keeps animating the rest of its channels.
//!
//! Lock order is fade state first, then the universe store.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use cuelight_common::EasingCurve;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, trace};

use super::transition::{ChannelFade, Transition};
use crate::dmx::{ChannelAddress, ChannelTarget, UniverseStore};
use crate::error::{Error, Result};

/// Transition id used by [`FadeEngine::fade_to_black`]
pub const BLACKOUT_TRANSITION_ID: &str = "blackout";

/// Completed transitions whose final progress stays readable
pub const COMPLETED_PROGRESS_LIMIT: usize = 64;

#[derive(Default)]
struct FadeState {
    /// In-flight transitions by id
    transitions: HashMap<String, Transition>,
    /// Which transition currently drives each channel
    owners: HashMap<ChannelAddress, String>,
    /// Last sampled progress per transition id
    progress: HashMap<String, f64>,
    /// Completed ids still in `progress`, oldest first
    completed: VecDeque<String>,
}

impl FadeState {
    /// Value a channel shows at `now`: its owner's interpolated value, or the
    /// buffer contents when no transition drives it
    fn current_value(
        &self,
        universes: &UniverseStore,
        address: ChannelAddress,
        now: Instant,
    ) -> Option<u8> {
        self.owners
            .get(&address)
            .and_then(|owner| self.transitions.get(owner))
            .and_then(|t| t.value_at(address, now))
            .or_else(|| universes.get(address))
    }

    /// Detach `address` from whichever transition owns it, dropping that
    /// transition once it owns nothing
    fn release(&mut self, address: ChannelAddress) {
        let Some(owner) = self.owners.remove(&address) else {
            return;
        };
        let emptied = match self.transitions.get_mut(&owner) {
            Some(transition) => {
                transition.channels.remove(&address);
                transition.channels.is_empty()
            }
            None => false,
        };
        if emptied {
            trace!("Transition '{}' fully superseded", owner);
            self.transitions.remove(&owner);
            self.progress.remove(&owner);
            self.forget_completed(&owner);
        }
    }

    /// Record `id` as finished at 1.0, evicting the oldest finished id past
    /// [`COMPLETED_PROGRESS_LIMIT`]
    fn mark_complete(&mut self, id: &str) {
        self.completed.retain(|done| done != id);
        self.completed.push_back(id.to_string());
        self.progress.insert(id.to_string(), 1.0);

        while self.completed.len() > COMPLETED_PROGRESS_LIMIT {
            if let Some(evicted) = self.completed.pop_front() {
                if !self.transitions.contains_key(&evicted) {
                    self.progress.remove(&evicted);
                }
            }
        }
    }

    fn forget_completed(&mut self, id: &str) {
        self.completed.retain(|done| done != id);
    }

    /// Remove transition `id` entirely, returning the values its channels
    /// show at `now` so the caller can freeze them
    fn take_transition(&mut self, id: &str, now: Instant) -> Vec<(ChannelAddress, u8)> {
        let Some(transition) = self.transitions.remove(id) else {
            return Vec::new();
        };
        for address in transition.channels.keys() {
            self.owners.remove(address);
        }
        transition.values_at(now).collect()
    }
}

/// Time-based channel interpolation
pub struct FadeEngine {
    universes: Arc<UniverseStore>,
    state: Mutex<FadeState>,
    tick_interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl FadeEngine {
    pub fn new(universes: Arc<UniverseStore>, tick_interval: Duration) -> Self {
        Self {
            universes,
            state: Mutex::new(FadeState::default()),
            tick_interval,
            task: Mutex::new(None),
        }
    }

    pub fn universes(&self) -> &Arc<UniverseStore> {
        &self.universes
    }

    /// Begin or replace transition `transition_id`
    ///
    /// Each target channel starts from the value it shows right now (mid-fade
    /// values included) and reaches its target after `duration_secs`. A zero
    /// duration writes every target before returning. Rescheduling an id that
    /// is still running freezes the old transition's remaining channels where
    /// they are.
    ///
    /// Fails before touching any channel when the duration or id is invalid.
    pub fn fade_to_scene(
        &self,
        targets: &[ChannelTarget],
        duration_secs: f64,
        transition_id: &str,
        easing: Option<EasingCurve>,
    ) -> Result<()> {
        let duration = validate_duration(duration_secs)?;
        if transition_id.is_empty() {
            return Err(Error::InvalidInput("transition id must not be empty".to_string()));
        }

        let now = Instant::now();
        let mut state = self.state.lock();
        self.schedule_locked(
            &mut state,
            targets,
            duration,
            transition_id,
            easing.unwrap_or_default(),
            now,
        );
        Ok(())
    }

    /// Fade every channel of every universe to 0 and cancel all other
    /// transitions
    pub fn fade_to_black(&self, duration_secs: f64) -> Result<()> {
        let duration = validate_duration(duration_secs)?;

        let now = Instant::now();
        let mut state = self.state.lock();

        // Freeze everything where it is before dropping the transitions
        let ids: Vec<String> = state.transitions.keys().cloned().collect();
        let mut frozen = Vec::new();
        for id in &ids {
            frozen.extend(state.take_transition(id, now));
        }
        state.owners.clear();
        state.progress.clear();
        state.completed.clear();
        self.universes.write_batch(frozen);

        if !ids.is_empty() {
            debug!("Blackout cancelled {} transitions", ids.len());
        }

        let targets: Vec<ChannelTarget> = self
            .universes
            .addresses()
            .into_iter()
            .map(|address| ChannelTarget { address, value: 0 })
            .collect();

        self.schedule_locked(
            &mut state,
            &targets,
            duration,
            BLACKOUT_TRANSITION_ID,
            EasingCurve::Linear,
            now,
        );
        info!("Fading to black over {:.2}s", duration.as_secs_f64());
        Ok(())
    }

    fn schedule_locked(
        &self,
        state: &mut FadeState,
        targets: &[ChannelTarget],
        duration: Duration,
        transition_id: &str,
        curve: EasingCurve,
        now: Instant,
    ) {
        // Starting values are sampled before any ownership changes
        let mut transition = Transition::new(transition_id.to_string(), now, duration, curve);
        for target in targets {
            match state.current_value(&self.universes, target.address, now) {
                Some(from) => {
                    transition.channels.insert(
                        target.address,
                        ChannelFade {
                            from,
                            to: target.value,
                        },
                    );
                }
                None => trace!("Ignoring fade target on unpatched channel {}", target.address),
            }
        }

        let frozen = state.take_transition(transition_id, now);
        let frozen: Vec<(ChannelAddress, u8)> = frozen
            .into_iter()
            .filter(|(address, _)| !transition.channels.contains_key(address))
            .collect();

        for address in transition.channels.keys() {
            state.release(*address);
        }

        if duration.is_zero() || transition.channels.is_empty() {
            let writes = frozen.into_iter().chain(
                transition
                    .channels
                    .iter()
                    .map(|(address, fade)| (*address, fade.to)),
            );
            self.universes.write_batch(writes);
            state.mark_complete(transition_id);
            debug!(
                "Snapped {} channels for '{}'",
                transition.channels.len(),
                transition_id
            );
            return;
        }

        let writes = frozen.into_iter().chain(
            transition
                .channels
                .iter()
                .map(|(address, fade)| (*address, fade.from)),
        );
        self.universes.write_batch(writes);

        for address in transition.channels.keys() {
            state.owners.insert(*address, transition_id.to_string());
        }
        state.forget_completed(transition_id);
        state.progress.insert(transition_id.to_string(), 0.0);
        debug!(
            "Scheduled '{}': {} channels over {:.2}s ({})",
            transition_id,
            transition.channels.len(),
            duration.as_secs_f64(),
            curve
        );
        state.transitions.insert(transition_id.to_string(), transition);
    }

    /// Sample every transition at `now` and write the results
    ///
    /// Completed transitions write their targets and are removed; their
    /// progress stays readable at 1.0. Returns the number of channels written.
    pub fn advance(&self, now: Instant) -> usize {
        let mut state = self.state.lock();
        if state.transitions.is_empty() {
            return 0;
        }

        let mut writes = Vec::new();
        let mut completed = Vec::new();
        let mut sampled = Vec::with_capacity(state.transitions.len());

        for (id, transition) in &state.transitions {
            let progress = transition.progress_at(now);
            writes.extend(transition.values_at(now));
            sampled.push((id.clone(), progress));
            if progress >= 1.0 {
                completed.push(id.clone());
            }
        }

        for (id, progress) in sampled {
            state.progress.insert(id, progress);
        }
        for id in completed {
            state.take_transition(&id, now);
            state.mark_complete(&id);
            debug!("Transition '{}' complete", id);
        }

        self.universes.write_batch(writes)
    }

    /// One tick at the current time
    pub fn tick(&self) -> usize {
        self.advance(Instant::now())
    }

    /// Progress of a transition in [0, 1], as of the last tick
    ///
    /// Only the most recent [`COMPLETED_PROGRESS_LIMIT`] completed
    /// transitions are remembered; older ids report `None`.
    pub fn progress(&self, transition_id: &str) -> Option<f64> {
        self.state.lock().progress.get(transition_id).copied()
    }

    pub fn is_active(&self, transition_id: &str) -> bool {
        self.state.lock().transitions.contains_key(transition_id)
    }

    /// Number of ids with readable progress, running or completed
    pub fn tracked_progress_count(&self) -> usize {
        self.state.lock().progress.len()
    }

    pub fn active_transition_count(&self) -> usize {
        self.state.lock().transitions.len()
    }

    /// Transition currently driving `address`
    pub fn owner_of(&self, address: ChannelAddress) -> Option<String> {
        self.state.lock().owners.get(&address).cloned()
    }

    /// Stop a transition, leaving its channels at their current values
    ///
    /// Returns false when no such transition is running.
    pub fn cancel(&self, transition_id: &str) -> bool {
        let now = Instant::now();
        let mut state = self.state.lock();
        if !state.transitions.contains_key(transition_id) {
            return false;
        }
        let frozen = state.take_transition(transition_id, now);
        state.progress.remove(transition_id);
        state.forget_completed(transition_id);
        self.universes.write_batch(frozen);
        debug!("Cancelled transition '{}'", transition_id);
        true
    }

    /// Take channels away from whatever transition drives them, so a direct
    /// write is not overwritten on the next tick
    pub fn release_channels(&self, addresses: &[ChannelAddress]) {
        let mut state = self.state.lock();
        for address in addresses {
            state.release(*address);
        }
    }

    /// Start the interpolation tick. No-op if already running.
    pub fn start(self: &Arc<Self>) {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let engine = Arc::clone(self);
        let period = self.tick_interval;
        *task = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                engine.tick();
            }
        }));

        info!(
            "Fade engine started: tick every {:.1} ms",
            period.as_secs_f64() * 1000.0
        );
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the tick. In-flight transitions stay where they are.
    pub async fn stop(&self) {
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
            info!("Fade engine stopped");
        }
    }
}

impl Drop for FadeEngine {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}

fn validate_duration(duration_secs: f64) -> Result<Duration> {
    if !duration_secs.is_finite() || duration_secs < 0.0 {
        return Err(Error::InvalidInput(format!(
            "fade duration must be a non-negative number of seconds, got {}",
            duration_secs
        )));
    }
    Duration::try_from_secs_f64(duration_secs)
        .map_err(|e| Error::InvalidInput(format!("fade duration {}: {}", duration_secs, e)))
}
