//! Event types for the cuelight notification bus

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::Cue;

/// Playback state of one cue list
///
/// Created lazily the first time a list is started and reset when the list is
/// stopped. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackStatus {
    pub cue_list_id: Uuid,
    /// Index of the active cue, `None` when idle
    pub current_cue_index: Option<usize>,
    /// Snapshot of the active cue as it was when started
    pub current_cue: Option<Cue>,
    /// True while the active cue is in transition (fade-in or waiting to follow)
    pub is_playing: bool,
    /// Sampled fade-in progress of the active cue (0.0-1.0)
    pub fade_progress: f64,
    pub last_updated: DateTime<Utc>,
}

impl PlaybackStatus {
    /// Idle status for a list that has never been started
    pub fn idle(cue_list_id: Uuid) -> Self {
        Self {
            cue_list_id,
            current_cue_index: None,
            current_cue: None,
            is_playing: false,
            fade_progress: 0.0,
            last_updated: Utc::now(),
        }
    }

    /// Whether the list is in the `Playing` state
    pub fn is_active(&self) -> bool {
        self.is_playing && self.current_cue_index.is_some()
    }
}

/// cuelight event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LightingEvent {
    /// Cue list state changed (cue started, fade finished, stopped)
    PlaybackStateChanged {
        cue_list_id: Uuid,
        status: PlaybackStatus,
        timestamp: DateTime<Utc>,
    },

    /// Throttled fade-in progress of a cue list's active cue
    CueProgress {
        cue_list_id: Uuid,
        cue_index: usize,
        fade_progress: f64,
        timestamp: DateTime<Utc>,
    },

    /// Global blackout requested
    Blackout {
        duration_secs: f64,
        timestamp: DateTime<Utc>,
    },
}

impl LightingEvent {
    /// Cue list this event belongs to, if any
    pub fn cue_list_id(&self) -> Option<Uuid> {
        match self {
            LightingEvent::PlaybackStateChanged { cue_list_id, .. }
            | LightingEvent::CueProgress { cue_list_id, .. } => Some(*cue_list_id),
            LightingEvent::Blackout { .. } => None,
        }
    }

    /// Event type name, as used in the serialized `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            LightingEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            LightingEvent::CueProgress { .. } => "CueProgress",
            LightingEvent::Blackout { .. } => "Blackout",
        }
    }
}

/// Event distribution bus
///
/// Wraps a tokio broadcast channel: publishing never blocks, slow subscribers
/// lag and lose the oldest events instead of stalling playback timers.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LightingEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<LightingEvent> {
        self.tx.subscribe()
    }

    /// Subscribe to the events of one cue list
    pub fn subscribe_cue_list(&self, cue_list_id: Uuid) -> CueListSubscription {
        CueListSubscription {
            cue_list_id,
            rx: self.tx.subscribe(),
        }
    }

    /// Publish an event, ignoring whether anyone is listening
    pub fn emit_lossy(&self, event: LightingEvent) {
        // No receivers is OK
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Receiver filtered to one cue list
pub struct CueListSubscription {
    cue_list_id: Uuid,
    rx: broadcast::Receiver<LightingEvent>,
}

impl CueListSubscription {
    pub fn cue_list_id(&self) -> Uuid {
        self.cue_list_id
    }

    /// Next event for this cue list, or `None` once the bus is gone
    ///
    /// Lagging skips the lost events and keeps going.
    pub async fn recv(&mut self) -> Option<LightingEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.cue_list_id() == Some(self.cue_list_id) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(
                        "Subscriber for cue list {} lagged, skipped {} events",
                        self.cue_list_id, skipped
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
