//! Fixed-rate protocol transmitter
//!
//! Every tick snapshots all universes and pushes one ArtDmx frame per universe
//! through the configured [`FrameSink`]. Send failures are counted and logged,
//! never retried: the next tick carries the same data anyway.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use super::artnet::{build_artdmx_frame, FrameSink, SimulationSink, UdpFrameSink};
use super::universe::UniverseStore;
use crate::config::EngineConfig;
use crate::error::Result;

/// Transmitter counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransmitterStats {
    /// Completed transmit ticks
    pub ticks: u64,
    /// Frames handed to the sink successfully
    pub frames_sent: u64,
    /// Frames the sink rejected
    pub send_errors: u64,
}

/// Sends every universe at a fixed rate
pub struct Transmitter {
    universes: Arc<UniverseStore>,

    /// `None` once shut down
    sink: Mutex<Option<Arc<dyn FrameSink>>>,

    refresh_interval: Duration,

    ticks: AtomicU64,
    frames_sent: AtomicU64,
    send_errors: AtomicU64,

    task: Mutex<Option<JoinHandle<()>>>,
}

impl Transmitter {
    pub fn new(
        universes: Arc<UniverseStore>,
        sink: Arc<dyn FrameSink>,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            universes,
            sink: Mutex::new(Some(sink)),
            refresh_interval,
            ticks: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            send_errors: AtomicU64::new(0),
            task: Mutex::new(None),
        }
    }

    /// Build the sink described by `config`: UDP broadcast, or simulation when
    /// Art-Net output is disabled
    pub fn sink_from_config(config: &EngineConfig) -> Result<Arc<dyn FrameSink>> {
        if config.artnet_enabled {
            let sink = UdpFrameSink::bind(config.broadcast_socket_addr()?)?;
            info!("Art-Net output to {}", sink.target());
            Ok(Arc::new(sink))
        } else {
            info!("Art-Net output disabled, running in simulation mode");
            Ok(Arc::new(SimulationSink::new()))
        }
    }

    /// Send one frame per universe right now
    ///
    /// Returns the number of frames the sink accepted. Does nothing after
    /// shutdown.
    pub fn transmit_once(&self) -> usize {
        let sink = match self.sink.lock().as_ref() {
            Some(sink) => Arc::clone(sink),
            None => return 0,
        };

        let mut sent = 0;
        for (universe, data) in self.universes.snapshot() {
            let frame = build_artdmx_frame(universe, &data);
            match sink.send_frame(universe, &frame) {
                Ok(()) => sent += 1,
                Err(e) => {
                    self.send_errors.fetch_add(1, Ordering::Relaxed);
                    warn!("{} send failed for universe {}: {}", sink.name(), universe, e);
                }
            }
        }

        self.frames_sent.fetch_add(sent as u64, Ordering::Relaxed);
        self.ticks.fetch_add(1, Ordering::Relaxed);
        trace!("Transmitted {} frames", sent);
        sent
    }

    /// Start the fixed-rate loop. No-op if already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self: &Arc<Self>) {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("Transmitter already running");
            return;
        }

        let transmitter = Arc::clone(self);
        let period = self.refresh_interval;
        *task = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            // A late tick sends current data; replaying missed ticks would only burst stale frames
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                transmitter.transmit_once();
            }
        }));

        info!(
            "Transmitter started: {} universes every {:.1} ms",
            self.universes.universe_count(),
            period.as_secs_f64() * 1000.0
        );
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the loop, black out the rig and close the sink
    ///
    /// Zeroes every channel, sends one final all-zero frame per universe, then
    /// drops the network handle. Safe to call more than once.
    pub async fn shutdown(&self) {
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
        }

        if self.sink.lock().is_none() {
            return;
        }

        self.universes.blackout();
        let sent = self.transmit_once();
        self.sink.lock().take();

        info!("Transmitter shut down after final blackout ({} frames)", sent);
    }

    pub fn stats(&self) -> TransmitterStats {
        TransmitterStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }
}

impl Drop for Transmitter {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}
