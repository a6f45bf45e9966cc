//! A single time-bounded interpolation over a set of channels

use std::collections::HashMap;
use std::time::Duration;

use cuelight_common::EasingCurve;
use tokio::time::Instant;

use crate::dmx::ChannelAddress;

/// Start and end value of one channel inside a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelFade {
    pub from: u8,
    pub to: u8,
}

/// Interpolate between two DMX values with already-shaped progress
///
/// Rounds to the nearest integer and never leaves 0-255, whatever the curve
/// returns.
pub fn interpolate(from: u8, to: u8, shaped: f64) -> u8 {
    let from = from as f64;
    let to = to as f64;
    let value = (from + (to - from) * shaped).round();
    if value.is_nan() {
        return from as u8;
    }
    value.clamp(0.0, 255.0) as u8
}

/// In-flight fade owned by the fade engine
///
/// `channels` only holds the channels this transition still owns; a newer
/// transition removes the channels it takes over.
#[derive(Debug, Clone)]
pub struct Transition {
    pub id: String,
    pub channels: HashMap<ChannelAddress, ChannelFade>,
    pub started_at: Instant,
    pub duration: Duration,
    pub curve: EasingCurve,
}

impl Transition {
    pub fn new(id: String, started_at: Instant, duration: Duration, curve: EasingCurve) -> Self {
        Self {
            id,
            channels: HashMap::new(),
            started_at,
            duration,
            curve,
        }
    }

    /// Linear progress in [0, 1] at `now`
    pub fn progress_at(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started_at);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    pub fn is_complete_at(&self, now: Instant) -> bool {
        self.progress_at(now) >= 1.0
    }

    /// Interpolated value of one owned channel at `now`
    pub fn value_at(&self, address: ChannelAddress, now: Instant) -> Option<u8> {
        let fade = self.channels.get(&address)?;
        let shaped = self.curve.apply(self.progress_at(now));
        Some(interpolate(fade.from, fade.to, shaped))
    }

    /// Every owned channel with its value at `now`
    pub fn values_at(&self, now: Instant) -> impl Iterator<Item = (ChannelAddress, u8)> + '_ {
        let shaped = self.curve.apply(self.progress_at(now));
        self.channels
            .iter()
            .map(move |(address, fade)| (*address, interpolate(fade.from, fade.to, shaped)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_rounds_and_clamps() {
        assert_eq!(interpolate(0, 255, 0.0), 0);
        assert_eq!(interpolate(0, 255, 1.0), 255);
        assert_eq!(interpolate(0, 255, 0.5), 128);
        assert_eq!(interpolate(200, 100, 0.5), 150);
        assert_eq!(interpolate(0, 255, 1.7), 255);
        assert_eq!(interpolate(100, 255, -0.5), 23);
        assert_eq!(interpolate(255, 0, 2.0), 0);
        assert_eq!(interpolate(42, 200, f64::NAN), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_and_values() {
        let start = Instant::now();
        let mut transition = Transition::new(
            "t".to_string(),
            start,
            Duration::from_secs(2),
            EasingCurve::Linear,
        );
        let address = ChannelAddress::new(1, 1);
        transition.channels.insert(address, ChannelFade { from: 0, to: 200 });

        assert_eq!(transition.progress_at(start), 0.0);
        assert_eq!(transition.value_at(address, start), Some(0));

        let half = start + Duration::from_secs(1);
        assert!((transition.progress_at(half) - 0.5).abs() < 1e-9);
        assert_eq!(transition.value_at(address, half), Some(100));

        let late = start + Duration::from_secs(5);
        assert_eq!(transition.progress_at(late), 1.0);
        assert!(transition.is_complete_at(late));
        assert_eq!(transition.value_at(address, late), Some(200));

        assert_eq!(transition.value_at(ChannelAddress::new(1, 2), half), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_is_complete() {
        let transition = Transition::new(
            "t".to_string(),
            Instant::now(),
            Duration::ZERO,
            EasingCurve::EaseIn,
        );
        assert_eq!(transition.progress_at(Instant::now()), 1.0);
    }
}
