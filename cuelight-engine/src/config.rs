//! Configuration for the cuelight engine
//!
//! Bootstrap settings come from a TOML file (located through
//! [`cuelight_common::config::resolve_config_path`]). Every key has a built-in
//! default, so a missing file or a partial file is fine. CLI flags are applied
//! on top by the binary before [`EngineConfig::validate`] runs.

use cuelight_common::config::{load_toml, resolve_config_path, CONFIG_ENV_VAR};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Refresh rate most receivers are built around. Faster rates can violate the
/// minimum inter-packet spacing some nodes expect.
pub const DEFAULT_REFRESH_RATE_HZ: u32 = 44;

/// Highest universe id addressable by Art-Net (15-bit port-address, 1-based here)
pub const MAX_UNIVERSES: u16 = 32768;

/// Default Art-Net broadcast destination
pub const DEFAULT_BROADCAST_ADDRESS: &str = "255.255.255.255:6454";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of universes, numbered 1..=universe_count
    pub universe_count: u16,

    /// Transmitter frame rate
    ///
    /// Default: 44 Hz
    pub refresh_rate_hz: u32,

    /// When false the transmitter runs in simulation mode and opens no socket
    pub artnet_enabled: bool,

    /// Art-Net destination (`ip:port`)
    pub broadcast_address: String,

    /// Fade engine sampling rate. Raised to `refresh_rate_hz` when lower so
    /// every frame sees fresh fade values.
    pub fade_tick_hz: u32,

    /// Period of cue progress notifications
    pub progress_interval_ms: u64,

    /// Capacity of the event broadcast channel
    pub event_capacity: usize,

    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            universe_count: 1,
            refresh_rate_hz: DEFAULT_REFRESH_RATE_HZ,
            artnet_enabled: true,
            broadcast_address: DEFAULT_BROADCAST_ADDRESS.to_string(),
            fade_tick_hz: DEFAULT_REFRESH_RATE_HZ * 2,
            progress_interval_ms: 100,
            event_capacity: 256,
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the resolved config file, or defaults
    ///
    /// Does not validate; call [`EngineConfig::validate`] after applying
    /// command-line overrides.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_path, CONFIG_ENV_VAR) {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Ok(load_toml(&path)?)
            }
            None => {
                info!("No configuration file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Check ranges and normalize dependent settings
    pub fn validate(mut self) -> Result<Self> {
        if self.universe_count == 0 || self.universe_count > MAX_UNIVERSES {
            return Err(Error::Config(format!(
                "universe_count must be between 1 and {}, got {}",
                MAX_UNIVERSES, self.universe_count
            )));
        }

        if self.refresh_rate_hz == 0 {
            return Err(Error::Config("refresh_rate_hz must be at least 1".to_string()));
        }
        if self.refresh_rate_hz > DEFAULT_REFRESH_RATE_HZ {
            warn!(
                "refresh_rate_hz {} exceeds {} Hz; some receivers may drop frames",
                self.refresh_rate_hz, DEFAULT_REFRESH_RATE_HZ
            );
        }

        self.broadcast_socket_addr()?;

        if self.fade_tick_hz < self.refresh_rate_hz {
            warn!(
                "fade_tick_hz {} is below refresh_rate_hz {}, raising it",
                self.fade_tick_hz, self.refresh_rate_hz
            );
            self.fade_tick_hz = self.refresh_rate_hz;
        }

        if self.progress_interval_ms == 0 {
            return Err(Error::Config(
                "progress_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be at least 1".to_string()));
        }

        Ok(self)
    }

    /// Parsed broadcast destination
    pub fn broadcast_socket_addr(&self) -> Result<SocketAddr> {
        self.broadcast_address.parse().map_err(|e| {
            Error::Config(format!(
                "invalid broadcast_address '{}': {}",
                self.broadcast_address, e
            ))
        })
    }

    /// Time between transmitted frames
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.refresh_rate_hz.max(1) as f64)
    }

    /// Time between fade engine ticks
    pub fn fade_tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fade_tick_hz.max(1) as f64)
    }

    /// Time between cue progress notifications
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default().validate().unwrap();
        assert_eq!(config.refresh_rate_hz, 44);
        assert_eq!(config.universe_count, 1);
        assert!(config.fade_tick_hz >= config.refresh_rate_hz);
        assert_eq!(
            config.broadcast_socket_addr().unwrap(),
            "255.255.255.255:6454".parse().unwrap()
        );
    }

    #[test]
    fn test_fade_tick_raised_to_refresh_rate() {
        let config = EngineConfig {
            refresh_rate_hz: 40,
            fade_tick_hz: 10,
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(config.fade_tick_hz, 40);
    }

    #[test]
    fn test_rejects_zero_universes() {
        let err = EngineConfig {
            universe_count: 0,
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_bad_broadcast_address() {
        let err = EngineConfig {
            broadcast_address: "not-an-address".to_string(),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            universe_count = 3
            artnet_enabled = false

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.universe_count, 3);
        assert!(!config.artnet_enabled);
        assert_eq!(config.refresh_rate_hz, DEFAULT_REFRESH_RATE_HZ);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    #[serial_test::serial]
    fn test_load_from_env_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "universe_count = 4\nrefresh_rate_hz = 30").unwrap();

        std::env::set_var(CONFIG_ENV_VAR, file.path());
        let config = EngineConfig::load(None).unwrap().validate().unwrap();
        std::env::remove_var(CONFIG_ENV_VAR);

        assert_eq!(config.universe_count, 4);
        assert_eq!(config.refresh_rate_hz, 30);
        assert_eq!(config.fade_tick_hz, 88);
    }

    #[test]
    #[serial_test::serial]
    fn test_load_missing_file_is_error() {
        let err = EngineConfig::load(Some(Path::new("/nonexistent/cuelight.toml"))).unwrap_err();
        assert!(!err.is_invalid_input());
    }

    #[test]
    fn test_intervals() {
        let config = EngineConfig::default();
        let refresh = config.refresh_interval();
        assert!(refresh > Duration::from_millis(22) && refresh < Duration::from_millis(23));
        assert_eq!(config.progress_interval(), Duration::from_millis(100));
    }
}
