//! Configuration for the Drishti daemon
//!
//! Loaded from a TOML file. Every section and key falls back to its default,
//! so a partial file (or no file at all) yields a usable configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Bearing half-range covered by the rangefinder (front hemisphere).
pub const FRONT_HEMISPHERE_DEG: f64 = 90.0;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub correlation: CorrelationConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Channel endpoints (ZeroMQ syntax, e.g. `tcp://localhost:5555`)
///
/// Inbound channels subscribe to a publisher owned by another process;
/// the tracked-objects channel is published here and any number of
/// consumers may subscribe to it.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Detection publisher to subscribe to
    pub detections_endpoint: String,
    /// Scan publisher to subscribe to
    pub scan_endpoint: String,
    /// Endpoint the tracked-objects publisher binds
    pub objects_endpoint: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            detections_endpoint: "tcp://localhost:5555".to_string(),
            scan_endpoint: "tcp://localhost:5556".to_string(),
            objects_endpoint: "tcp://*:5557".to_string(),
        }
    }
}

/// True if `endpoint` has a supported transport prefix and a non-empty address.
pub fn is_valid_endpoint(endpoint: &str) -> bool {
    ["tcp://", "ipc://", "inproc://"]
        .iter()
        .any(|prefix| endpoint.strip_prefix(prefix).is_some_and(|rest| !rest.is_empty()))
}

/// Scan indexing and detection correlation parameters
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Width of a bearing bucket in the scan index (degrees)
    pub bucket_size_deg: f64,
    /// Largest bearing error at which a scan point still matches a detection
    pub max_angle_diff_deg: f64,
    /// Returns closer than this are self-reflection noise (mm)
    pub min_valid_distance_mm: f64,
    /// Returns farther than this are unreliable (mm)
    pub max_range_mm: f64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            bucket_size_deg: 5.0,
            max_angle_diff_deg: 10.0,
            min_valid_distance_mm: 100.0,
            max_range_mm: 5000.0,
        }
    }
}

/// Object table parameters
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// EMA weight given to the newest observation, in (0, 1)
    pub smoothing_alpha: f64,
    /// Same-label observations within this bearing of a tracked object merge into it
    pub merge_bearing_threshold_deg: f64,
    /// Objects unmatched for longer than this are evicted (seconds)
    pub persistence_window_sec: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            smoothing_alpha: 0.3,
            merge_bearing_threshold_deg: 5.0,
            persistence_window_sec: 2.0,
        }
    }
}

/// Fusion loop timing
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Bounded wait on the input mailboxes per cycle (milliseconds)
    pub poll_timeout_ms: u64,
    /// Interval between statistics log lines (seconds, 0 disables)
    pub stats_interval_sec: f64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            poll_timeout_ms: 10,
            stats_interval_sec: 5.0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    ///
    /// # Example
    /// ```no_run
    /// use drishti::config::Config;
    ///
    /// let config = Config::load("drishti.toml")?;
    /// # Ok::<(), drishti::Error>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text and validate it.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every parameter against its allowed range.
    pub fn validate(&self) -> Result<()> {
        let c = &self.correlation;
        let t = &self.tracker;

        for (name, endpoint) in [
            ("network.detections_endpoint", &self.network.detections_endpoint),
            ("network.scan_endpoint", &self.network.scan_endpoint),
            ("network.objects_endpoint", &self.network.objects_endpoint),
        ] {
            if !is_valid_endpoint(endpoint) {
                return Err(Error::InvalidConfig(format!(
                    "{} is not a tcp://, ipc:// or inproc:// endpoint: {:?}",
                    name, endpoint
                )));
            }
        }

        if !(t.smoothing_alpha > 0.0 && t.smoothing_alpha < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "tracker.smoothing_alpha must be in (0, 1), got {}",
                t.smoothing_alpha
            )));
        }

        for (name, value) in [
            ("correlation.bucket_size_deg", c.bucket_size_deg),
            ("correlation.max_angle_diff_deg", c.max_angle_diff_deg),
            ("tracker.merge_bearing_threshold_deg", t.merge_bearing_threshold_deg),
            ("tracker.persistence_window_sec", t.persistence_window_sec),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        if !(c.min_valid_distance_mm > 0.0 && c.min_valid_distance_mm < c.max_range_mm)
            || !c.max_range_mm.is_finite()
        {
            return Err(Error::InvalidConfig(format!(
                "correlation range must satisfy 0 < min_valid_distance_mm ({}) < max_range_mm ({})",
                c.min_valid_distance_mm, c.max_range_mm
            )));
        }

        if self.service.poll_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "service.poll_timeout_ms must be at least 1".to_string(),
            ));
        }

        if !(self.service.stats_interval_sec >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "service.stats_interval_sec must be non-negative, got {}",
                self.service.stats_interval_sec
            )));
        }

        Ok(())
    }
}
