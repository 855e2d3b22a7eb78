// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Engine Configuration Module
//!
//! Configuration is purely programmatic, but every structure can also be
//! read from a JSON document. Missing fields fall back to their defaults.

use crate::error::ConfigError;
use crate::resource::ProducerDedup;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Highest simulation rate a configuration may ask for.
pub const MAX_TICKS_PER_SECOND: f64 = 10_000.0;

/// Timing parameters for the [`LoopDriver`](crate::clock::LoopDriver).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Logical simulation rate in ticks per second. Must be positive.
    pub ticks_per_second: f64,
    /// Desired render rate, or `-1` for uncapped.
    pub desired_fps: i32,
    /// Length of the fps measurement window, in seconds.
    pub frame_check_interval: f64,
    /// Step applied to the render interval once per measurement window.
    pub correction_step: f64,
    /// Upper bound on tick debt, in seconds of simulation. Debt beyond this is dropped.
    pub max_catch_up_seconds: f64,
    /// How long the loop thread sleeps on an iteration with no work.
    pub idle_sleep_micros: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: 60.0,
            desired_fps: -1,
            frame_check_interval: 0.1,
            correction_step: 0.00005,
            max_catch_up_seconds: 1.0,
            idle_sleep_micros: 250,
        }
    }
}

impl LoopConfig {
    /// Checks the invariants the loop relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.ticks_per_second > 0.0 && self.ticks_per_second <= MAX_TICKS_PER_SECOND) {
            return Err(invalid(
                "ticks_per_second",
                "must be greater than zero and at most 10000",
            ));
        }
        if self.desired_fps == 0 || self.desired_fps < -1 {
            return Err(invalid("desired_fps", "must be positive or -1"));
        }
        if !(self.frame_check_interval > 0.0) {
            return Err(invalid("frame_check_interval", "must be greater than zero"));
        }
        if self.correction_step < 0.0 {
            return Err(invalid("correction_step", "must not be negative"));
        }
        if !(self.max_catch_up_seconds > 0.0 && self.max_catch_up_seconds.is_finite()) {
            return Err(invalid("max_catch_up_seconds", "must be finite and greater than zero"));
        }
        Ok(())
    }
}

/// Presentation surface parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Surface width in pixels.
    pub width: u32,
    /// Surface height in pixels.
    pub height: u32,
    /// How many world units span the surface width.
    pub units_wide: f32,
    /// Number of buffers in the presentation chain.
    pub buffer_count: u32,
    /// Whether the surface starts fullscreen.
    pub fullscreen: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            units_wide: 16.0,
            buffer_count: 2,
            fullscreen: false,
        }
    }
}

/// Resource loader policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// How repeated producers of the same concrete type are handled.
    pub producer_dedup: ProducerDedup,
}

/// Top-level configuration of a [`Container`](crate::container::Container).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Loop timing.
    pub timing: LoopConfig,
    /// Presentation surface.
    pub display: DisplayConfig,
    /// Resource loading policy.
    pub resources: ResourceConfig,
    /// Upper bound on how long `exit` waits for the renderer to notice.
    pub exit_timeout_ms: u64,
    /// Passed to scenes on render and enables the fps overlay.
    pub debug: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timing: LoopConfig::default(),
            display: DisplayConfig::default(),
            resources: ResourceConfig::default(),
            exit_timeout_ms: 500,
            debug: false,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        log::debug!("Reading engine config from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Checks every section for out-of-range values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timing.validate()?;
        if self.display.buffer_count == 0 {
            return Err(invalid("display.buffer_count", "must be at least 1"));
        }
        if !(self.display.units_wide > 0.0) {
            return Err(invalid("display.units_wide", "must be greater than zero"));
        }
        Ok(())
    }

    /// The exit drain timeout as a [`Duration`].
    pub fn exit_timeout(&self) -> Duration {
        Duration::from_millis(self.exit_timeout_ms)
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timing.ticks_per_second, 60.0);
        assert_eq!(config.timing.desired_fps, -1);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{ "timing": { "ticks_per_second": 30 }, "debug": true }"#)
                .unwrap();
        assert_eq!(config.timing.ticks_per_second, 30.0);
        assert_eq!(config.timing.frame_check_interval, 0.1);
        assert_eq!(config.display.width, 1280);
        assert!(config.debug);
    }

    #[test]
    fn test_rejects_non_positive_tick_rate() {
        let err = EngineConfig::from_json_str(r#"{ "timing": { "ticks_per_second": 0 } }"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "ticks_per_second",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_unbounded_tick_rate() {
        let timing = LoopConfig {
            ticks_per_second: f64::INFINITY,
            ..Default::default()
        };
        assert!(timing.validate().is_err());

        let timing = LoopConfig {
            ticks_per_second: 1.0e9,
            ..Default::default()
        };
        assert!(timing.validate().is_err());

        let timing = LoopConfig {
            max_catch_up_seconds: f64::INFINITY,
            ..Default::default()
        };
        assert!(timing.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_fps() {
        let err =
            EngineConfig::from_json_str(r#"{ "timing": { "desired_fps": 0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = EngineConfig::from_json_str("{ timing: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "display": {{ "width": 640, "height": 480 }}, "resources": {{ "producer_dedup": "allow_duplicates" }} }}"#
        )
        .unwrap();

        let config = EngineConfig::from_path(file.path()).unwrap();
        assert_eq!(config.display.width, 640);
        assert_eq!(config.display.height, 480);
        assert_eq!(
            config.resources.producer_dedup,
            ProducerDedup::AllowDuplicates
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::from_path(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
