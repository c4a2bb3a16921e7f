//! Reader configuration.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration. The defaults are the pacing constants the reader has always
//! used: a 0.4 rate floor, 3000 ms of base pause per unit of speed below it,
//! and 3x / 2x stretching after sentence and clause punctuation.

use crate::error::{LectorError, LectorResult};
use crate::pacing::PlaybackSpeed;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default slow-mode threshold and effective rate floor
pub const DEFAULT_SLOW_THRESHOLD: f32 = 0.4;

/// Default base pause, in milliseconds per unit of speed below the threshold
pub const DEFAULT_BASE_PAUSE_MS: f32 = 3000.0;

/// Default language prefix used to pick the initial voice
pub const DEFAULT_LANGUAGE_PREFIX: &str = "en-";

/// Pacing constants used by [`crate::pacing::PacingPolicy`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Speed below which slow mode applies; also the effective rate floor
    pub slow_threshold: f32,
    /// Base pause in milliseconds, scaled by the distance below the threshold
    pub base_pause_ms: f32,
    /// Pause multiplier after `.`, `!` or `?`
    pub sentence_multiplier: u32,
    /// Pause multiplier after `,`, `;` or `:`
    pub clause_multiplier: u32,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            slow_threshold: DEFAULT_SLOW_THRESHOLD,
            base_pause_ms: DEFAULT_BASE_PAUSE_MS,
            sentence_multiplier: 3,
            clause_multiplier: 2,
        }
    }
}

impl PacingConfig {
    /// Validate pacing constants
    ///
    /// # Errors
    ///
    /// Returns an error if the threshold is outside the speed range, the base
    /// pause is negative, or a multiplier is zero.
    pub fn validate(&self) -> LectorResult<()> {
        let range = PlaybackSpeed::MIN..=PlaybackSpeed::MAX;
        if !self.slow_threshold.is_finite() || !range.contains(&self.slow_threshold) {
            return Err(LectorError::configuration(format!(
                "slow_threshold must be between {} and {}, got {}",
                PlaybackSpeed::MIN,
                PlaybackSpeed::MAX,
                self.slow_threshold
            )));
        }

        if !self.base_pause_ms.is_finite() || self.base_pause_ms < 0.0 {
            return Err(LectorError::configuration(format!(
                "base_pause_ms must be a non-negative number, got {}",
                self.base_pause_ms
            )));
        }

        if self.sentence_multiplier == 0 || self.clause_multiplier == 0 {
            return Err(LectorError::configuration(
                "pause multipliers must be at least 1",
            ));
        }

        Ok(())
    }
}

/// Top-level reader configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Pacing constants
    pub pacing: PacingConfig,
    /// Speed the slider starts at
    pub initial_speed: f32,
    /// Language tag prefix preferred when picking the default voice
    pub preferred_language_prefix: String,
    /// Timeout for fetching a document by URL
    pub fetch_timeout_secs: u64,
    /// Largest document body accepted, in bytes
    pub max_document_bytes: usize,
    /// Capacity of the narration event channel
    pub event_capacity: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            pacing: PacingConfig::default(),
            initial_speed: PlaybackSpeed::MAX,
            preferred_language_prefix: DEFAULT_LANGUAGE_PREFIX.to_string(),
            fetch_timeout_secs: 30,
            max_document_bytes: 20 * 1024 * 1024,
            event_capacity: 64,
        }
    }
}

impl ReaderConfig {
    /// Parse and validate a configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a value is out of range.
    pub fn from_toml_str(source: &str) -> LectorResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn from_file<P: AsRef<Path>>(path: P) -> LectorResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|err| {
            LectorError::configuration(format!("Failed to read {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value.
    pub fn validate(&self) -> LectorResult<()> {
        self.pacing.validate()?;
        self.initial_speed()?;

        if self.fetch_timeout_secs == 0 {
            return Err(LectorError::configuration(
                "fetch_timeout_secs must be greater than 0",
            ));
        }

        if self.max_document_bytes == 0 {
            return Err(LectorError::configuration(
                "max_document_bytes must be greater than 0",
            ));
        }

        if self.event_capacity == 0 {
            return Err(LectorError::configuration(
                "event_capacity must be greater than 0",
            ));
        }

        Ok(())
    }

    /// The configured initial speed as a validated [`PlaybackSpeed`]
    ///
    /// # Errors
    ///
    /// Returns an error if `initial_speed` is outside the slider range.
    pub fn initial_speed(&self) -> LectorResult<PlaybackSpeed> {
        PlaybackSpeed::new(self.initial_speed)
            .map_err(|err| LectorError::configuration(format!("initial_speed: {err}")))
    }

    /// Fetch timeout as a [`Duration`]
    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
