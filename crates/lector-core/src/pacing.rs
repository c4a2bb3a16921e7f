//! Pacing policy: how fast to speak a word and how long to wait after it.
//!
//! Speech engines distort or refuse very low rates, so the spoken rate never
//! drops below the slow threshold. Below that threshold the reader slows down
//! by inserting silence between words instead, and stretches that silence
//! after sentence and clause punctuation.

use crate::config::PacingConfig;
use crate::error::{LectorError, LectorResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// User-facing playback speed, in `[0.05, 1.0]` with a 0.05 step
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct PlaybackSpeed(f32);

impl PlaybackSpeed {
    /// Slowest speed the slider allows
    pub const MIN: f32 = 0.05;
    /// Fastest speed the slider allows
    pub const MAX: f32 = 1.0;
    /// Slider granularity
    pub const STEP: f32 = 0.05;

    const STEPS_PER_UNIT: f32 = 20.0;

    /// Create a speed, snapping to the nearest 0.05 step
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is not finite or its nearest step lies
    /// outside `[0.05, 1.0]`.
    pub fn new(value: f32) -> LectorResult<Self> {
        if !value.is_finite() {
            return Err(LectorError::invalid_input(format!(
                "Speed must be a finite number, got {value}"
            )));
        }

        let steps = (value * Self::STEPS_PER_UNIT).round();
        if !(1.0..=Self::STEPS_PER_UNIT).contains(&steps) {
            return Err(LectorError::invalid_input(format!(
                "Speed must be between {} and {}, got {value}",
                Self::MIN,
                Self::MAX
            )));
        }

        Ok(Self(steps / Self::STEPS_PER_UNIT))
    }

    /// The speed as a plain number
    #[must_use]
    pub const fn value(self) -> f32 {
        self.0
    }
}

impl Default for PlaybackSpeed {
    fn default() -> Self {
        Self(Self::MAX)
    }
}

impl TryFrom<f32> for PlaybackSpeed {
    type Error = LectorError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PlaybackSpeed> for f32 {
    fn from(speed: PlaybackSpeed) -> Self {
        speed.0
    }
}

impl fmt::Display for PlaybackSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}x", self.0)
    }
}

/// Kind of punctuation a word ends with, as far as pausing is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PunctuationClass {
    /// Ends with `.`, `!` or `?`
    Sentence,
    /// Ends with `,`, `;` or `:`
    Clause,
    /// Anything else
    None,
}

impl PunctuationClass {
    /// Classify a word by its final character only
    #[must_use]
    pub fn of(word: &str) -> Self {
        match word.chars().next_back() {
            Some('.' | '!' | '?') => Self::Sentence,
            Some(',' | ';' | ':') => Self::Clause,
            _ => Self::None,
        }
    }
}

/// Rate and trailing pause for one word
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pace {
    /// Rate handed to the synthesizer
    pub rate: f32,
    /// Silence inserted after the utterance completes
    pub pause: Duration,
}

/// Maps (speed, word) to an effective rate and an inter-word pause
#[derive(Debug, Clone, PartialEq)]
pub struct PacingPolicy {
    config: PacingConfig,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self::new(PacingConfig::default())
    }
}

impl PacingPolicy {
    /// Create a policy from pacing constants
    #[must_use]
    pub const fn new(config: PacingConfig) -> Self {
        Self { config }
    }

    /// Pacing constants in use
    #[must_use]
    pub const fn config(&self) -> &PacingConfig {
        &self.config
    }

    /// Whether `speed` is below the slow threshold
    #[must_use]
    pub fn is_slow_mode(&self, speed: PlaybackSpeed) -> bool {
        speed.value() < self.config.slow_threshold
    }

    /// Spoken rate: the speed itself, floored at the slow threshold
    #[must_use]
    pub fn effective_rate(&self, speed: PlaybackSpeed) -> f32 {
        if self.is_slow_mode(speed) {
            self.config.slow_threshold
        } else {
            speed.value()
        }
    }

    /// Silence to insert after `word` at `speed`
    #[must_use]
    pub fn pause_duration(&self, word: &str, speed: PlaybackSpeed) -> Duration {
        if !self.is_slow_mode(speed) {
            return Duration::ZERO;
        }

        let base_ms = f64::from(self.config.slow_threshold - speed.value())
            * f64::from(self.config.base_pause_ms);
        let multiplier = match PunctuationClass::of(word) {
            PunctuationClass::Sentence => self.config.sentence_multiplier,
            PunctuationClass::Clause => self.config.clause_multiplier,
            PunctuationClass::None => 1,
        };

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let millis = (base_ms * f64::from(multiplier)).round().max(0.0) as u64;
        Duration::from_millis(millis)
    }

    /// Rate and pause for `word` at `speed`
    #[must_use]
    pub fn pace(&self, word: &str, speed: PlaybackSpeed) -> Pace {
        Pace {
            rate: self.effective_rate(speed),
            pause: self.pause_duration(word, speed),
        }
    }
}
