//! Speech synthesis device capability.
//!
//! The narration engine is the only caller of a [`SpeechSynthesizer`]. The
//! device is injected so tests (and headless hosts) can substitute
//! [`MockSynthesizer`].

use crate::error::{LectorError, LectorResult};
use crate::voice_directory::Voice;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tracing::debug;

/// One request to vocalize a single word
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    /// Text to speak
    pub text: String,
    /// Effective speech rate (1.0 = platform normal)
    pub rate: f32,
    /// Voice to speak with; `None` uses the platform default
    pub voice: Option<Voice>,
}

impl Utterance {
    /// Create a new utterance
    #[must_use]
    pub fn new<S: Into<String>>(text: S, rate: f32, voice: Option<Voice>) -> Self {
        Self {
            text: text.into(),
            rate,
            voice,
        }
    }
}

/// How a `speak` request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechOutcome {
    /// The utterance was spoken to the end
    Completed,
    /// The utterance was cut short by [`SpeechSynthesizer::cancel_in_flight`]
    Interrupted,
}

/// Platform speech synthesizer
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync + std::fmt::Debug {
    /// Speak one utterance, resolving once it completes or is cancelled.
    ///
    /// Dropping the returned future must stop the utterance.
    ///
    /// # Errors
    ///
    /// Returns a synthesis error if the device fails on this utterance.
    async fn speak(&self, utterance: &Utterance) -> LectorResult<SpeechOutcome>;

    /// Cancel whatever utterance is in flight. Takes effect before returning.
    fn cancel_in_flight(&self);

    /// Voices currently known to the platform; may be empty early on
    fn list_voices(&self) -> Vec<Voice>;

    /// Notifications fired when the platform voice list changes
    fn subscribe_voices_changed(&self) -> broadcast::Receiver<()>;
}

#[derive(Debug, Default)]
struct MockState {
    voices: Vec<Voice>,
    spoken: Vec<Utterance>,
    failing_words: HashSet<String>,
    cancel_count: usize,
    in_flight: usize,
    max_in_flight: usize,
}

/// In-memory synthesizer for tests and headless hosts.
///
/// Every utterance "plays" for a fixed duration on the tokio clock, so tests
/// running with a paused clock see deterministic timing.
#[derive(Debug)]
pub struct MockSynthesizer {
    state: Arc<Mutex<MockState>>,
    cancelled: Notify,
    voices_changed: broadcast::Sender<()>,
    utterance_duration: Duration,
}

impl Default for MockSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSynthesizer {
    /// Create a mock with no voices and a 100ms utterance duration
    #[must_use]
    pub fn new() -> Self {
        let (voices_changed, _) = broadcast::channel(8);
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            cancelled: Notify::new(),
            voices_changed,
            utterance_duration: Duration::from_millis(100),
        }
    }

    /// Create a mock that already lists `voices`
    #[must_use]
    pub fn with_voices(voices: Vec<Voice>) -> Self {
        let synth = Self::new();
        synth.state.lock().voices = voices;
        synth
    }

    /// Set how long each utterance takes
    #[must_use]
    pub const fn with_utterance_duration(mut self, duration: Duration) -> Self {
        self.utterance_duration = duration;
        self
    }

    /// Make every utterance of `word` fail
    pub fn fail_on<S: Into<String>>(&self, word: S) {
        self.state.lock().failing_words.insert(word.into());
    }

    /// Replace the voice list and fire a change notification
    pub fn set_voices(&self, voices: Vec<Voice>) {
        self.state.lock().voices = voices;
        // No receivers is fine.
        let _ = self.voices_changed.send(());
    }

    /// Every utterance requested so far, in order
    #[must_use]
    pub fn spoken(&self) -> Vec<Utterance> {
        self.state.lock().spoken.clone()
    }

    /// Text of every utterance requested so far, in order
    #[must_use]
    pub fn spoken_words(&self) -> Vec<String> {
        self.state
            .lock()
            .spoken
            .iter()
            .map(|utterance| utterance.text.clone())
            .collect()
    }

    /// Number of `cancel_in_flight` calls
    #[must_use]
    pub fn cancel_count(&self) -> usize {
        self.state.lock().cancel_count
    }

    /// Utterances currently playing
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight
    }

    /// Highest number of utterances ever playing at once
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.state.lock().max_in_flight
    }
}

/// Decrements the in-flight count even when the speaking future is dropped
struct InFlightGuard {
    state: Arc<Mutex<MockState>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.state.lock().in_flight -= 1;
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn speak(&self, utterance: &Utterance) -> LectorResult<SpeechOutcome> {
        let fails = {
            let mut state = self.state.lock();
            state.spoken.push(utterance.clone());
            state.failing_words.contains(&utterance.text)
        };

        if fails {
            debug!("Mock synthesizer failing on '{}'", utterance.text);
            return Err(LectorError::synthesis(format!(
                "mock failure on '{}'",
                utterance.text
            )));
        }

        let _guard = {
            let mut state = self.state.lock();
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            InFlightGuard {
                state: Arc::clone(&self.state),
            }
        };

        tokio::select! {
            () = tokio::time::sleep(self.utterance_duration) => Ok(SpeechOutcome::Completed),
            () = self.cancelled.notified() => Ok(SpeechOutcome::Interrupted),
        }
    }

    fn cancel_in_flight(&self) {
        self.state.lock().cancel_count += 1;
        self.cancelled.notify_waiters();
    }

    fn list_voices(&self) -> Vec<Voice> {
        self.state.lock().voices.clone()
    }

    fn subscribe_voices_changed(&self) -> broadcast::Receiver<()> {
        self.voices_changed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_speak_completes() {
        let synth = MockSynthesizer::new().with_utterance_duration(Duration::from_millis(250));
        let started = tokio::time::Instant::now();

        let outcome = synth
            .speak(&Utterance::new("hello", 1.0, None))
            .await
            .expect("mock speaks");

        assert_eq!(outcome, SpeechOutcome::Completed);
        assert_eq!(started.elapsed(), Duration::from_millis(250));
        assert_eq!(synth.spoken_words(), ["hello"]);
        assert_eq!(synth.in_flight(), 0);
        assert_eq!(synth.max_in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts() {
        let synth = Arc::new(MockSynthesizer::new().with_utterance_duration(Duration::from_secs(60)));

        let speaker = {
            let synth = Arc::clone(&synth);
            tokio::spawn(async move { synth.speak(&Utterance::new("long", 1.0, None)).await })
        };

        while synth.in_flight() == 0 {
            tokio::task::yield_now().await;
        }
        synth.cancel_in_flight();

        let outcome = speaker.await.expect("task joins").expect("mock speaks");
        assert_eq!(outcome, SpeechOutcome::Interrupted);
        assert_eq!(synth.cancel_count(), 1);
        assert_eq!(synth.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let synth = MockSynthesizer::new();
        synth.fail_on("glitch");

        let result = synth.speak(&Utterance::new("glitch", 1.0, None)).await;
        assert!(matches!(result, Err(LectorError::SynthesisError { .. })));
        assert_eq!(synth.spoken_words(), ["glitch"]);
        assert_eq!(synth.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_voice_change_notification() {
        let synth = MockSynthesizer::new();
        let mut changes = synth.subscribe_voices_changed();
        assert!(synth.list_voices().is_empty());

        synth.set_voices(vec![Voice::new("urn:a", "A", "en-US")]);

        changes.recv().await.expect("notification");
        assert_eq!(synth.list_voices().len(), 1);
    }
}
