//! Narration engine: the word-by-word playback scheduler.
//!
//! The engine owns one authoritative [`PlaybackState`] plus the current word
//! index, and drives the injected [`SpeechSynthesizer`] one word at a time.
//! Commands (`play`, `pause`, `jump_to`, `stop`, `load_text`) are synchronous
//! transitions on that state; the speaking itself happens on a single tokio
//! task per run.
//!
//! Every command that starts or ends a run cancels the synthesizer, bumps the
//! run generation and aborts the previous task. A run checks its generation
//! while holding the speech turn, and the turn is held for the whole
//! utterance, so a superseded loop can neither talk over the live run nor
//! advance. Within a run, word `i + 1` is requested only after word `i` has
//! completed (or failed) and its pause has elapsed.

use crate::config::ReaderConfig;
use crate::error::{LectorError, LectorResult};
use crate::pacing::{PacingPolicy, PlaybackSpeed};
use crate::synthesizer::{SpeechOutcome, SpeechSynthesizer, Utterance};
use crate::tokenizer::WordList;
use crate::voice_directory::VoiceDirectory;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Playback state of the narration engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    /// No word active
    Idle,
    /// Speaking, or waiting between words
    Playing,
    /// Stopped on a word that will be re-spoken on resume
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Playing => write!(f, "Playing"),
            Self::Paused => write!(f, "Paused"),
        }
    }
}

/// Change notifications for presentation layers
#[derive(Debug, Clone, PartialEq)]
pub enum NarrationEvent {
    /// The playback state changed (the index may have changed with it)
    StateChanged {
        /// New state
        state: PlaybackState,
        /// Current word index
        current_index: Option<usize>,
    },
    /// The current word moved while the state stayed the same
    IndexChanged {
        /// Current word index
        current_index: Option<usize>,
    },
    /// A new word list was installed
    DocumentLoaded {
        /// Number of words in the new list
        word_count: usize,
    },
    /// The synthesizer failed on a word; narration carried on
    SynthesisFailed {
        /// Index of the word that failed
        index: usize,
        /// Failure description
        message: String,
    },
    /// A document could not be loaded; the previous one is still active
    ExtractionFailed {
        /// Failure description, suitable for showing to the user
        message: String,
    },
    /// The last word was reached
    Finished,
}

/// Point-in-time view of the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NarrationSnapshot {
    /// Playback state
    pub state: PlaybackState,
    /// Current word index
    pub current_index: Option<usize>,
    /// Number of words loaded
    pub word_count: usize,
    /// Speed the slider is set to
    pub speed: PlaybackSpeed,
    /// Synthesis failures absorbed since the engine was created
    pub synthesis_failures: u64,
}

impl NarrationSnapshot {
    /// Current index with `-1` meaning "no word active"
    #[must_use]
    pub fn current_index_signed(&self) -> i64 {
        self.current_index
            .and_then(|index| i64::try_from(index).ok())
            .unwrap_or(-1)
    }
}

#[derive(Debug)]
struct EngineState {
    words: WordList,
    playback: PlaybackState,
    current_index: Option<usize>,
    speed: PlaybackSpeed,
    run: u64,
    task: Option<JoinHandle<()>>,
    synthesis_failures: u64,
}

#[derive(Debug)]
struct EngineInner {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    runtime: Handle,
    /// Held by a run loop from its generation check until its utterance ends
    speech_turn: Arc<tokio::sync::Mutex<()>>,
    voices: VoiceDirectory,
    pacing: PacingPolicy,
    events: broadcast::Sender<NarrationEvent>,
    state: Mutex<EngineState>,
}

/// What the loop needs to speak one word
struct Step {
    index: usize,
    word: String,
    utterance: Utterance,
}

/// Word-by-word narration scheduler
#[derive(Debug, Clone)]
pub struct NarrationEngine {
    inner: Arc<EngineInner>,
}

impl NarrationEngine {
    /// Create an engine with default configuration.
    ///
    /// The engine narrates on the tokio runtime it is created in; commands
    /// may then be issued from any thread.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when called outside a tokio runtime.
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        voices: VoiceDirectory,
    ) -> LectorResult<Self> {
        let config = ReaderConfig::default();
        Self::build(synthesizer, voices, &config, PlaybackSpeed::default())
    }

    /// Create an engine with custom configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or no tokio runtime
    /// is running.
    pub fn with_config(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        voices: VoiceDirectory,
        config: &ReaderConfig,
    ) -> LectorResult<Self> {
        config.validate()?;
        let speed = config.initial_speed()?;
        Self::build(synthesizer, voices, config, speed)
    }

    fn build(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        voices: VoiceDirectory,
        config: &ReaderConfig,
        speed: PlaybackSpeed,
    ) -> LectorResult<Self> {
        let runtime = Handle::try_current().map_err(|err| {
            LectorError::configuration(format!("narration needs a tokio runtime: {err}"))
        })?;
        let (events, _) = broadcast::channel(config.event_capacity);
        Ok(Self {
            inner: Arc::new(EngineInner {
                synthesizer,
                runtime,
                speech_turn: Arc::new(tokio::sync::Mutex::new(())),
                voices,
                pacing: PacingPolicy::new(config.pacing.clone()),
                events,
                state: Mutex::new(EngineState {
                    words: WordList::empty(),
                    playback: PlaybackState::Idle,
                    current_index: None,
                    speed,
                    run: 0,
                    task: None,
                    synthesis_failures: 0,
                }),
            }),
        })
    }

    /// Subscribe to change notifications
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<NarrationEvent> {
        self.inner.events.subscribe()
    }

    /// Current state, index, word count and speed
    #[must_use]
    pub fn snapshot(&self) -> NarrationSnapshot {
        let state = self.inner.state.lock();
        NarrationSnapshot {
            state: state.playback,
            current_index: state.current_index,
            word_count: state.words.len(),
            speed: state.speed,
            synthesis_failures: state.synthesis_failures,
        }
    }

    /// Playback state
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.inner.state.lock().playback
    }

    /// Current word index, `None` when no word is active
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.inner.state.lock().current_index
    }

    /// The loaded word list
    #[must_use]
    pub fn words(&self) -> WordList {
        self.inner.state.lock().words.clone()
    }

    /// Voice directory used for every utterance
    #[must_use]
    pub fn voices(&self) -> &VoiceDirectory {
        &self.inner.voices
    }

    /// Pacing policy in use
    #[must_use]
    pub fn pacing(&self) -> &PacingPolicy {
        &self.inner.pacing
    }

    /// Start or resume narration.
    ///
    /// Resumes at the retained word (re-spoken from its start) or at the first
    /// word. Already playing is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`LectorError::InvalidCommand`] with no state change if no
    /// words are loaded. Callers may ignore it.
    pub fn play(&self) -> LectorResult<()> {
        let mut state = self.inner.state.lock();
        if state.playback == PlaybackState::Playing {
            debug!("Play ignored: already playing");
            return Ok(());
        }

        if state.words.is_empty() {
            debug!("Play ignored: no words loaded");
            return Err(LectorError::invalid_command("nothing to play"));
        }

        let index = state.current_index.unwrap_or(0);
        info!("Narration starting at word {}", index);
        self.start_run(&mut state, index);
        Ok(())
    }

    /// Pause narration, keeping the current word.
    ///
    /// The word in flight is abandoned and will be spoken again from its start
    /// on the next [`play`](Self::play). No-op unless playing.
    pub fn pause(&self) {
        let mut state = self.inner.state.lock();
        if state.playback != PlaybackState::Playing {
            debug!("Pause ignored: state is {}", state.playback);
            return;
        }

        self.halt(&mut state);
        info!("Narration paused at word {:?}", state.current_index);
        let index = state.current_index;
        self.transition(&mut state, PlaybackState::Paused, index);
    }

    /// Seek to word `index` and play from there, whatever the current state
    ///
    /// # Errors
    ///
    /// Returns [`LectorError::InvalidCommand`] with no state change if
    /// `index` is outside the word list.
    pub fn jump_to(&self, index: usize) -> LectorResult<()> {
        let mut state = self.inner.state.lock();
        if !state.words.contains_index(index) {
            debug!("Jump ignored: index {} outside {} words", index, state.words.len());
            return Err(LectorError::invalid_command(format!(
                "word {index} is outside the document ({} words)",
                state.words.len()
            )));
        }

        self.halt(&mut state);
        info!("Jumping to word {}", index);
        self.start_run(&mut state, index);
        Ok(())
    }

    /// Stop narration and clear the current word, keeping the document
    pub fn stop(&self) {
        let mut state = self.inner.state.lock();
        self.halt(&mut state);
        self.transition(&mut state, PlaybackState::Idle, None);
    }

    /// Tokenize `text` and install it as the new document.
    ///
    /// Any narration in progress is cancelled first; the engine ends up idle
    /// with no word active. Returns the number of words loaded.
    pub fn load_text(&self, text: &str) -> usize {
        self.load_words(WordList::from_text(text))
    }

    /// Install `words` as the new document; see [`load_text`](Self::load_text)
    pub fn load_words(&self, words: WordList) -> usize {
        let mut state = self.inner.state.lock();
        self.halt(&mut state);
        self.transition(&mut state, PlaybackState::Idle, None);

        let word_count = words.len();
        state.words = words;
        info!("Loaded document with {} words", word_count);
        self.emit(NarrationEvent::DocumentLoaded { word_count });
        word_count
    }

    /// Change the speed; applies from the next word
    pub fn set_speed(&self, speed: PlaybackSpeed) {
        let mut state = self.inner.state.lock();
        if state.speed != speed {
            debug!("Speed set to {}", speed);
            state.speed = speed;
        }
    }

    /// Current speed
    #[must_use]
    pub fn speed(&self) -> PlaybackSpeed {
        self.inner.state.lock().speed
    }

    /// Select a voice by id; applies from the next word
    pub fn select_voice<S: Into<String>>(&self, voice_id: S) {
        self.inner.voices.select(voice_id);
    }

    /// Report a failed document load to subscribers
    pub fn notify_extraction_failed(&self, error: &LectorError) {
        warn!("Document load failed: {}", error);
        self.emit(NarrationEvent::ExtractionFailed {
            message: error.to_string(),
        });
    }

    /// Cancel speech and retire the current run, if any
    fn halt(&self, state: &mut EngineState) {
        self.inner.synthesizer.cancel_in_flight();
        state.run = state.run.wrapping_add(1);
        if let Some(task) = state.task.take() {
            task.abort();
        }
    }

    fn start_run(&self, state: &mut EngineState, index: usize) {
        state.run = state.run.wrapping_add(1);
        if let Some(task) = state.task.take() {
            task.abort();
        }

        self.transition(state, PlaybackState::Playing, Some(index));

        let weak = Arc::downgrade(&self.inner);
        let synthesizer = Arc::clone(&self.inner.synthesizer);
        let turn = Arc::clone(&self.inner.speech_turn);
        let run = state.run;
        state.task = Some(
            self.inner
                .runtime
                .spawn(Self::run_words(weak, synthesizer, turn, run)),
        );
    }

    fn transition(&self, state: &mut EngineState, playback: PlaybackState, index: Option<usize>) {
        let state_changed = state.playback != playback;
        let index_changed = state.current_index != index;
        state.playback = playback;
        state.current_index = index;

        if state_changed {
            self.emit(NarrationEvent::StateChanged {
                state: playback,
                current_index: index,
            });
        } else if index_changed {
            self.emit(NarrationEvent::IndexChanged {
                current_index: index,
            });
        }
    }

    fn emit(&self, event: NarrationEvent) {
        // Nobody listening is fine.
        let _ = self.inner.events.send(event);
    }

    /// The word-advance loop for one run.
    ///
    /// Holds the engine only weakly so dropping the last handle ends narration.
    async fn run_words(
        engine: Weak<EngineInner>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        turn: Arc<tokio::sync::Mutex<()>>,
        run: u64,
    ) {
        loop {
            // Wait for a superseded run to let go of the device.
            let speaking = Arc::clone(&turn).lock_owned().await;

            let Some(step) = Self::upgrade(&engine).and_then(|e| e.next_step(run)) else {
                return;
            };
            let result = synthesizer.speak(&step.utterance).await;
            drop(speaking);

            let Some(pause) = Self::upgrade(&engine).and_then(|e| e.settle(run, &step, result))
            else {
                return;
            };

            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }

            let advanced = Self::upgrade(&engine).is_some_and(|e| e.advance(run, step.index));
            if !advanced {
                return;
            }
        }
    }

    fn upgrade(inner: &Weak<EngineInner>) -> Option<Self> {
        inner.upgrade().map(|inner| Self { inner })
    }

    /// Build the next utterance if `run` is still the live, playing run
    fn next_step(&self, run: u64) -> Option<Step> {
        let state = self.inner.state.lock();
        if state.run != run || state.playback != PlaybackState::Playing {
            return None;
        }

        let index = state.current_index?;
        let word = state.words.get(index)?.to_owned();
        let rate = self.inner.pacing.effective_rate(state.speed);
        let voice = self.inner.voices.selected_voice();
        debug!("Speaking word {} '{}' at rate {}", index, word, rate);

        Some(Step {
            index,
            utterance: Utterance::new(word.clone(), rate, voice),
            word,
        })
    }

    /// Account for a finished utterance and return the pause owed after it.
    ///
    /// `None` means the run was superseded while speaking; its outcome,
    /// interrupted or not, must not move the live run.
    fn settle(
        &self,
        run: u64,
        step: &Step,
        result: LectorResult<SpeechOutcome>,
    ) -> Option<std::time::Duration> {
        let mut state = self.inner.state.lock();
        if state.run != run || state.playback != PlaybackState::Playing {
            debug!("Run {} superseded while speaking word {}", run, step.index);
            return None;
        }

        match result {
            Ok(SpeechOutcome::Completed) => {}
            Ok(SpeechOutcome::Interrupted) => {
                debug!("Word {} cut short by the device", step.index);
            }
            Err(err) => {
                state.synthesis_failures += 1;
                warn!("Synthesis failed on word {}: {}", step.index, err);
                self.emit(NarrationEvent::SynthesisFailed {
                    index: step.index,
                    message: err.to_string(),
                });
            }
        }
        Some(self.inner.pacing.pause_duration(&step.word, state.speed))
    }

    /// Move past word `index`; returns whether the run should continue
    fn advance(&self, run: u64, index: usize) -> bool {
        let mut state = self.inner.state.lock();
        if state.run != run || state.playback != PlaybackState::Playing {
            return false;
        }

        let next = index + 1;
        if state.words.contains_index(next) {
            self.transition(&mut state, PlaybackState::Playing, Some(next));
            return true;
        }

        info!("Narration finished after {} words", state.words.len());
        state.task = None;
        self.emit(NarrationEvent::Finished);
        self.transition(&mut state, PlaybackState::Idle, None);
        false
    }
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        if let Some(task) = self.state.get_mut().task.take() {
            self.synthesizer.cancel_in_flight();
            task.abort();
        }
    }
}
