//! Voice enumeration and selection.
//!
//! Platforms publish their voice list asynchronously: the first query may come
//! back empty and the real list arrives later with a "voices changed"
//! notification. Some platforms never send that notification, so the
//! directory fetches eagerly when attached and again on every notification.

use crate::config::DEFAULT_LANGUAGE_PREFIX;
use crate::error::{LectorError, LectorResult};
use crate::synthesizer::SpeechSynthesizer;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

/// A synthesizer voice as enumerated by the platform
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Voice {
    /// Opaque platform identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// BCP 47 language tag (e.g., "en-US", "fr-FR")
    pub language: String,
    /// Whether the platform marks this voice as its default
    pub is_default: bool,
}

impl Voice {
    /// Create a new voice
    #[must_use]
    pub fn new<I, N, L>(id: I, name: N, language: L) -> Self
    where
        I: Into<String>,
        N: Into<String>,
        L: Into<String>,
    {
        Self {
            id: id.into(),
            name: name.into(),
            language: language.into(),
            is_default: false,
        }
    }

    /// Mark the voice as the platform default
    #[must_use]
    pub fn as_platform_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Check if the language tag starts with `prefix`
    #[must_use]
    pub fn matches_language_prefix(&self, prefix: &str) -> bool {
        self.language.starts_with(prefix)
    }
}

#[derive(Debug, Default)]
struct DirectoryState {
    voices: Vec<Voice>,
    selected: Option<String>,
    chosen_by_user: bool,
}

#[derive(Debug)]
struct DirectoryInner {
    language_prefix: String,
    state: RwLock<DirectoryState>,
}

/// Available voices plus the current selection.
///
/// Until the user picks a voice, the selection follows the list: the first
/// voice whose language starts with the preferred prefix, else the first
/// voice, else nothing. Once the user picks a voice that choice is kept,
/// even if the id is not (yet) in the list.
#[derive(Debug, Clone)]
pub struct VoiceDirectory {
    inner: Arc<DirectoryInner>,
}

impl Default for VoiceDirectory {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE_PREFIX)
    }
}

impl VoiceDirectory {
    /// Create an empty directory preferring voices whose language starts with `language_prefix`
    #[must_use]
    pub fn new<S: Into<String>>(language_prefix: S) -> Self {
        Self {
            inner: Arc::new(DirectoryInner {
                language_prefix: language_prefix.into(),
                state: RwLock::new(DirectoryState::default()),
            }),
        }
    }

    /// Create a directory bound to `synthesizer`.
    ///
    /// Fetches the voice list immediately, then keeps it current by
    /// re-fetching whenever the synthesizer reports a change.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when called outside a tokio runtime.
    pub fn attach<S: Into<String>>(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        language_prefix: S,
    ) -> LectorResult<Self> {
        let runtime = Handle::try_current().map_err(|err| {
            LectorError::configuration(format!("voice watcher needs a tokio runtime: {err}"))
        })?;
        let directory = Self::new(language_prefix);

        // Subscribe before the eager fetch so a change in between is not lost.
        let mut changes = synthesizer.subscribe_voices_changed();
        directory.refresh(synthesizer.list_voices());

        let weak: Weak<DirectoryInner> = Arc::downgrade(&directory.inner);
        runtime.spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(()) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                }

                let Some(inner) = weak.upgrade() else {
                    break;
                };
                Self { inner }.refresh(synthesizer.list_voices());
            }
            debug!("Voice change watcher stopped");
        });

        Ok(directory)
    }

    /// Replace the voice list
    pub fn refresh(&self, voices: Vec<Voice>) {
        let mut state = self.inner.state.write();
        if !state.chosen_by_user {
            state.selected = default_voice(&voices, &self.inner.language_prefix)
                .map(|voice| voice.id.clone());
        }
        info!(
            "Voice list updated: {} voices, selected {:?}",
            voices.len(),
            state.selected
        );
        state.voices = voices;
    }

    /// All known voices, in platform order
    #[must_use]
    pub fn voices(&self) -> Vec<Voice> {
        self.inner.state.read().voices.clone()
    }

    /// Number of known voices
    #[must_use]
    pub fn voice_count(&self) -> usize {
        self.inner.state.read().voices.len()
    }

    /// Voices whose language starts with `prefix`
    #[must_use]
    pub fn voices_for_language(&self, prefix: &str) -> Vec<Voice> {
        self.inner
            .state
            .read()
            .voices
            .iter()
            .filter(|voice| voice.matches_language_prefix(prefix))
            .cloned()
            .collect()
    }

    /// Look up a voice by id
    ///
    /// # Errors
    ///
    /// Returns an error if no voice with that id is currently listed.
    pub fn get_voice(&self, voice_id: &str) -> LectorResult<Voice> {
        self.inner
            .state
            .read()
            .voices
            .iter()
            .find(|voice| voice.id == voice_id)
            .cloned()
            .ok_or_else(|| LectorError::voice_not_found(voice_id))
    }

    /// Id of the selected voice, whether or not it is currently listed
    #[must_use]
    pub fn selected_id(&self) -> Option<String> {
        self.inner.state.read().selected.clone()
    }

    /// The selected voice, if it is present in the current list
    #[must_use]
    pub fn selected_voice(&self) -> Option<Voice> {
        let state = self.inner.state.read();
        let selected = state.selected.as_deref()?;
        state.voices.iter().find(|voice| voice.id == selected).cloned()
    }

    /// Select a voice by id.
    ///
    /// Unknown ids are accepted; they take effect once a matching voice is listed.
    pub fn select<S: Into<String>>(&self, voice_id: S) {
        let voice_id = voice_id.into();
        let mut state = self.inner.state.write();
        if !state.voices.iter().any(|voice| voice.id == voice_id) {
            debug!("Selected voice '{}' is not listed yet", voice_id);
        }
        state.selected = Some(voice_id);
        state.chosen_by_user = true;
    }

    /// Drop the user's choice and go back to the default selection
    pub fn reset_selection(&self) {
        let mut state = self.inner.state.write();
        state.chosen_by_user = false;
        state.selected =
            default_voice(&state.voices, &self.inner.language_prefix).map(|voice| voice.id.clone());
    }
}

/// First voice matching `language_prefix`, else the first voice
fn default_voice<'a>(voices: &'a [Voice], language_prefix: &str) -> Option<&'a Voice> {
    voices
        .iter()
        .find(|voice| voice.matches_language_prefix(language_prefix))
        .or_else(|| voices.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesizer::MockSynthesizer;
    use std::time::Duration;

    fn sample_voices() -> Vec<Voice> {
        vec![
            Voice::new("urn:amelie", "Amélie", "fr-CA"),
            Voice::new("urn:daniel", "Daniel", "en-GB").as_platform_default(),
            Voice::new("urn:samantha", "Samantha", "en-US"),
        ]
    }

    #[test]
    fn test_default_prefers_english() {
        let directory = VoiceDirectory::default();
        directory.refresh(sample_voices());
        assert_eq!(directory.selected_id().as_deref(), Some("urn:daniel"));
        assert_eq!(directory.selected_voice().unwrap().name, "Daniel");
    }

    #[test]
    fn test_default_falls_back_to_first() {
        let directory = VoiceDirectory::default();
        directory.refresh(vec![
            Voice::new("urn:anna", "Anna", "de-DE"),
            Voice::new("urn:amelie", "Amélie", "fr-CA"),
        ]);
        assert_eq!(directory.selected_id().as_deref(), Some("urn:anna"));
    }

    #[test]
    fn test_empty_list_selects_nothing() {
        let directory = VoiceDirectory::default();
        directory.refresh(Vec::new());
        assert_eq!(directory.selected_id(), None);
        assert_eq!(directory.selected_voice(), None);
    }

    #[test]
    fn test_prefix_is_not_a_bare_language_match() {
        let directory = VoiceDirectory::default();
        directory.refresh(vec![
            Voice::new("urn:plain-en", "Generic", "en"),
            Voice::new("urn:us", "US", "en-US"),
        ]);
        assert_eq!(directory.selected_id().as_deref(), Some("urn:us"));
    }

    #[test]
    fn test_unknown_selection_is_kept() {
        let directory = VoiceDirectory::default();
        directory.refresh(sample_voices());

        directory.select("urn:later");
        assert_eq!(directory.selected_id().as_deref(), Some("urn:later"));
        assert_eq!(directory.selected_voice(), None);

        let mut voices = sample_voices();
        voices.push(Voice::new("urn:later", "Later", "it-IT"));
        directory.refresh(voices);
        assert_eq!(directory.selected_voice().unwrap().language, "it-IT");
    }

    #[test]
    fn test_user_choice_survives_refresh() {
        let directory = VoiceDirectory::default();
        directory.refresh(sample_voices());
        directory.select("urn:amelie");

        directory.refresh(sample_voices());
        assert_eq!(directory.selected_id().as_deref(), Some("urn:amelie"));

        directory.reset_selection();
        assert_eq!(directory.selected_id().as_deref(), Some("urn:daniel"));
    }

    #[test]
    fn test_lookup_and_filters() {
        let directory = VoiceDirectory::default();
        directory.refresh(sample_voices());

        assert_eq!(directory.voice_count(), 3);
        assert_eq!(directory.voices_for_language("en-").len(), 2);
        assert!(directory.get_voice("urn:samantha").is_ok());
        assert_eq!(
            directory.get_voice("urn:nobody"),
            Err(LectorError::voice_not_found("urn:nobody"))
        );
    }

    #[tokio::test]
    async fn test_attach_fetches_eagerly() {
        let synth = Arc::new(MockSynthesizer::with_voices(sample_voices()));
        let directory = VoiceDirectory::attach(synth, "en-").expect("inside a runtime");
        assert_eq!(directory.voice_count(), 3);
        assert_eq!(directory.selected_id().as_deref(), Some("urn:daniel"));
    }

    #[tokio::test]
    async fn test_attach_follows_voice_changes() {
        let synth = Arc::new(MockSynthesizer::new());
        let directory = VoiceDirectory::attach(synth.clone(), "en-").expect("inside a runtime");
        assert_eq!(directory.voice_count(), 0);
        assert_eq!(directory.selected_id(), None);

        synth.set_voices(sample_voices());

        for _ in 0..50 {
            if directory.voice_count() == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(directory.voice_count(), 3);
        assert_eq!(directory.selected_id().as_deref(), Some("urn:daniel"));
    }

    #[test]
    fn test_voice_serialization() {
        let voice = Voice::new("urn:daniel", "Daniel", "en-GB");
        let json = serde_json::to_string(&voice).expect("Should serialize");
        let back: Voice = serde_json::from_str(&json).expect("Should deserialize");
        assert_eq!(voice, back);
    }
}
