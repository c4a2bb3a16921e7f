//! Reader session: the engine, voice directory and document loader wired together.

use crate::config::ReaderConfig;
use crate::document::{DocumentLoader, DocumentSource};
use crate::error::LectorResult;
use crate::narration::NarrationEngine;
use crate::synthesizer::SpeechSynthesizer;
use crate::voice_directory::VoiceDirectory;
use std::sync::Arc;
use tracing::info;

/// One reader: a synthesizer, its voices, a narration engine and a loader.
///
/// Presentation layers hold a session, render from
/// [`NarrationEngine::subscribe`] events, and send transport commands to
/// [`engine`](Self::engine).
#[derive(Debug)]
pub struct ReaderSession {
    config: ReaderConfig,
    engine: NarrationEngine,
    loader: DocumentLoader,
}

impl ReaderSession {
    /// Create a session with default configuration
    ///
    /// Narration and voice tracking run on the tokio runtime the session is
    /// created in.
    ///
    /// # Errors
    ///
    /// Returns an error outside a tokio runtime or if the document loader
    /// cannot be created.
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>) -> LectorResult<Self> {
        Self::with_config(synthesizer, ReaderConfig::default())
    }

    /// Create a session with custom configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, no tokio runtime is
    /// running, or the loader cannot be created.
    pub fn with_config(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        config: ReaderConfig,
    ) -> LectorResult<Self> {
        config.validate()?;
        info!("Creating reader session with config: {:?}", config);

        let voices = VoiceDirectory::attach(
            Arc::clone(&synthesizer),
            config.preferred_language_prefix.clone(),
        )?;
        let engine = NarrationEngine::with_config(synthesizer, voices, &config)?;
        let loader = DocumentLoader::new(&config)?;

        Ok(Self {
            config,
            engine,
            loader,
        })
    }

    /// Replace the document loader, e.g. to register PDF or DOCX extractors
    #[must_use]
    pub fn with_loader(mut self, loader: DocumentLoader) -> Self {
        self.loader = loader;
        self
    }

    /// Load a document and make it the current one.
    ///
    /// On failure subscribers get an extraction-failed event and the previous
    /// document and playback state are left untouched. Returns the number of
    /// words loaded.
    ///
    /// # Errors
    ///
    /// Returns the extraction error.
    pub async fn open(&self, source: &DocumentSource) -> LectorResult<usize> {
        match self.loader.load(source).await {
            Ok(text) => Ok(self.engine.load_text(&text)),
            Err(err) => {
                self.engine.notify_extraction_failed(&err);
                Err(err)
            }
        }
    }

    /// The narration engine
    #[must_use]
    pub const fn engine(&self) -> &NarrationEngine {
        &self.engine
    }

    /// The voice directory
    #[must_use]
    pub fn voices(&self) -> &VoiceDirectory {
        self.engine.voices()
    }

    /// The document loader
    #[must_use]
    pub const fn loader(&self) -> &DocumentLoader {
        &self.loader
    }

    /// Configuration the session was built with
    #[must_use]
    pub const fn config(&self) -> &ReaderConfig {
        &self.config
    }
}
