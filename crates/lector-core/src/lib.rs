//! # Lector Core
//!
//! Word-by-word document narration with adjustable pacing.
//!
//! ## Features
//!
//! - Whitespace tokenization that keeps punctuation on its word
//! - Slow-mode pacing: the spoken rate is floored and silence is inserted
//!   between words instead, longer after sentence and clause punctuation
//! - An interruptible, resumable narration engine with jump-to-word
//! - Voice enumeration that follows the platform's asynchronous voice list
//! - Plain text and URL document loading, with pluggable PDF/DOCX extractors
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lector_core::{DocumentSource, MockSynthesizer, PlaybackSpeed, ReaderSession};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let session = ReaderSession::new(Arc::new(MockSynthesizer::new()))?;
//!     session
//!         .open(&DocumentSource::file(b"Read me slowly.".to_vec(), "text/plain"))
//!         .await?;
//!
//!     let engine = session.engine();
//!     engine.set_speed(PlaybackSpeed::new(0.2)?);
//!     engine.play()?;
//!
//!     let mut events = engine.subscribe();
//!     while let Ok(event) = events.recv().await {
//!         println!("{event:?}");
//!     }
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod document;
pub mod error;
pub mod narration;
pub mod pacing;
pub mod session;
pub mod synthesizer;
pub mod tokenizer;
pub mod voice_directory;

// Re-export main types for convenience
pub use config::{PacingConfig, ReaderConfig};
pub use document::{ContentType, DocumentLoader, DocumentSource, PlainTextExtractor, TextExtractor};
pub use error::{LectorError, LectorResult};
pub use narration::{NarrationEngine, NarrationEvent, NarrationSnapshot, PlaybackState};
pub use pacing::{Pace, PacingPolicy, PlaybackSpeed, PunctuationClass};
pub use session::ReaderSession;
pub use synthesizer::{MockSynthesizer, SpeechOutcome, SpeechSynthesizer, Utterance};
pub use tokenizer::{tokenize, WordList};
pub use voice_directory::{Voice, VoiceDirectory};

/// Version information for the lector-core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
