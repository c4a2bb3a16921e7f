//! Error types for the Lector narration engine.

/// Result type alias for Lector operations
pub type LectorResult<T> = Result<T, LectorError>;

/// Main error type for Lector operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LectorError {
    /// The document adapter failed to produce text
    #[error("Text extraction failed: {message}")]
    ExtractionError {
        /// Error message describing the failure
        message: String,
    },

    /// The speech device failed on a word
    #[error("Speech synthesis failed: {message}")]
    SynthesisError {
        /// Error message describing the failure
        message: String,
    },

    /// A command that cannot apply to the current playback state
    #[error("Invalid command: {message}")]
    InvalidCommand {
        /// Error message describing why the command was ignored
        message: String,
    },

    /// Voice not found error
    #[error("Voice '{voice_id}' not found")]
    VoiceNotFound {
        /// The voice ID that was not found
        voice_id: String,
    },

    /// Invalid input error
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Error message describing the invalid input
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Network or download error
    #[error("Network error: {message}")]
    NetworkError {
        /// Error message describing the network issue
        message: String,
    },

    /// Content type with no registered extractor
    #[error("Unsupported content type: {content_type}")]
    UnsupportedContent {
        /// The content type that could not be handled
        content_type: String,
    },
}

impl LectorError {
    /// Create a new extraction error
    #[must_use]
    pub fn extraction<S: Into<String>>(message: S) -> Self {
        Self::ExtractionError {
            message: message.into(),
        }
    }

    /// Create a new synthesis error
    #[must_use]
    pub fn synthesis<S: Into<String>>(message: S) -> Self {
        Self::SynthesisError {
            message: message.into(),
        }
    }

    /// Create a new invalid command error
    #[must_use]
    pub fn invalid_command<S: Into<String>>(message: S) -> Self {
        Self::InvalidCommand {
            message: message.into(),
        }
    }

    /// Create a new voice not found error
    #[must_use]
    pub fn voice_not_found<S: Into<String>>(voice_id: S) -> Self {
        Self::VoiceNotFound {
            voice_id: voice_id.into(),
        }
    }

    /// Create a new invalid input error
    #[must_use]
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    #[must_use]
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Create a new network error
    #[must_use]
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Create a new unsupported content error
    #[must_use]
    pub fn unsupported_content<S: Into<String>>(content_type: S) -> Self {
        Self::UnsupportedContent {
            content_type: content_type.into(),
        }
    }

    /// Check if this error should be shown to the user
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::ExtractionError { .. }
                | Self::NetworkError { .. }
                | Self::UnsupportedContent { .. }
                | Self::InvalidInput { .. }
                | Self::VoiceNotFound { .. }
                | Self::ConfigurationError { .. }
        )
    }

    /// Check if this error is absorbed without interrupting narration
    #[must_use]
    pub const fn is_soft_failure(&self) -> bool {
        matches!(
            self,
            Self::SynthesisError { .. } | Self::InvalidCommand { .. }
        )
    }

    /// Get the error category for logging
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::ExtractionError { .. } => "extraction",
            Self::SynthesisError { .. } => "synthesis",
            Self::InvalidCommand { .. } => "command",
            Self::VoiceNotFound { .. } => "voice",
            Self::InvalidInput { .. } => "input",
            Self::ConfigurationError { .. } => "configuration",
            Self::NetworkError { .. } => "network",
            Self::UnsupportedContent { .. } => "content",
        }
    }
}

// Convert from common error types
impl From<std::io::Error> for LectorError {
    fn from(err: std::io::Error) -> Self {
        Self::extraction(err.to_string())
    }
}

impl From<std::str::Utf8Error> for LectorError {
    fn from(err: std::str::Utf8Error) -> Self {
        Self::extraction(format!("Document is not valid UTF-8: {err}"))
    }
}

impl From<reqwest::Error> for LectorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network(format!("Request timed out: {err}"))
        } else {
            Self::network(err.to_string())
        }
    }
}

impl From<toml::de::Error> for LectorError {
    fn from(err: toml::de::Error) -> Self {
        Self::configuration(format!("Invalid TOML: {err}"))
    }
}

impl From<anyhow::Error> for LectorError {
    fn from(err: anyhow::Error) -> Self {
        Self::extraction(format!("{err:#}"))
    }
}
