//! Document sources: turning an uploaded file or a URL into plain text.
//!
//! Format parsing is pluggable. Plain text is decoded here; PDF and Word
//! documents need a [`TextExtractor`] registered for them. Content types with
//! no meaning to the reader at all yield empty text.

use crate::config::ReaderConfig;
use crate::error::{LectorError, LectorResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

const PDF_MIME: &str = "application/pdf";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const PLAIN_TEXT_MIME: &str = "text/plain";

/// Document formats the reader recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// Portable Document Format
    Pdf,
    /// Word-processing XML document (`.docx`)
    Docx,
    /// Plain text
    PlainText,
    /// Anything else
    Unknown,
}

impl ContentType {
    /// Parse a MIME type, ignoring parameters such as `charset`
    #[must_use]
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            PDF_MIME => Self::Pdf,
            DOCX_MIME => Self::Docx,
            PLAIN_TEXT_MIME | "text/markdown" => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    /// Guess from a file name or URL path extension
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let file_name = path.rsplit('/').next().unwrap_or_default();
        let Some((_, extension)) = file_name.rsplit_once('.') else {
            return Self::Unknown;
        };

        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "txt" | "text" | "md" => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    /// Canonical MIME type
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Pdf => PDF_MIME,
            Self::Docx => DOCX_MIME,
            Self::PlainText => PLAIN_TEXT_MIME,
            Self::Unknown => "application/octet-stream",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// Where a document comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// An uploaded file
    File {
        /// Raw file contents
        bytes: Vec<u8>,
        /// Declared content type
        content_type: ContentType,
    },
    /// A document to fetch over HTTP(S)
    Url(String),
}

impl DocumentSource {
    /// File source with its content type parsed from a MIME string
    #[must_use]
    pub fn file(bytes: Vec<u8>, mime: &str) -> Self {
        Self::File {
            bytes,
            content_type: ContentType::from_mime(mime),
        }
    }

    /// URL source
    #[must_use]
    pub fn url<S: Into<String>>(url: S) -> Self {
        Self::Url(url.into())
    }
}

/// Converts document bytes of one format into plain text
#[async_trait]
pub trait TextExtractor: Send + Sync + fmt::Debug {
    /// Extract the readable text of `bytes`
    ///
    /// # Errors
    ///
    /// Returns an extraction error if the document cannot be parsed.
    async fn extract(&self, bytes: &[u8]) -> LectorResult<String>;
}

/// UTF-8 plain text extractor (a leading byte order mark is dropped)
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, bytes: &[u8]) -> LectorResult<String> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        Ok(std::str::from_utf8(bytes)?.to_owned())
    }
}

/// Loads documents from files or URLs and dispatches them to extractors
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    extractors: HashMap<ContentType, Arc<dyn TextExtractor>>,
    client: reqwest::Client,
    max_document_bytes: usize,
}

impl DocumentLoader {
    /// Create a loader with the built-in plain text extractor
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &ReaderConfig) -> LectorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout())
            .build()
            .map_err(|err| LectorError::configuration(format!("HTTP client: {err}")))?;

        let mut extractors: HashMap<ContentType, Arc<dyn TextExtractor>> = HashMap::new();
        extractors.insert(ContentType::PlainText, Arc::new(PlainTextExtractor));

        Ok(Self {
            extractors,
            client,
            max_document_bytes: config.max_document_bytes,
        })
    }

    /// Register (or replace) the extractor for `content_type`
    #[must_use]
    pub fn with_extractor(
        mut self,
        content_type: ContentType,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        self.extractors.insert(content_type, extractor);
        self
    }

    /// Whether documents of `content_type` can be read
    #[must_use]
    pub fn supports(&self, content_type: ContentType) -> bool {
        self.extractors.contains_key(&content_type)
    }

    /// Produce the text of a document
    ///
    /// # Errors
    ///
    /// Returns an error if fetching or extraction fails, the document is too
    /// large, or no extractor is registered for a recognized format.
    pub async fn load(&self, source: &DocumentSource) -> LectorResult<String> {
        match source {
            DocumentSource::File {
                bytes,
                content_type,
            } => self.extract(bytes, *content_type).await,
            DocumentSource::Url(url) => self.fetch(url).await,
        }
    }

    /// Extract text from bytes of a known content type
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub async fn extract(&self, bytes: &[u8], content_type: ContentType) -> LectorResult<String> {
        self.check_size(bytes.len())?;

        if content_type == ContentType::Unknown {
            debug!("Unrecognized content type, yielding empty text");
            return Ok(String::new());
        }

        let extractor = self
            .extractors
            .get(&content_type)
            .ok_or_else(|| LectorError::unsupported_content(content_type.mime()))?;

        let text = extractor.extract(bytes).await?;
        info!("Extracted {} characters from {}", text.len(), content_type);
        Ok(text)
    }

    async fn fetch(&self, url: &str) -> LectorResult<String> {
        info!("Fetching document from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()
            .map_err(|err| {
                warn!("Document fetch failed: {}", err);
                LectorError::from(err)
            })?;

        if let Some(length) = response.content_length() {
            self.check_size(usize::try_from(length).unwrap_or(usize::MAX))?;
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map_or(ContentType::Unknown, ContentType::from_mime);
        let content_type = match content_type {
            ContentType::Unknown => ContentType::from_path(response.url().path()),
            known => known,
        };

        let bytes = response.bytes().await?;
        self.extract(&bytes, content_type).await
    }

    fn check_size(&self, len: usize) -> LectorResult<()> {
        if len > self.max_document_bytes {
            return Err(LectorError::extraction(format!(
                "Document is {len} bytes, larger than the {} byte limit",
                self.max_document_bytes
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FakePdf;

    #[async_trait]
    impl TextExtractor for FakePdf {
        async fn extract(&self, bytes: &[u8]) -> LectorResult<String> {
            if bytes.starts_with(b"%PDF") {
                Ok("Text from a PDF.".to_string())
            } else {
                Err(LectorError::extraction("missing %PDF header"))
            }
        }
    }

    fn loader() -> DocumentLoader {
        DocumentLoader::new(&ReaderConfig::default()).expect("loader builds")
    }

    #[test]
    fn test_content_type_from_mime() {
        assert_eq!(ContentType::from_mime("application/pdf"), ContentType::Pdf);
        assert_eq!(ContentType::from_mime(DOCX_MIME), ContentType::Docx);
        assert_eq!(
            ContentType::from_mime("Text/Plain; charset=utf-8"),
            ContentType::PlainText
        );
        assert_eq!(ContentType::from_mime("image/png"), ContentType::Unknown);
        assert_eq!(ContentType::from_mime(""), ContentType::Unknown);
    }

    #[test]
    fn test_content_type_from_path() {
        assert_eq!(ContentType::from_path("notes.TXT"), ContentType::PlainText);
        assert_eq!(ContentType::from_path("/papers/a.pdf?dl=1"), ContentType::Pdf);
        assert_eq!(ContentType::from_path("report.docx#page=2"), ContentType::Docx);
        assert_eq!(ContentType::from_path("/v1.2/readme"), ContentType::Unknown);
        assert_eq!(ContentType::from_path("archive.zip"), ContentType::Unknown);
    }

    #[tokio::test]
    async fn test_plain_text_file() {
        let source = DocumentSource::file(b"\xEF\xBB\xBFHello,  world!\n".to_vec(), "text/plain");
        let text = loader().load(&source).await.expect("plain text loads");
        assert_eq!(text, "Hello,  world!\n");
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_extraction_error() {
        let source = DocumentSource::file(vec![0x66, 0xff, 0x6f], "text/plain");
        let err = loader().load(&source).await.unwrap_err();
        assert!(matches!(err, LectorError::ExtractionError { .. }));
    }

    #[tokio::test]
    async fn test_unknown_type_yields_empty_text() {
        let source = DocumentSource::file(vec![0x89, 0x50, 0x4e, 0x47], "image/png");
        assert_eq!(loader().load(&source).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_pdf_needs_an_extractor() {
        let source = DocumentSource::file(b"%PDF-1.7".to_vec(), "application/pdf");

        let plain = loader();
        assert!(!plain.supports(ContentType::Pdf));
        let err = plain.load(&source).await.unwrap_err();
        assert_eq!(err, LectorError::unsupported_content(PDF_MIME));

        let with_pdf = loader().with_extractor(ContentType::Pdf, Arc::new(FakePdf));
        assert_eq!(with_pdf.load(&source).await.unwrap(), "Text from a PDF.");

        let broken = DocumentSource::file(b"not a pdf".to_vec(), "application/pdf");
        assert!(with_pdf.load(&broken).await.is_err());
    }

    #[tokio::test]
    async fn test_size_limit() {
        let config = ReaderConfig {
            max_document_bytes: 4,
            ..ReaderConfig::default()
        };
        let loader = DocumentLoader::new(&config).unwrap();
        let source = DocumentSource::file(b"too long".to_vec(), "text/plain");
        assert!(loader.load(&source).await.is_err());
    }
}
