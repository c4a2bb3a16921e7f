//! URL document loading against a local HTTP server.

use lector_core::{
    DocumentLoader, DocumentSource, LectorError, MockSynthesizer, NarrationEvent, ReaderConfig,
    ReaderSession,
};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn loader() -> DocumentLoader {
    DocumentLoader::new(&ReaderConfig::default()).expect("loader builds")
}

#[tokio::test]
async fn test_fetch_plain_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/story"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain; charset=utf-8")
                .set_body_string("Once upon a time."),
        )
        .expect(1)
        .mount(&server)
        .await;

    let text = loader()
        .load(&DocumentSource::url(format!("{}/story", server.uri())))
        .await
        .expect("document fetched");
    assert_eq!(text, "Once upon a time.");
}

#[tokio::test]
async fn test_content_type_falls_back_to_extension() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notes.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"from the path".to_vec()))
        .mount(&server)
        .await;

    let text = loader()
        .load(&DocumentSource::url(format!("{}/notes.txt?v=2", server.uri())))
        .await
        .unwrap();
    assert_eq!(text, "from the path");
}

#[tokio::test]
async fn test_http_error_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = loader()
        .load(&DocumentSource::url(format!("{}/missing.txt", server.uri())))
        .await
        .unwrap_err();
    assert!(matches!(err, LectorError::NetworkError { .. }));
    assert!(err.is_user_error());
}

#[tokio::test]
async fn test_oversized_download_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain")
                .set_body_string("this body is far too long"),
        )
        .mount(&server)
        .await;

    let config = ReaderConfig {
        max_document_bytes: 8,
        ..ReaderConfig::default()
    };
    let loader = DocumentLoader::new(&config).unwrap();
    let err = loader
        .load(&DocumentSource::url(server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, LectorError::ExtractionError { .. }));
}

#[tokio::test]
async fn test_session_reports_failed_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let session = ReaderSession::new(Arc::new(MockSynthesizer::new())).unwrap();
    session
        .open(&DocumentSource::file(b"already loaded".to_vec(), "text/plain"))
        .await
        .unwrap();

    let mut events = session.engine().subscribe();
    assert!(session
        .open(&DocumentSource::url(format!("{}/doc.txt", server.uri())))
        .await
        .is_err());

    assert!(matches!(
        events.try_recv(),
        Ok(NarrationEvent::ExtractionFailed { .. })
    ));
    assert_eq!(session.engine().words().as_slice(), ["already", "loaded"]);
}
