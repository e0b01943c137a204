//! Wire-level behavior of the reqwest transport against a mock server.

use std::sync::Arc;

use attach_cache::ThumbnailStore;
use attach_cache_memory::MemoryThumbnailStore;
use attach_client::{
    AttachmentUploader, Error, HttpTransport, StaticSession, Transport, UploaderConfig,
};
use attach_core::{UploadFile, UploadOptions};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn photo() -> UploadFile {
    UploadFile::new("photo.png", "image/png", b"\x89PNG-bytes".to_vec())
}

fn auth() -> Vec<(String, String)> {
    vec![("Authorization".to_owned(), "tok-1".to_owned())]
}

#[tokio::test]
async fn multipart_upload_sends_file_field_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/attachment-upload"))
        .and(header("Authorization", "tok-1"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("filename=\"photo.png\""))
        .and(body_string_contains("PNG-bytes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ids": ["abc123"]})))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    let body = transport
        .post_multipart("/api/v1/attachment-upload", "file", &photo(), &auth())
        .await
        .unwrap();

    assert_eq!(body["ids"][0], "abc123");
}

#[tokio::test]
async fn error_status_prefers_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/attachment-upload"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "file too large"})),
        )
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    let err = transport
        .post_multipart("/api/v1/attachment-upload", "file", &photo(), &auth())
        .await
        .unwrap_err();

    match err {
        Error::Http { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "file too large");
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
}

#[tokio::test]
async fn server_error_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = HttpTransport::new(server.uri())
        .post_multipart("/api/v1/attachment-upload", "file", &photo(), &auth())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert!(err.is_retryable());
    assert!(err.to_string().contains("maintenance"));
}

#[tokio::test]
async fn non_json_success_body_is_a_deserialization_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;

    let err = HttpTransport::new(server.uri())
        .post_multipart("/api/v1/attachment-upload", "file", &photo(), &auth())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Deserialization(_)), "{err:?}");
}

#[tokio::test]
async fn unreachable_server_is_a_connection_error() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let err = HttpTransport::new(uri)
        .get_json("/api/v1/attachment/abc/meta", &auth())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Connection(_)), "{err:?}");
    assert!(err.is_transport());
}

#[tokio::test]
async fn get_bytes_reports_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/attachment/abc123"))
        .and(header("Authorization", "tok-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/jpeg")
                .set_body_bytes(b"jpeg".to_vec()),
        )
        .mount(&server)
        .await;

    let blob = HttpTransport::new(server.uri())
        .get_bytes("/api/v1/attachment/abc123", &auth())
        .await
        .unwrap();

    assert_eq!(blob.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(&blob.data[..], b"jpeg");
}

// =========================================================================
// Uploader over HTTP
// =========================================================================

fn uploader_for(server: &MockServer, cache: Arc<dyn ThumbnailStore>) -> AttachmentUploader {
    let config = UploaderConfig {
        base_url: server.uri(),
        ..UploaderConfig::default()
    };
    AttachmentUploader::builder()
        .config(config)
        .cache(cache)
        .session(Arc::new(StaticSession::new("tok-1")))
        .build()
        .unwrap()
}

#[tokio::test]
async fn upload_without_channel_omits_routing_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/attachment-upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"files": {"0": "f00d_1"}})))
        .mount(&server)
        .await;

    let cache = Arc::new(MemoryThumbnailStore::new());
    let up = uploader_for(&server, cache.clone());
    let result = up.upload(&photo(), &UploadOptions::default()).await.unwrap();

    assert_eq!(result.attachment_id.as_str(), "id:f00d_1");
    assert!(cache.get("f00d_1").await.unwrap().is_some());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("channelid"));
    assert_eq!(
        requests[0]
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok()),
        Some("tok-1")
    );
}

#[tokio::test]
async fn upload_with_channel_sends_routing_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/attachment-upload"))
        .and(header("ChannelId", "ch-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ids": ["abc123"]})))
        .expect(1)
        .mount(&server)
        .await;

    let up = uploader_for(&server, Arc::new(MemoryThumbnailStore::new()));
    let result = up
        .upload(&photo(), &UploadOptions::channel("ch-1"))
        .await
        .unwrap();
    assert_eq!(result.attachment_id.as_str(), "id:abc123");
}

#[tokio::test]
async fn failed_upload_leaves_cache_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "token expired"})))
        .mount(&server)
        .await;

    let cache = Arc::new(MemoryThumbnailStore::new());
    let up = uploader_for(&server, cache.clone());
    let err = up.upload(&photo(), &UploadOptions::default()).await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert!(!err.is_retryable());
    assert!(cache.is_empty().await.unwrap());
}

#[tokio::test]
async fn fetch_downloads_meta_and_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/attachment/abc123/meta"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "ok",
            "item": {"id": "abc123", "filename": "cat.gif", "size": 4, "hash": "deadbeef"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/attachment/abc123"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/gif")
                .set_body_bytes(b"GIF8".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cache = Arc::new(MemoryThumbnailStore::new());
    let up = uploader_for(&server, cache.clone());

    let first = up.fetch("id:abc123").await.unwrap();
    assert_eq!(first.filename, "cat.gif");
    assert_eq!(first.mime_type, "image/gif");

    // Served from the cache; the mock expects exactly one download.
    let second = up.fetch("abc123").await.unwrap();
    assert_eq!(second.data, first.data);
}
