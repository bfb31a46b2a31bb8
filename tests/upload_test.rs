//! Backend tests against local mock HTTP servers.

mod common;

use assert_matches::assert_matches;
use common::{custom_config, custom_item, write_file};
use droplift::config::{AmazonS3Config, Config, DEFAULT_IMGUR_CLIENT_ID};
use droplift::events::{EventSink, PipelineEvent};
use droplift::upload::{Destination, UploadService};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ---------------------------------------------------------------------------
// Custom uploader
// ---------------------------------------------------------------------------

#[tokio::test]
async fn custom_uploader_multipart_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(body_string_contains("name=\"file\"; filename=\"shot.png\""))
        .and(body_string_contains("pixels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "url": "https://cdn.example.com/abc.png", "delete": "https://cdn.example.com/d/abc" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "shot.png", b"pixels");

    let service = UploadService::new(Arc::new(custom_config(custom_item(&server.uri()))));
    let result = service.upload(&file).await;

    assert!(result.is_success(), "{:?}", result.errors);
    assert_eq!(result.url, "https://cdn.example.com/abc.png");
    assert_eq!(result.deletion_url, "https://cdn.example.com/d/abc");
    assert!(result.duration.is_some());
}

#[tokio::test]
async fn custom_uploader_error_message_comes_first() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "quota exceeded" })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "shot.png", b"pixels");

    let service = UploadService::new(Arc::new(custom_config(custom_item(&server.uri()))));
    let result = service.upload(&file).await;

    assert!(!result.is_success());
    assert_eq!(
        result.errors,
        vec![
            "quota exceeded".to_string(),
            "Request failed with status 500.".to_string()
        ]
    );
    assert_eq!(result.raw_response, r#"{"error":"quota exceeded"}"#);
}

#[tokio::test]
async fn custom_uploader_renders_headers_and_arguments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header("x-api-key", "secret"))
        .and(body_string_contains("album"))
        .and(body_string_contains("holiday"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "url": "https://x.test/1" } })))
        .expect(1)
        .mount(&server)
        .await;

    let mut item = custom_item(&server.uri());
    item.headers.insert("X-Api-Key".into(), "secret".into());
    item.arguments.insert("album".into(), "{input}".into());

    let mut config = custom_config(item);
    config.upload.input = "holiday".into();

    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "shot.png", b"pixels");
    let result = UploadService::new(Arc::new(config)).upload(&file).await;
    assert_eq!(result.url, "https://x.test/1");
}

#[tokio::test]
async fn custom_uploader_non_json_response_names_host() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "shot.png", b"pixels");
    let result = UploadService::new(Arc::new(custom_config(custom_item(&server.uri()))))
        .upload(&file)
        .await;

    assert!(!result.is_success());
    assert!(result.errors[0].contains("expected response content is JSON"));
    assert!(result.errors[0].contains("127.0.0.1"));
}

// ---------------------------------------------------------------------------
// Imgur
// ---------------------------------------------------------------------------

fn imgur_config(server_uri: &str) -> Config {
    let mut config = Config::default();
    config.upload.destination = Destination::Imgur;
    config.uploaders.imgur.client_id = "abc123".into();
    config.uploaders.imgur.endpoint = format!("{server_uri}/3/image");
    config
}

#[tokio::test]
async fn imgur_upload_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/3/image"))
        .and(header("authorization", "Client-ID abc123"))
        .and(body_string_contains("name=\"image\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "status": 200,
            "data": { "link": "https://i.imgur.com/XyZ.png", "deletehash": "dh1" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "shot.png", b"pixels");
    let result = UploadService::new(Arc::new(imgur_config(&server.uri())))
        .upload(&file)
        .await;

    assert!(result.is_success(), "{:?}", result.errors);
    assert_eq!(result.url, "https://i.imgur.com/XyZ.png");
    assert_eq!(result.thumbnail_url, "https://i.imgur.com/XyZm.png");
    assert_eq!(result.deletion_url, "https://imgur.com/delete/dh1");
}

#[tokio::test]
async fn imgur_upload_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false,
            "status": 400,
            "data": { "error": "File type invalid" }
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "shot.png", b"pixels");
    let result = UploadService::new(Arc::new(imgur_config(&server.uri())))
        .upload(&file)
        .await;

    assert!(!result.is_success());
    assert_eq!(result.errors[0], "File type invalid");
}

#[tokio::test]
async fn imgur_without_client_id_uses_builtin() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/3/image"))
        .and(header(
            "authorization",
            format!("Client-ID {DEFAULT_IMGUR_CLIENT_ID}").as_str(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "link": "https://i.imgur.com/Anon.png" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.uploaders.imgur.endpoint = format!("{}/3/image", server.uri());
    let service = UploadService::new(Arc::new(config));
    assert_eq!(service.select_destination(), Destination::Imgur);

    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "shot.png", b"pixels");
    let result = service.upload(&file).await;
    assert!(result.is_success(), "{:?}", result.errors);
    assert_eq!(result.url, "https://i.imgur.com/Anon.png");
}

// ---------------------------------------------------------------------------
// Amazon S3
// ---------------------------------------------------------------------------

#[tokio::test]
async fn s3_path_style_put() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/shots/uploads/shot.png"))
        .and(header("content-type", "image/png"))
        .and(header_exists("x-amz-date"))
        .and(header_exists("authorization"))
        .and(body_string_contains("pixels"))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"d41d8cd9\""))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.upload.destination = Destination::Auto;
    config.uploaders.amazon_s3 = AmazonS3Config {
        access_key_id: "AKIDEXAMPLE".into(),
        secret_access_key: "secret".into(),
        endpoint: Some(server.uri()),
        bucket: "shots".into(),
        object_prefix: "uploads".into(),
        use_path_style: true,
        ..Default::default()
    };

    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "shot.png", b"pixels");
    let service = UploadService::new(Arc::new(config));
    assert_eq!(service.select_destination(), Destination::AmazonS3);

    let result = service.upload(&file).await;
    assert!(result.is_success(), "{:?}", result.errors);
    assert_eq!(result.url, format!("{}/shots/uploads/shot.png", server.uri()));
}

#[tokio::test]
async fn s3_public_acl_header_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/shots/shot.png"))
        .and(header("x-amz-acl", "public-read"))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"d41d8cd9\""))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.upload.destination = Destination::AmazonS3;
    config.uploaders.amazon_s3 = AmazonS3Config {
        access_key_id: "AKIDEXAMPLE".into(),
        secret_access_key: "secret".into(),
        endpoint: Some(server.uri()),
        bucket: "shots".into(),
        use_path_style: true,
        public_acl: true,
        custom_domain: Some("cdn.example.com".into()),
        ..Default::default()
    };

    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "shot.png", b"pixels");
    let result = UploadService::new(Arc::new(config)).upload(&file).await;
    assert!(result.is_success(), "{:?}", result.errors);
    assert_eq!(result.url, "https://cdn.example.com/shot.png");
}

#[tokio::test]
async fn s3_rejected_put_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(403).set_body_string(
            "<?xml version=\"1.0\"?><Error><Code>AccessDenied</Code><Message>Access Denied</Message></Error>",
        ))
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.upload.destination = Destination::AmazonS3;
    config.uploaders.amazon_s3 = AmazonS3Config {
        access_key_id: "AKIDEXAMPLE".into(),
        secret_access_key: "secret".into(),
        endpoint: Some(server.uri()),
        bucket: "shots".into(),
        use_path_style: true,
        ..Default::default()
    };

    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "shot.png", b"pixels");
    let result = UploadService::new(Arc::new(config)).upload(&file).await;
    assert!(!result.is_success());
    assert!(result.url.is_empty());
    assert!(
        result.errors[0].starts_with("Backend error [Amazon S3]"),
        "{:?}",
        result.errors
    );
}

// ---------------------------------------------------------------------------
// Batches and events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn batch_events_follow_input_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("filename=\"a.png\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "url": "https://x.test/a" } })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("filename=\"c.png\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "url": "https://x.test/c" } })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let a = write_file(dir.path(), "a.png", b"a");
    let missing = dir.path().join("b.png");
    let c = write_file(dir.path(), "c.png", b"c");
    let paths = vec![a.clone(), missing.clone(), c.clone()];

    let (events, mut rx) = EventSink::channel(16);
    let service = UploadService::new(Arc::new(custom_config(custom_item(&server.uri()))))
        .with_events(events);
    let results = service.upload_batch(&paths).await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].url, "https://x.test/a");
    assert!(!results[1].is_success());
    assert_eq!(results[2].url, "https://x.test/c");

    assert_eq!(
        rx.recv().await.unwrap(),
        PipelineEvent::FilesDropped { paths: paths.clone() }
    );
    assert_matches!(
        rx.recv().await.unwrap(),
        PipelineEvent::UploadFailed { path, .. } if path == missing
    );
    assert_eq!(
        rx.recv().await.unwrap(),
        PipelineEvent::UrlCollectionReceived {
            urls: vec!["https://x.test/a".into(), "https://x.test/c".into()]
        }
    );
}
