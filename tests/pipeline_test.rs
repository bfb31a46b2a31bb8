//! End-to-end pipeline and watcher tests on temporary directories.

mod common;

use assert_matches::assert_matches;
use common::{custom_config, custom_item, fast_watch, write_file};
use droplift::events::{EventSink, PipelineEvent};
use droplift::pipeline::{FilePipeline, PipelineOutcome};
use droplift::upload::UploadService;
use droplift::watch::{FileWatcher, StabilityOutcome};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_host() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "url": "https://x.test/ok" } })),
        )
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn stable_file_is_moved_then_uploaded() {
    let server = mock_host().await;
    let dir = tempfile::tempdir().unwrap();
    let source = write_file(dir.path(), "capture.png", b"pixels");

    let mut config = custom_config(custom_item(&server.uri()));
    fast_watch(&mut config, dir.path());
    config.naming.pattern = "shot_%i".into();
    let config = Arc::new(config);

    let pipeline = FilePipeline::new(config.clone(), UploadService::new(config));
    let outcome = pipeline.process(&source, &CancellationToken::new()).await;

    let (dest, result) = assert_matches!(
        outcome,
        PipelineOutcome::Uploaded { path, result } => (path, result)
    );
    assert!(result.is_success(), "{:?}", result.errors);
    assert_eq!(result.url, "https://x.test/ok");
    assert!(!source.exists());
    assert!(dest.exists());
    assert_eq!(dest.file_name().unwrap(), "shot_1.png");

    let month = dest.parent().unwrap();
    let year = month.parent().unwrap();
    assert_eq!(year.parent().unwrap(), dir.path());
    assert!(month
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with(&*year.file_name().unwrap().to_string_lossy()));
}

#[tokio::test]
async fn vanished_file_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = custom_config(custom_item("http://127.0.0.1:9"));
    fast_watch(&mut config, dir.path());
    let config = Arc::new(config);

    let pipeline = FilePipeline::new(config.clone(), UploadService::new(config));
    let outcome = pipeline
        .process(&dir.path().join("never.png"), &CancellationToken::new())
        .await;
    assert_matches!(outcome, PipelineOutcome::Skipped(StabilityOutcome::Vanished));
}

#[tokio::test]
async fn empty_file_times_out_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_file(dir.path(), "empty.png", b"");

    let mut config = custom_config(custom_item("http://127.0.0.1:9"));
    fast_watch(&mut config, dir.path());
    config.watch.stability_timeout_ms = 100;
    let config = Arc::new(config);

    let pipeline = FilePipeline::new(config.clone(), UploadService::new(config));
    let outcome = pipeline.process(&source, &CancellationToken::new()).await;
    assert_matches!(outcome, PipelineOutcome::Skipped(StabilityOutcome::TimedOut));
    assert!(source.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn watcher_uploads_new_files() {
    let server = mock_host().await;
    let dir = tempfile::tempdir().unwrap();

    let mut config = custom_config(custom_item(&server.uri()));
    fast_watch(&mut config, dir.path());
    config.watch.extensions = vec!["png".into()];
    let config = Arc::new(config);

    let cancel = CancellationToken::new();
    let (events, mut rx) = EventSink::channel(8);
    let uploader = UploadService::new(config.clone())
        .with_events(events)
        .with_cancellation(cancel.clone());
    let watcher = FileWatcher::new(FilePipeline::new(config, uploader));

    let run_cancel = cancel.clone();
    let handle = tokio::spawn(async move { watcher.run(run_cancel).await });

    // Give the watcher time to register before writing.
    tokio::time::sleep(Duration::from_millis(200)).await;
    write_file(dir.path(), "ignored.txt", b"text");
    write_file(dir.path(), "shot.png", b"pixels");

    let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("no event within timeout")
        .unwrap();
    assert_matches!(
        event,
        PipelineEvent::UrlReceived { url, path } if url == "https://x.test/ok" && path.extension().unwrap() == "png"
    );
    assert!(dir.path().join("ignored.txt").exists());
    assert!(!dir.path().join("shot.png").exists());

    cancel.cancel();
    handle.await.unwrap().unwrap();
}
