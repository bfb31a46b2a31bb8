//! Shared helpers for integration tests.
//!
//! Builds configurations pointing at a local mock server and fast stability
//! timings so watcher tests finish quickly.

#![allow(dead_code)]

use droplift::config::Config;
use droplift::upload::Destination;
use droplift_custom::CustomUploaderItem;
use std::path::{Path, PathBuf};

/// A multipart custom uploader posting to `<server>/upload` and reading the
/// URL from `data.url`.
pub fn custom_item(server_uri: &str) -> CustomUploaderItem {
    let mut item = CustomUploaderItem::new();
    item.name = "Mock host".into();
    item.request_url = format!("{server_uri}/upload");
    item.file_form_name = "file".into();
    item.url = "{json:data.url}".into();
    item.deletion_url = "{json:data.delete}".into();
    item.error_message = "{json:error}".into();
    item
}

/// Config that sends everything to `item`.
pub fn custom_config(item: CustomUploaderItem) -> Config {
    let mut config = Config::default();
    config.upload.destination = Destination::CustomUploader;
    config.uploaders.custom_uploader_items = vec![item];
    config.uploaders.custom_uploader_selected = 0;
    config.transcode.enabled = false;
    config
}

/// Shrink stability timings to a few milliseconds.
pub fn fast_watch(config: &mut Config, dir: &Path) {
    config.watch.path = Some(dir.to_path_buf());
    config.watch.initial_delay_ms = 20;
    config.watch.poll_interval_ms = 10;
    config.watch.required_stable_polls = 3;
    config.watch.stability_timeout_ms = 2000;
}

pub fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}
