//! Notifications emitted by the pipeline.
//!
//! Events travel over a bounded [`mpsc`] channel. A full channel makes the
//! producing task wait; a dropped receiver is logged once per send and
//! otherwise ignored, so a front-end that stops listening never stalls the
//! watcher.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Event emitted by the watch/upload pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A file was uploaded and a URL produced.
    UrlReceived { path: PathBuf, url: String },
    /// A batch of files was handed to the uploader.
    FilesDropped { paths: Vec<PathBuf> },
    /// Every URL a batch produced, in input order.
    UrlCollectionReceived { urls: Vec<String> },
    /// An upload finished without a URL.
    UploadFailed { path: PathBuf, errors: Vec<String> },
}

/// Sending half of the event channel.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Option<mpsc::Sender<PipelineEvent>>,
}

impl EventSink {
    /// Create a sink and the receiver the front-end consumes.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<PipelineEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that drops every event.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub async fn emit(&self, event: PipelineEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(e) = tx.send(event).await {
            tracing::debug!(event = ?e.0, "Event receiver closed, dropping event");
        }
    }
}
