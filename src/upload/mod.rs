//! Upload orchestration.
//!
//! [`UploadService`] turns a file path into an [`UploadResult`]: it picks a
//! destination, builds the backend through the [`BackendRegistry`], sanitizes
//! the outgoing file name, times the backend call and folds every failure
//! into the result. Nothing here retries.

pub mod backend;
pub mod backends;
pub mod registry;

pub use backend::{UploadSource, Uploader};
pub use registry::{BackendContext, BackendFactory, BackendRegistry, Destination};

use crate::config::{self, Config, MAX_BUFFER_SIZE_POWER};
use crate::events::{EventSink, PipelineEvent};
use crate::transcode::Transcoder;
use droplift_common::paths::{
    file_name_string, remove_bidi_control_characters, replace_reserved_characters,
};
use droplift_common::{Error, ErrorList, UploadResult};
use droplift_naming::{Clock, Counters, SystemClock};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Uploads files to the configured destination.
#[derive(Clone)]
pub struct UploadService {
    config: Arc<Config>,
    registry: BackendRegistry,
    client: reqwest::Client,
    counters: Arc<Counters>,
    clock: Arc<dyn Clock>,
    word_list: Option<Arc<Vec<String>>>,
    transcoder: Option<Transcoder>,
    events: EventSink,
    cancel: CancellationToken,
}

impl std::fmt::Debug for UploadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadService")
            .field("registry", &self.registry)
            .field("transcoder", &self.transcoder)
            .finish_non_exhaustive()
    }
}

impl UploadService {
    /// Service with the built-in backends and no event sink.
    pub fn new(config: Arc<Config>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.upload.request_timeout())
            .user_agent(concat!("droplift/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout, using default: {}", e);
                reqwest::Client::new()
            });

        Self {
            transcoder: Transcoder::from_config(&config.transcode),
            word_list: config::load_word_list(&config),
            config,
            registry: BackendRegistry::builtin(),
            client,
            counters: Arc::new(Counters::new()),
            clock: Arc::new(SystemClock),
            events: EventSink::disabled(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_registry(mut self, registry: BackendRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Share counters with other renderers (the file pipeline).
    pub fn with_counters(mut self, counters: Arc<Counters>) -> Self {
        self.counters = counters;
        self
    }

    pub fn with_transcoder(mut self, transcoder: Option<Transcoder>) -> Self {
        self.transcoder = transcoder;
        self
    }

    /// Uploads observe `cancel` and abort when it fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    /// Resolve [`Destination::Auto`]: Amazon S3 when its secret is set,
    /// otherwise Imgur.
    pub fn select_destination(&self) -> Destination {
        match self.config.upload.destination {
            Destination::Auto if self.config.uploaders.amazon_s3.has_secret() => {
                Destination::AmazonS3
            }
            Destination::Auto => Destination::Imgur,
            other => other,
        }
    }

    /// Read buffer size: `2^power` KiB.
    pub fn buffer_size(&self) -> usize {
        let power = self.config.upload.buffer_size_power.min(MAX_BUFFER_SIZE_POWER);
        (1usize << power) * 1024
    }

    /// Name the file is sent under.
    pub fn outgoing_file_name(&self, name: &str) -> String {
        let name = remove_bidi_control_characters(name);
        if self.config.upload.replace_reserved_characters {
            replace_reserved_characters(&name, "_")
        } else {
            name
        }
    }

    fn backend_context(&self) -> BackendContext {
        BackendContext {
            config: self.config.clone(),
            client: self.client.clone(),
            counters: self.counters.clone(),
            clock: self.clock.clone(),
            word_list: self.word_list.clone(),
        }
    }

    /// Upload one file and report the outcome as an event.
    ///
    /// Files matching the transcode configuration are converted first; if
    /// that fails the original is uploaded.
    pub async fn upload(&self, path: &Path) -> UploadResult {
        let path = self.prepare(path).await;
        let result = self.upload_file(&path).await;
        if self.cancel.is_cancelled() {
            return result;
        }
        if result.is_success() {
            self.events
                .emit(PipelineEvent::UrlReceived {
                    path,
                    url: result.url.clone(),
                })
                .await;
        } else {
            self.events
                .emit(PipelineEvent::UploadFailed {
                    path,
                    errors: result.errors.clone(),
                })
                .await;
        }
        result
    }

    /// Upload `paths` one after another.
    ///
    /// Emits `FilesDropped` first, `UploadFailed` for each failure and
    /// finally `UrlCollectionReceived` with the URLs that were produced.
    pub async fn upload_batch(&self, paths: &[PathBuf]) -> Vec<UploadResult> {
        self.events
            .emit(PipelineEvent::FilesDropped {
                paths: paths.to_vec(),
            })
            .await;

        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            let path = self.prepare(path).await;
            let result = self.upload_file(&path).await;
            if !result.is_success() && !self.cancel.is_cancelled() {
                self.events
                    .emit(PipelineEvent::UploadFailed {
                        path,
                        errors: result.errors.clone(),
                    })
                    .await;
            }
            results.push(result);
        }

        if !self.cancel.is_cancelled() {
            let urls = results
                .iter()
                .filter(|r| r.is_success())
                .map(|r| r.url.clone())
                .collect();
            self.events
                .emit(PipelineEvent::UrlCollectionReceived { urls })
                .await;
        }
        results
    }

    /// Apply the transcode decision.
    async fn prepare(&self, path: &Path) -> PathBuf {
        match &self.transcoder {
            Some(transcoder) if transcoder.applies_to(path) => {
                match transcoder.transcode(path).await {
                    Ok(output) => output,
                    Err(e) => {
                        warn!(file = %path.display(), "Transcode failed, uploading original: {}", e);
                        path.to_path_buf()
                    }
                }
            }
            _ => path.to_path_buf(),
        }
    }

    /// Upload `path` as-is. Never fails; problems are reported inside the
    /// result.
    pub async fn upload_file(&self, path: &Path) -> UploadResult {
        let destination = self.select_destination();

        let uploader = match self.registry.build(destination, &self.backend_context()) {
            Ok(uploader) => uploader,
            Err(e) => {
                warn!(file = %path.display(), destination = %destination, "No usable backend: {}", e);
                let mut errors = ErrorList::new(format!("{} error", destination.service_name()));
                errors.add(e.to_string());
                return UploadResult::failure(errors);
            }
        };

        let mut errors = ErrorList::new(format!("{} error", uploader.service_name()));
        let file_name = self.outgoing_file_name(&file_name_string(path));

        let source = match UploadSource::open(path, file_name, self.buffer_size()).await {
            Ok(source) => source,
            Err(e) => {
                warn!(file = %path.display(), "Failed to open file for upload: {}", e);
                errors.add(e.to_string());
                return UploadResult::failure(errors);
            }
        };

        debug!(
            file = %path.display(),
            service = uploader.service_name(),
            bytes = source.len,
            "Uploading"
        );

        let started = Instant::now();
        let outcome = if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(Error::Cancelled),
                outcome = uploader.upload(source, &mut errors) => outcome,
            }
        };
        let duration = started.elapsed();

        let mut result = match outcome {
            Ok(mut result) => {
                if errors.is_empty() && !result.is_error && result.url.is_empty() {
                    errors.add("Upload finished without a URL.");
                }
                result.absorb_errors(errors);
                result
            }
            Err(e) => {
                debug!(
                    file = %path.display(),
                    class = ?e.class(),
                    retryable = e.is_retryable(),
                    "Backend call failed: {}",
                    e
                );
                errors.add(e.to_string());
                UploadResult::failure(errors)
            }
        };
        result.duration = Some(duration);

        if result.is_success() {
            info!(
                file = %path.display(),
                url = %result.url,
                elapsed_ms = duration.as_millis() as u64,
                "Upload complete"
            );
        } else {
            warn!(
                file = %path.display(),
                service = uploader.service_name(),
                "{}: {}",
                result.error_title,
                result.errors.join("; ")
            );
        }
        result
    }
}
