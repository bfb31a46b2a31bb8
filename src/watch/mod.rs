pub mod stability;

pub use stability::{
    wait_until_stable, FileProbe, FsProbe, Probe, StabilityOutcome, StabilitySettings,
    StabilityState,
};

use crate::pipeline::{is_relocated, FilePipeline, PipelineOutcome};
use anyhow::{Context, Result};
use droplift_common::paths::{has_extension, is_hidden};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const EVENT_QUEUE_CAPACITY: usize = 100;

/// Watches a directory and hands every new file to a [`FilePipeline`].
#[derive(Debug)]
pub struct FileWatcher {
    pipeline: FilePipeline,
    in_flight: Arc<Mutex<HashSet<PathBuf>>>,
}

/// Creation, or a rename into the watched tree.
fn is_new_file_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To))
    )
}

impl FileWatcher {
    pub fn new(pipeline: FilePipeline) -> Self {
        Self {
            pipeline,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Whether a created path should be picked up.
    ///
    /// Hidden files, other extensions, directories and files already moved
    /// into the destination tree are ignored.
    pub fn should_process(&self, path: &Path) -> bool {
        let watch = &self.pipeline.config().watch;
        if watch.ignore_hidden && is_hidden(path) {
            return false;
        }
        if !has_extension(path, &watch.extensions) {
            return false;
        }
        if path.is_dir() {
            return false;
        }
        !is_relocated(&self.pipeline.destination_root(), path)
    }

    /// Watch until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let watch = &self.pipeline.config().watch;
        if !watch.enabled {
            tracing::info!("File watcher is disabled");
            return Ok(());
        }
        let Some(path) = watch.path.clone() else {
            anyhow::bail!("watch.path is not set");
        };

        let (event_tx, mut event_rx) = mpsc::channel::<PathBuf>(EVENT_QUEUE_CAPACITY);

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) if is_new_file_event(&event.kind) => {
                    for path in event.paths {
                        if event_tx.blocking_send(path).is_err() {
                            break;
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Watch error: {}", e),
            },
            notify::Config::default(),
        )
        .context("Failed to create file watcher")?;

        let mode = if watch.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(&path, mode)
            .with_context(|| format!("Failed to watch path: {:?}", path))?;
        tracing::info!("Watching directory: {:?}", path);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = event_rx.recv() => match received {
                    Some(path) => self.dispatch(path, &cancel),
                    None => break,
                },
            }
        }

        drop(watcher);
        tracing::info!("File watcher stopped");
        Ok(())
    }

    /// Spawn a task for `path` unless one is already running.
    fn dispatch(&self, path: PathBuf, cancel: &CancellationToken) {
        if !self.should_process(&path) {
            tracing::trace!(file = %path.display(), "Ignoring path");
            return;
        }
        if !self.in_flight.lock().insert(path.clone()) {
            tracing::trace!(file = %path.display(), "Already processing");
            return;
        }
        tracing::debug!(file = %path.display(), "New file");

        let pipeline = self.pipeline.clone();
        let child = cancel.child_token();
        let task_path = path.clone();
        let handle =
            tokio::spawn(async move { pipeline.process(&task_path, &child).await });

        let in_flight = self.in_flight.clone();
        tokio::spawn(async move {
            match handle.await {
                Ok(PipelineOutcome::Uploaded { path: dest, result }) if result.is_success() => {
                    tracing::debug!(file = %dest.display(), url = %result.url, "Pipeline finished");
                }
                Ok(PipelineOutcome::Uploaded { path: dest, result }) => {
                    tracing::debug!(
                        file = %dest.display(),
                        errors = result.errors.len(),
                        "Pipeline finished with errors"
                    );
                }
                Ok(_) => {}
                Err(e) if e.is_panic() => {
                    tracing::error!(file = %path.display(), "File task panicked: {}", e);
                }
                Err(e) => {
                    tracing::error!(file = %path.display(), "File task failed: {}", e);
                }
            }
            in_flight.lock().remove(&path);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::upload::UploadService;
    use notify::event::CreateKind;

    fn watcher(config: Config) -> FileWatcher {
        let config = Arc::new(config);
        FileWatcher::new(FilePipeline::new(config.clone(), UploadService::new(config)))
    }

    #[test]
    fn test_event_kinds() {
        assert!(is_new_file_event(&EventKind::Create(CreateKind::File)));
        assert!(is_new_file_event(&EventKind::Modify(ModifyKind::Name(
            RenameMode::To
        ))));
        assert!(!is_new_file_event(&EventKind::Modify(ModifyKind::Name(
            RenameMode::From
        ))));
        assert!(!is_new_file_event(&EventKind::Remove(
            notify::event::RemoveKind::File
        )));
    }

    #[test]
    fn test_should_process_filters() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.watch.path = Some(dir.path().to_path_buf());
        config.watch.extensions = vec!["png".into()];
        let w = watcher(config);

        assert!(w.should_process(&dir.path().join("shot.png")));
        assert!(w.should_process(&dir.path().join("shot.PNG")));
        assert!(!w.should_process(&dir.path().join(".shot.png")));
        assert!(!w.should_process(&dir.path().join("notes.txt")));
        assert!(!w.should_process(&dir.path().join("2024/2024-03/shot.png")));
    }

    #[test]
    fn test_hidden_files_allowed_when_configured() {
        let mut config = Config::default();
        config.watch.ignore_hidden = false;
        let w = watcher(config);
        assert!(w.should_process(Path::new("/tmp/nowhere/.shot.png")));
    }

    #[tokio::test]
    async fn test_run_without_path_fails() {
        let w = watcher(Config::default());
        assert!(w.run(CancellationToken::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_disabled_returns_immediately() {
        let mut config = Config::default();
        config.watch.enabled = false;
        let w = watcher(config);
        w.run(CancellationToken::new()).await.unwrap();
    }
}
