//! Per-file processing: wait for the write to finish, rename into the
//! dated tree, upload.

pub mod relocate;

pub use relocate::{destination_dir, destination_path, is_relocated, relocate};

use crate::config::{self, Config};
use crate::upload::UploadService;
use crate::watch::stability::{
    wait_until_stable, FileProbe, FsProbe, StabilityOutcome, StabilitySettings,
};
use droplift_common::{Error, UploadResult};
use droplift_naming::{Clock, Counters, NameContext, NameTemplate, SystemClock};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// How processing one file ended.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// The file was moved to `path` and an upload attempted.
    Uploaded { path: PathBuf, result: UploadResult },
    /// The file never became stable; it was left in place.
    Skipped(StabilityOutcome),
    /// The file could not be moved; nothing was uploaded.
    RelocateFailed(Error),
}

/// Carries a watched file from creation to upload.
#[derive(Clone)]
pub struct FilePipeline {
    config: Arc<Config>,
    uploader: UploadService,
    settings: StabilitySettings,
    template: NameTemplate,
    probe: Arc<dyn FileProbe>,
    clock: Arc<dyn Clock>,
    counters: Arc<Counters>,
    word_list: Option<Arc<Vec<String>>>,
}

impl std::fmt::Debug for FilePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilePipeline")
            .field("settings", &self.settings)
            .field("pattern", &self.template.pattern())
            .finish_non_exhaustive()
    }
}

impl FilePipeline {
    /// The uploader is given this pipeline's clock and counters.
    pub fn new(config: Arc<Config>, uploader: UploadService) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let counters = Arc::new(Counters::new());
        Self {
            settings: StabilitySettings::from(&config.watch),
            template: NameTemplate::compile(&config.naming.pattern),
            word_list: config::load_word_list(&config),
            uploader: uploader
                .with_clock(clock.clone())
                .with_counters(counters.clone()),
            config,
            probe: Arc::new(FsProbe),
            clock,
            counters,
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn FileProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.uploader = self.uploader.with_clock(clock.clone());
        self.clock = clock;
        self
    }

    pub fn with_settings(mut self, settings: StabilitySettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn uploader(&self) -> &UploadService {
        &self.uploader
    }

    /// Root of the destination tree.
    pub fn destination_root(&self) -> PathBuf {
        self.config.destination_root()
    }

    /// Render the name template once.
    pub fn render_name(&self) -> String {
        let mut ctx = NameContext::from_clock(self.clock.as_ref(), self.counters.clone());
        if let Some(words) = &self.word_list {
            ctx = ctx.with_word_list(words.clone());
        }
        self.template.render(&mut ctx)
    }

    /// Where `source` would go right now. The dated folder follows the
    /// clock, so it is computed per file.
    pub fn plan_destination(&self, source: &Path) -> PathBuf {
        let name = self.render_name();
        destination_path(&self.destination_root(), source, &name, self.clock.now())
    }

    /// Process one newly created file.
    pub async fn process(&self, path: &Path, cancel: &CancellationToken) -> PipelineOutcome {
        let outcome = wait_until_stable(path, &self.settings, self.probe.as_ref(), cancel).await;
        match outcome {
            StabilityOutcome::Stable => {}
            StabilityOutcome::TimedOut => {
                tracing::warn!(file = %path.display(), "File did not settle in time, leaving it in place");
                return PipelineOutcome::Skipped(outcome);
            }
            StabilityOutcome::Vanished | StabilityOutcome::Cancelled => {
                tracing::debug!(file = %path.display(), ?outcome, "Skipping file");
                return PipelineOutcome::Skipped(outcome);
            }
        }

        let dest = self.plan_destination(path);
        if let Err(e) = relocate(path, &dest).await {
            tracing::warn!(
                file = %path.display(),
                dest = %dest.display(),
                "Failed to move file: {}",
                e
            );
            return PipelineOutcome::RelocateFailed(e);
        }
        tracing::info!(file = %path.display(), dest = %dest.display(), "Moved file");

        if cancel.is_cancelled() {
            return PipelineOutcome::Skipped(StabilityOutcome::Cancelled);
        }

        let result = self.uploader.upload(&dest).await;
        PipelineOutcome::Uploaded { path: dest, result }
    }
}
