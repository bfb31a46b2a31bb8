//! Deciding when a freshly created file has finished being written.
//!
//! There is no portable "writer closed the file" signal, so the file is
//! polled: it counts as written once a run of consecutive polls sees it
//! unlocked with the same non-zero size.

use crate::config::WatchConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// What one poll saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Missing,
    /// Another writer holds the file.
    Locked,
    Size(u64),
}

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilityOutcome {
    Stable,
    TimedOut,
    Vanished,
    Cancelled,
}

/// Poll bookkeeping for one path.
#[derive(Debug, Clone)]
pub struct StabilityState {
    pub path: PathBuf,
    pub consecutive_stable_reads: u32,
    pub last_size: Option<u64>,
    pub started_at: Instant,
    pub locked: bool,
}

impl StabilityState {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            consecutive_stable_reads: 0,
            last_size: None,
            started_at: Instant::now(),
            locked: false,
        }
    }

    /// Fold one poll into the run and return the run length.
    ///
    /// A lock resets the run and forgets the size. A zero size resets the
    /// run. A size different from the last one starts a new run at one.
    pub fn observe(&mut self, probe: Probe) -> u32 {
        match probe {
            Probe::Missing | Probe::Locked => {
                self.locked = probe == Probe::Locked;
                self.consecutive_stable_reads = 0;
                self.last_size = None;
            }
            Probe::Size(0) => {
                self.locked = false;
                self.consecutive_stable_reads = 0;
                self.last_size = Some(0);
            }
            Probe::Size(size) => {
                self.locked = false;
                if self.last_size == Some(size) {
                    self.consecutive_stable_reads += 1;
                } else {
                    self.consecutive_stable_reads = 1;
                }
                self.last_size = Some(size);
            }
        }
        self.consecutive_stable_reads
    }
}

/// Timing of the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilitySettings {
    pub initial_delay: Duration,
    pub poll_interval: Duration,
    pub required_polls: u32,
    pub timeout: Duration,
}

impl Default for StabilitySettings {
    fn default() -> Self {
        Self::from(&WatchConfig::default())
    }
}

impl From<&WatchConfig> for StabilitySettings {
    fn from(config: &WatchConfig) -> Self {
        Self {
            initial_delay: config.initial_delay(),
            poll_interval: config.poll_interval(),
            required_polls: config.required_stable_polls.max(1),
            timeout: config.stability_timeout(),
        }
    }
}

/// Inspects a file for one poll.
pub trait FileProbe: Send + Sync {
    fn probe(&self, path: &Path) -> Probe;
}

/// Probes the real filesystem.
///
/// A file is locked when it cannot be opened for reading and writing, or on
/// Unix when another process holds an exclusive `flock` on it.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl FileProbe for FsProbe {
    fn probe(&self, path: &Path) -> Probe {
        use std::fs::{File, OpenOptions};
        use std::io::ErrorKind;

        let file = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Probe::Missing,
            // Read-only files are still uploadable.
            Err(e) if e.kind() == ErrorKind::PermissionDenied => match File::open(path) {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::NotFound => return Probe::Missing,
                Err(_) => return Probe::Locked,
            },
            Err(_) => return Probe::Locked,
        };

        let len = match file.metadata() {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => return Probe::Missing,
            Err(_) => return Probe::Locked,
        };

        #[cfg(unix)]
        {
            use nix::errno::Errno;
            use nix::fcntl::{Flock, FlockArg};

            match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
                Ok(_released_on_drop) => {}
                Err((_, Errno::EWOULDBLOCK)) => return Probe::Locked,
                Err((_, errno)) => {
                    tracing::debug!(file = %path.display(), "flock failed: {}", errno);
                }
            }
        }

        Probe::Size(len)
    }
}

/// Sleep for `duration`; `true` when cancelled first.
async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}

/// Poll `path` until it is stable, gone, out of time or cancelled.
pub async fn wait_until_stable(
    path: &Path,
    settings: &StabilitySettings,
    probe: &dyn FileProbe,
    cancel: &CancellationToken,
) -> StabilityOutcome {
    let mut state = StabilityState::new(path.to_path_buf());

    if sleep_or_cancel(settings.initial_delay, cancel).await {
        return StabilityOutcome::Cancelled;
    }

    loop {
        if cancel.is_cancelled() {
            return StabilityOutcome::Cancelled;
        }

        let seen = probe.probe(path);
        if seen == Probe::Missing {
            tracing::debug!(file = %path.display(), "File vanished while waiting");
            return StabilityOutcome::Vanished;
        }

        let run = state.observe(seen);
        tracing::trace!(
            file = %path.display(),
            probe = ?seen,
            run,
            "Stability poll"
        );

        if run >= settings.required_polls {
            tracing::debug!(
                file = %path.display(),
                size = state.last_size.unwrap_or_default(),
                "File is stable"
            );
            return StabilityOutcome::Stable;
        }

        if state.started_at.elapsed() >= settings.timeout {
            return StabilityOutcome::TimedOut;
        }

        if sleep_or_cancel(settings.poll_interval, cancel).await {
            return StabilityOutcome::Cancelled;
        }
    }
}
