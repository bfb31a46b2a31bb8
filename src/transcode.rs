//! Converting video containers to MP4 before upload.

use crate::config::TranscodeConfig;
use droplift_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

const TOOL: &str = "ffmpeg";

/// Arguments placed between the input and output paths.
const H264_ARGS: &[&str] = &[
    "-c:v",
    "libx264",
    "-preset",
    "medium",
    "-crf",
    "23",
    "-pix_fmt",
    "yuv420p",
    "-movflags",
    "+faststart",
    "-y",
];

/// Runs `ffmpeg` on files whose extension is configured for conversion.
#[derive(Debug, Clone)]
pub struct Transcoder {
    ffmpeg: PathBuf,
    extensions: Vec<String>,
    timeout: Duration,
}

impl Transcoder {
    pub fn new(ffmpeg: PathBuf, extensions: Vec<String>, timeout: Duration) -> Self {
        Self {
            ffmpeg,
            extensions,
            timeout,
        }
    }

    /// `None` when transcoding is disabled or no `ffmpeg` binary is found.
    pub fn from_config(config: &TranscodeConfig) -> Option<Self> {
        if !config.enabled || config.extensions.is_empty() {
            return None;
        }
        let ffmpeg = match &config.ffmpeg_path {
            Some(path) => PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref()),
            None => match which::which(TOOL) {
                Ok(path) => path,
                Err(_) => {
                    tracing::debug!("ffmpeg not found in PATH, transcoding disabled");
                    return None;
                }
            },
        };
        Some(Self::new(ffmpeg, config.extensions.clone(), config.timeout()))
    }

    pub fn applies_to(&self, path: &Path) -> bool {
        droplift_common::paths::has_extension(path, &self.extensions)
    }

    /// Where the converted file is written.
    pub fn output_path(input: &Path) -> PathBuf {
        input.with_extension("mp4")
    }

    /// Convert `input` to H.264 MP4 next to it and delete `input`.
    ///
    /// Returns the new path. On failure the source is left untouched.
    pub async fn transcode(&self, input: &Path) -> Result<PathBuf> {
        let output = Self::output_path(input);
        if output == input {
            return Err(Error::tool(TOOL, "input is already an mp4 file"));
        }

        tracing::info!(
            file = %input.display(),
            output = %output.display(),
            "Transcoding"
        );

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.arg("-i")
            .arg(input)
            .args(H264_ARGS)
            .arg(&output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| Error::tool(TOOL, format!("failed to spawn: {e}")))?;

        let result = tokio::time::timeout(self.timeout, child.wait_with_output()).await;
        let failure = match result {
            Ok(Ok(out)) if out.status.success() => None,
            Ok(Ok(out)) => Some(format!(
                "exited with status {}: {}",
                out.status,
                last_lines(&String::from_utf8_lossy(&out.stderr), 5)
            )),
            Ok(Err(e)) => Some(format!("I/O error waiting for process: {e}")),
            Err(_) => Some(format!("timed out after {:?}", self.timeout)),
        };

        if let Some(message) = failure {
            if let Err(e) = tokio::fs::remove_file(&output).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(file = %output.display(), "Failed to remove partial output: {}", e);
                }
            }
            return Err(Error::tool(TOOL, message));
        }

        if let Err(e) = tokio::fs::remove_file(input).await {
            tracing::warn!(file = %input.display(), "Failed to delete transcoded source: {}", e);
        }
        Ok(output)
    }
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.trim().lines().collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_config_has_no_transcoder() {
        let config = TranscodeConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(Transcoder::from_config(&config).is_none());
    }

    #[test]
    fn test_configured_path_is_used() {
        let config = TranscodeConfig {
            ffmpeg_path: Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg")),
            ..Default::default()
        };
        let transcoder = Transcoder::from_config(&config).unwrap();
        assert_eq!(transcoder.ffmpeg, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert!(transcoder.applies_to(Path::new("clip.MOV")));
        assert!(!transcoder.applies_to(Path::new("clip.mp4")));
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            Transcoder::output_path(Path::new("/a/clip.mov")),
            PathBuf::from("/a/clip.mp4")
        );
    }

    #[test]
    fn test_last_lines() {
        assert_eq!(last_lines("a\nb\nc\n", 2), "b\nc");
        assert_eq!(last_lines("", 2), "");
    }

    #[tokio::test]
    async fn test_missing_binary_keeps_source() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mov");
        std::fs::write(&input, b"movie").unwrap();

        let transcoder = Transcoder::new(
            PathBuf::from("nonexistent_ffmpeg_xyz_12345"),
            vec!["mov".into()],
            Duration::from_secs(5),
        );
        let err = transcoder.transcode(&input).await.unwrap_err();
        assert!(matches!(err, Error::Tool { .. }));
        assert!(input.exists());
    }

    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("ffmpeg");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_replaces_source() {
        let dir = tempfile::tempdir().unwrap();
        // Copies the input (second argument) to the output (last argument).
        let ffmpeg = fake_ffmpeg(dir.path(), "for last; do :; done\ncp \"$2\" \"$last\"");
        let input = dir.path().join("clip.mov");
        std::fs::write(&input, b"movie").unwrap();

        let transcoder = Transcoder::new(ffmpeg, vec!["mov".into()], Duration::from_secs(10));
        let output = transcoder.transcode(&input).await.unwrap();
        assert_eq!(output, dir.path().join("clip.mp4"));
        assert_eq!(std::fs::read(&output).unwrap(), b"movie");
        assert!(!input.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = fake_ffmpeg(dir.path(), "echo 'Invalid data found' >&2\nexit 1");
        let input = dir.path().join("clip.mov");
        std::fs::write(&input, b"movie").unwrap();

        let transcoder = Transcoder::new(ffmpeg, vec!["mov".into()], Duration::from_secs(10));
        let err = transcoder.transcode(&input).await.unwrap_err();
        assert!(err.to_string().contains("Invalid data found"), "{err}");
        assert!(input.exists());
        assert!(!dir.path().join("clip.mp4").exists());
    }
}
