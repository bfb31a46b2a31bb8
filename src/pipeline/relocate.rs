//! Moving stable files into the dated destination tree.

use chrono::{DateTime, FixedOffset};
use droplift_common::paths::replace_reserved_characters;
use droplift_common::Result;
use std::path::{Component, Path, PathBuf};

/// `<root>/<yyyy>/<yyyy-MM>`
pub fn destination_dir(root: &Path, now: DateTime<FixedOffset>) -> PathBuf {
    root.join(now.format("%Y").to_string())
        .join(now.format("%Y-%m").to_string())
}

/// `<root>/<yyyy>/<yyyy-MM>/<name>.<ext of source>`
///
/// Characters that cannot appear in a file name are replaced with `_`. An
/// empty name falls back to the source's stem.
pub fn destination_path(
    root: &Path,
    source: &Path,
    name: &str,
    now: DateTime<FixedOffset>,
) -> PathBuf {
    let mut file_name = replace_reserved_characters(name.trim(), "_");
    if file_name.is_empty() {
        file_name = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
    }
    if let Some(ext) = source.extension() {
        file_name.push('.');
        file_name.push_str(&ext.to_string_lossy());
    }
    destination_dir(root, now).join(file_name)
}

/// Whether `path` sits in a `<yyyy>/<yyyy-MM>` folder directly under `root`.
pub fn is_relocated(root: &Path, path: &Path) -> bool {
    let Ok(rest) = path.strip_prefix(root) else {
        return false;
    };
    let parts: Vec<String> = rest
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    let [year, month, _file] = parts.as_slice() else {
        return false;
    };
    year.len() == 4
        && year.chars().all(|c| c.is_ascii_digit())
        && month.len() == 7
        && month.starts_with(year.as_str())
        && month.as_bytes()[4] == b'-'
        && month[5..].chars().all(|c| c.is_ascii_digit())
}

/// Move `source` to `dest`, replacing any file already there.
///
/// Falls back to copy and delete when a rename is not possible (different
/// filesystems).
pub async fn relocate(source: &Path, dest: &Path) -> Result<()> {
    if source == dest {
        return Ok(());
    }
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    match tokio::fs::remove_file(dest).await {
        Ok(()) => tracing::debug!(file = %dest.display(), "Replaced existing file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    if let Err(rename_err) = tokio::fs::rename(source, dest).await {
        tracing::debug!(
            file = %source.display(),
            "Rename failed ({}), copying instead",
            rename_err
        );
        if let Err(copy_err) = tokio::fs::copy(source, dest).await {
            discard_partial_copy(dest).await;
            return Err(std::io::Error::new(
                copy_err.kind(),
                format!("copy failed: {} (rename failed: {})", copy_err, rename_err),
            )
            .into());
        }
        tokio::fs::remove_file(source).await?;
    }
    Ok(())
}

/// Remove whatever a failed copy left at `dest`.
async fn discard_partial_copy(dest: &Path) {
    match tokio::fs::remove_file(dest).await {
        Ok(()) => tracing::debug!(file = %dest.display(), "Removed partial copy"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(file = %dest.display(), "Failed to remove partial copy: {}", e),
    }
}
