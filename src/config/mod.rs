mod types;

pub use types::*;

use crate::upload::Destination;
use anyhow::{Context, Result};
use droplift_custom::CustomUploaderItem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Largest accepted `upload.buffer_size_power` (1 GiB buffer).
pub const MAX_BUFFER_SIZE_POWER: u32 = 20;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    prepare_config(&mut config, path.parent())?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./droplift.toml",
        "~/.config/droplift/config.toml",
        "/etc/droplift/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Parse configuration from TOML text. Custom uploader paths are resolved
/// against the current directory.
pub fn parse_config(content: &str) -> Result<Config> {
    let mut config: Config = toml::from_str(content).context("Failed to parse config")?;
    prepare_config(&mut config, None)?;
    validate_config(&config)?;
    Ok(config)
}

/// Expand `~` and resolve relative paths against `base`.
fn resolve_path(path: &Path, base: Option<&Path>) -> PathBuf {
    let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref());
    match base {
        Some(base) if expanded.is_relative() && !base.as_os_str().is_empty() => {
            base.join(expanded)
        }
        _ => expanded,
    }
}

/// Resolve relative paths and load (and migrate) every configured `.sxcu` file.
fn prepare_config(config: &mut Config, base: Option<&Path>) -> Result<()> {
    config.watch.path = config.watch.path.take().map(|p| resolve_path(&p, base));
    config.naming.destination_dir = config
        .naming
        .destination_dir
        .take()
        .map(|p| resolve_path(&p, base));
    config.naming.word_list = config
        .naming
        .word_list
        .take()
        .map(|p| resolve_path(&p, base));

    let mut items = Vec::with_capacity(config.uploaders.custom_uploaders.len());
    for path in &mut config.uploaders.custom_uploaders {
        *path = resolve_path(path, base);
        let item = CustomUploaderItem::load(path)
            .with_context(|| format!("Failed to load custom uploader: {:?}", path))?;
        tracing::debug!(
            uploader = %item.display_name(),
            file = %path.display(),
            "Loaded custom uploader"
        );
        items.push(item);
    }
    config.uploaders.custom_uploader_items = items;
    Ok(())
}

/// Read `naming.word_list`, one entry per non-empty line.
///
/// A missing or unreadable file is logged and treated as unset.
pub fn load_word_list(config: &Config) -> Option<Arc<Vec<String>>> {
    let path = config.naming.word_list.as_ref()?;
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let words: Vec<String> = text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect();
            tracing::debug!(file = %path.display(), entries = words.len(), "Loaded word list");
            Some(Arc::new(words))
        }
        Err(e) => {
            tracing::warn!(file = %path.display(), "Failed to read word list: {}", e);
            None
        }
    }
}

/// Validate configuration.
///
/// Impossible values are errors. Suspicious ones are logged and returned as
/// warnings.
pub fn validate_config(config: &Config) -> Result<Vec<String>> {
    if config.watch.poll_interval_ms == 0 {
        anyhow::bail!("watch.poll_interval_ms cannot be 0");
    }

    if config.watch.required_stable_polls == 0 {
        anyhow::bail!("watch.required_stable_polls cannot be 0");
    }

    if config.upload.buffer_size_power > MAX_BUFFER_SIZE_POWER {
        anyhow::bail!(
            "upload.buffer_size_power must be at most {}, got {}",
            MAX_BUFFER_SIZE_POWER,
            config.upload.buffer_size_power
        );
    }

    if config.events.channel_capacity == 0 {
        anyhow::bail!("events.channel_capacity cannot be 0");
    }

    let uploaders = &config.uploaders;
    if !uploaders.custom_uploaders.is_empty()
        && uploaders.custom_uploader_selected >= uploaders.custom_uploaders.len()
    {
        anyhow::bail!(
            "uploaders.custom_uploader_selected is {} but only {} custom uploader(s) are configured",
            uploaders.custom_uploader_selected,
            uploaders.custom_uploaders.len()
        );
    }

    let mut warnings = Vec::new();

    if config.watch.enabled {
        match &config.watch.path {
            Some(path) if !path.exists() => {
                warnings.push(format!("Watch path does not exist: {:?}", path));
            }
            None => warnings.push("watch.path is not set".to_string()),
            _ => {}
        }
    }

    match config.upload.destination {
        Destination::Auto => {
            if !uploaders.amazon_s3.has_secret() && uploaders.imgur.endpoint.trim().is_empty() {
                warnings.push(
                    "No Amazon S3 secret and no Imgur endpoint; uploads will fail".to_string(),
                );
            }
        }
        Destination::AmazonS3 => {
            let s3 = &uploaders.amazon_s3;
            if !s3.has_secret() || s3.access_key_id.is_empty() || s3.bucket.is_empty() {
                warnings.push("Amazon S3 is selected but its credentials are incomplete".to_string());
            }
        }
        Destination::Imgur => {
            if uploaders.imgur.endpoint.trim().is_empty() {
                warnings.push("Imgur is selected but has no endpoint".to_string());
            }
        }
        Destination::CustomUploader => {
            if uploaders.custom_uploaders.is_empty() {
                warnings.push(
                    "Custom uploader is selected but none are configured".to_string(),
                );
            }
        }
    }

    for warning in &warnings {
        tracing::warn!("{}", warning);
    }

    Ok(warnings)
}
