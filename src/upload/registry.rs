//! Destination to backend constructor table.

use super::backend::Uploader;
use super::backends::{AmazonS3Uploader, CustomUploader, ImgurUploader};
use crate::config::Config;
use droplift_common::{Error, Result};
use droplift_naming::{Clock, Counters};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Where uploads go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// Amazon S3 when its secret is configured, otherwise Imgur.
    #[default]
    Auto,
    AmazonS3,
    Imgur,
    CustomUploader,
}

impl Destination {
    pub fn as_str(self) -> &'static str {
        match self {
            Destination::Auto => "auto",
            Destination::AmazonS3 => "amazon_s3",
            Destination::Imgur => "imgur",
            Destination::CustomUploader => "custom_uploader",
        }
    }

    /// Human-readable name, used when no backend could be built.
    pub fn service_name(self) -> &'static str {
        match self {
            Destination::Auto => "Uploader",
            Destination::AmazonS3 => super::backends::s3::SERVICE_NAME,
            Destination::Imgur => super::backends::imgur::SERVICE_NAME,
            Destination::CustomUploader => "Custom uploader",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a backend constructor may draw on.
#[derive(Clone)]
pub struct BackendContext {
    pub config: Arc<Config>,
    pub client: reqwest::Client,
    pub counters: Arc<Counters>,
    pub clock: Arc<dyn Clock>,
    /// Entries for `%rf`, when configured.
    pub word_list: Option<Arc<Vec<String>>>,
}

impl fmt::Debug for BackendContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendContext")
            .field("counters", &self.counters)
            .finish_non_exhaustive()
    }
}

/// Builds a ready-to-call uploader from configuration.
pub type BackendFactory =
    Arc<dyn Fn(&BackendContext) -> Result<Arc<dyn Uploader>> + Send + Sync>;

/// Maps each concrete [`Destination`] to its constructor.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    factories: HashMap<Destination, BackendFactory>,
}

impl BackendRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in backends.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Destination::AmazonS3, |ctx| {
            Ok(Arc::new(AmazonS3Uploader::from_context(ctx)?) as Arc<dyn Uploader>)
        });
        registry.register(Destination::Imgur, |ctx| {
            Ok(Arc::new(ImgurUploader::from_context(ctx)?) as Arc<dyn Uploader>)
        });
        registry.register(Destination::CustomUploader, |ctx| {
            Ok(Arc::new(CustomUploader::from_context(ctx)?) as Arc<dyn Uploader>)
        });
        registry
    }

    /// Register or replace the constructor for `destination`.
    pub fn register<F>(&mut self, destination: Destination, factory: F)
    where
        F: Fn(&BackendContext) -> Result<Arc<dyn Uploader>> + Send + Sync + 'static,
    {
        self.factories.insert(destination, Arc::new(factory));
    }

    pub fn contains(&self, destination: Destination) -> bool {
        self.factories.contains_key(&destination)
    }

    /// Construct the uploader for a concrete destination.
    pub fn build(
        &self,
        destination: Destination,
        ctx: &BackendContext,
    ) -> Result<Arc<dyn Uploader>> {
        let factory = self.factories.get(&destination).ok_or_else(|| {
            Error::config(format!(
                "No backend registered for destination '{}'",
                destination
            ))
        })?;
        factory(ctx)
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut destinations: Vec<_> = self.factories.keys().map(|d| d.as_str()).collect();
        destinations.sort_unstable();
        f.debug_struct("BackendRegistry")
            .field("destinations", &destinations)
            .finish()
    }
}
