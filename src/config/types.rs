use crate::upload::Destination;
use droplift_custom::CustomUploaderItem;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub naming: NamingConfig,

    #[serde(default)]
    pub upload: UploadConfig,

    #[serde(default)]
    pub uploaders: UploadersConfig,

    #[serde(default)]
    pub transcode: TranscodeConfig,

    #[serde(default)]
    pub events: EventsConfig,
}

impl Config {
    /// Directory relocated files are placed under.
    ///
    /// Falls back to the watch path, then the current directory.
    pub fn destination_root(&self) -> PathBuf {
        self.naming
            .destination_dir
            .clone()
            .or_else(|| self.watch.path.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory to watch for new files
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub recursive: bool,

    /// Extensions to pick up (empty = all)
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Skip files whose name starts with a dot
    #[serde(default = "default_true")]
    pub ignore_hidden: bool,

    /// Delay after the create event before the first poll
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Consecutive unchanged, unlocked polls before a file counts as written
    #[serde(default = "default_required_stable_polls")]
    pub required_stable_polls: u32,

    /// Give up on a file after this long
    #[serde(default = "default_stability_timeout_ms")]
    pub stability_timeout_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_required_stable_polls() -> u32 {
    4
}

fn default_stability_timeout_ms() -> u64 {
    5000
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            recursive: false,
            extensions: Vec::new(),
            ignore_hidden: true,
            initial_delay_ms: default_initial_delay_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            required_stable_polls: default_required_stable_polls(),
            stability_timeout_ms: default_stability_timeout_ms(),
        }
    }
}

impl WatchConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stability_timeout(&self) -> Duration {
        Duration::from_millis(self.stability_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NamingConfig {
    /// Name template for relocated files, without extension
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Root of the `<yyyy>/<yyyy-MM>` tree (default: the watch path)
    #[serde(default)]
    pub destination_dir: Option<PathBuf>,

    /// Text file with one entry per line for `%rf`
    #[serde(default)]
    pub word_list: Option<PathBuf>,
}

fn default_pattern() -> String {
    droplift_naming::DEFAULT_PATTERN.to_string()
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            pattern: default_pattern(),
            destination_dir: None,
            word_list: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    #[serde(default)]
    pub destination: Destination,

    /// Read buffer is `2^power` KiB
    #[serde(default = "default_buffer_size_power")]
    pub buffer_size_power: u32,

    /// Replace characters not allowed in file names with `_`
    #[serde(default)]
    pub replace_reserved_characters: bool,

    /// Value of `{input}` in custom uploader templates
    #[serde(default)]
    pub input: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_buffer_size_power() -> u32 {
    5
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            destination: Destination::default(),
            buffer_size_power: default_buffer_size_power(),
            replace_reserved_characters: false,
            input: String::new(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl UploadConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UploadersConfig {
    #[serde(default)]
    pub amazon_s3: AmazonS3Config,

    #[serde(default)]
    pub imgur: ImgurConfig,

    /// `.sxcu` files to load
    #[serde(default)]
    pub custom_uploaders: Vec<PathBuf>,

    /// Index into `custom_uploaders` used by the custom uploader destination
    #[serde(default)]
    pub custom_uploader_selected: usize,

    /// Loaded and migrated items, in `custom_uploaders` order
    #[serde(skip)]
    pub custom_uploader_items: Vec<CustomUploaderItem>,
}

impl UploadersConfig {
    pub fn selected_custom_uploader(&self) -> Option<&CustomUploaderItem> {
        self.custom_uploader_items.get(self.custom_uploader_selected)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AmazonS3Config {
    #[serde(default)]
    pub access_key_id: String,

    #[serde(default)]
    pub secret_access_key: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Service endpoint (default: `https://s3.<region>.amazonaws.com`)
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub bucket: String,

    /// Name template for the key prefix, e.g. `uploads/%y/%mo`
    #[serde(default)]
    pub object_prefix: String,

    /// `<endpoint>/<bucket>/<key>` instead of `<bucket>.<endpoint>/<key>`
    #[serde(default)]
    pub use_path_style: bool,

    /// Public URL base used instead of the endpoint
    #[serde(default)]
    pub custom_domain: Option<String>,

    /// Send `x-amz-acl: public-read`
    #[serde(default)]
    pub public_acl: bool,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for AmazonS3Config {
    fn default() -> Self {
        Self {
            access_key_id: String::new(),
            secret_access_key: String::new(),
            region: default_region(),
            endpoint: None,
            bucket: String::new(),
            object_prefix: String::new(),
            use_path_style: false,
            custom_domain: None,
            public_acl: false,
        }
    }
}

impl AmazonS3Config {
    pub fn has_secret(&self) -> bool {
        !self.secret_access_key.trim().is_empty()
    }
}

/// Anonymous application id used when `client_id` is left empty. Release
/// builds bake in their registered id through `DROPLIFT_IMGUR_CLIENT_ID`.
pub const DEFAULT_IMGUR_CLIENT_ID: &str = match option_env!("DROPLIFT_IMGUR_CLIENT_ID") {
    Some(id) => id,
    None => "droplift-anonymous",
};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImgurConfig {
    /// Overrides the built-in anonymous client id
    #[serde(default)]
    pub client_id: String,

    #[serde(default = "default_imgur_endpoint")]
    pub endpoint: String,
}

fn default_imgur_endpoint() -> String {
    "https://api.imgur.com/3/image".to_string()
}

impl ImgurConfig {
    /// The configured client id, or the built-in one.
    pub fn client_id(&self) -> &str {
        match self.client_id.trim() {
            "" => DEFAULT_IMGUR_CLIENT_ID,
            id => id,
        }
    }
}

impl Default for ImgurConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            endpoint: default_imgur_endpoint(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscodeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Extensions converted to MP4 before upload
    #[serde(default = "default_transcode_extensions")]
    pub extensions: Vec<String>,

    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default = "default_transcode_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_transcode_extensions() -> Vec<String> {
    vec!["mov".to_string()]
}

fn default_transcode_timeout_secs() -> u64 {
    600
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            extensions: default_transcode_extensions(),
            ffmpeg_path: None,
            timeout_secs: default_transcode_timeout_secs(),
        }
    }
}

impl TranscodeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn applies_to(&self, path: &Path) -> bool {
        self.enabled
            && !self.extensions.is_empty()
            && droplift_common::paths::has_extension(path, &self.extensions)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventsConfig {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}
