//! The custom uploader item and its `.sxcu` document format.

use crate::migrate;
use crate::urls;
use droplift_common::{Error, Result};
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// File extension of persisted custom uploaders.
pub const SXCU_EXTENSION: &str = "sxcu";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the request body is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CustomUploaderBody {
    #[default]
    None,
    MultipartFormData,
    #[serde(rename = "FormURLEncoded")]
    FormUrlEncoded,
    #[serde(rename = "JSON")]
    Json,
    #[serde(rename = "XML")]
    Xml,
    Binary,
}

impl CustomUploaderBody {
    /// Content type sent with the body, if any.
    pub fn content_type(self) -> Option<&'static str> {
        match self {
            CustomUploaderBody::None => None,
            CustomUploaderBody::MultipartFormData => Some("multipart/form-data"),
            CustomUploaderBody::FormUrlEncoded => Some("application/x-www-form-urlencoded"),
            CustomUploaderBody::Json => Some("application/json"),
            CustomUploaderBody::Xml => Some("application/xml"),
            CustomUploaderBody::Binary => Some("application/octet-stream"),
        }
    }

    /// Bodies that carry `Arguments`.
    pub fn uses_arguments(self) -> bool {
        matches!(
            self,
            CustomUploaderBody::MultipartFormData | CustomUploaderBody::FormUrlEncoded
        )
    }

    /// Bodies that carry `Data`.
    pub fn uses_data(self) -> bool {
        matches!(self, CustomUploaderBody::Json | CustomUploaderBody::Xml)
    }
}

/// Legacy response handling, read from old documents and never written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ResponseType {
    #[default]
    Text,
    #[serde(rename = "RedirectionURL")]
    RedirectionUrl,
    Headers,
    LocationHeader,
}

/// What kind of content an uploader accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestinationKind {
    ImageUploader,
    TextUploader,
    FileUploader,
    UrlShortener,
    UrlSharingService,
}

impl DestinationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DestinationKind::ImageUploader => "ImageUploader",
            DestinationKind::TextUploader => "TextUploader",
            DestinationKind::FileUploader => "FileUploader",
            DestinationKind::UrlShortener => "URLShortener",
            DestinationKind::UrlSharingService => "URLSharingService",
        }
    }
}

impl FromStr for DestinationKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "imageuploader" => Ok(DestinationKind::ImageUploader),
            "textuploader" => Ok(DestinationKind::TextUploader),
            "fileuploader" => Ok(DestinationKind::FileUploader),
            "urlshortener" => Ok(DestinationKind::UrlShortener),
            "urlsharingservice" => Ok(DestinationKind::UrlSharingService),
            other => Err(format!("unknown destination type '{other}'")),
        }
    }
}

/// Set of [`DestinationKind`]s, written as `"ImageUploader, FileUploader"`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DestinationType(Vec<DestinationKind>);

impl DestinationType {
    pub fn new(kinds: impl IntoIterator<Item = DestinationKind>) -> Self {
        let mut set = Vec::new();
        for kind in kinds {
            if !set.contains(&kind) {
                set.push(kind);
            }
        }
        Self(set)
    }

    pub fn contains(&self, kind: DestinationKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn kinds(&self) -> &[DestinationKind] {
        &self.0
    }
}

impl fmt::Display for DestinationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("None");
        }
        let names: Vec<&str> = self.0.iter().map(|k| k.as_str()).collect();
        f.write_str(&names.join(", "))
    }
}

impl FromStr for DestinationType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let kinds = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty() && !part.eq_ignore_ascii_case("none"))
            .map(DestinationKind::from_str)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self::new(kinds))
    }
}

impl Serialize for DestinationType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DestinationType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        text.parse().map_err(serde::de::Error::custom)
    }
}

fn nullable_map<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn nullable_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A user-defined HTTP uploader.
///
/// Request fields (`request_url`, `parameters`, `headers`, `arguments`) and
/// response fields (`url`, `thumbnail_url`, `deletion_url`, `error_message`)
/// are templates in the placeholder syntax of [`crate::syntax`].
///
/// Serialization follows the `.sxcu` layout: PascalCase keys, empty fields
/// omitted, `Arguments` only for form bodies and `Data` only for JSON/XML
/// bodies.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(remote = "Self", rename_all = "PascalCase", default)]
pub struct CustomUploaderItem {
    #[serde(deserialize_with = "nullable_string")]
    pub version: String,
    #[serde(deserialize_with = "nullable_string")]
    pub name: String,
    pub destination_type: DestinationType,
    pub request_method: HttpMethod,
    #[serde(rename = "RequestURL", deserialize_with = "nullable_string")]
    pub request_url: String,
    #[serde(deserialize_with = "nullable_map")]
    pub parameters: BTreeMap<String, String>,
    #[serde(deserialize_with = "nullable_map")]
    pub headers: BTreeMap<String, String>,
    pub body: CustomUploaderBody,
    #[serde(deserialize_with = "nullable_map")]
    pub arguments: BTreeMap<String, String>,
    #[serde(deserialize_with = "nullable_string")]
    pub file_form_name: String,
    #[serde(deserialize_with = "nullable_string")]
    pub data: String,
    pub response_type: ResponseType,
    #[serde(rename = "URL", deserialize_with = "nullable_string")]
    pub url: String,
    #[serde(rename = "ThumbnailURL", deserialize_with = "nullable_string")]
    pub thumbnail_url: String,
    #[serde(rename = "DeletionURL", deserialize_with = "nullable_string")]
    pub deletion_url: String,
    #[serde(deserialize_with = "nullable_string")]
    pub error_message: String,
}

impl CustomUploaderItem {
    /// A fresh item at the current format version with a multipart body.
    pub fn new() -> Self {
        Self {
            version: migrate::CURRENT_VERSION.to_string(),
            request_method: HttpMethod::Post,
            body: CustomUploaderBody::MultipartFormData,
            ..Default::default()
        }
    }

    /// Name, else the request host, else `"Name"`.
    pub fn display_name(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        let host = self.host_name();
        if !host.is_empty() {
            return host;
        }
        "Name".to_string()
    }

    /// Suggested file name for saving.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.display_name(), SXCU_EXTENSION)
    }

    /// Host of the request URL, used to attribute errors.
    pub fn host_name(&self) -> String {
        urls::host_name(&self.request_url)
    }

    fn should_serialize_name(&self) -> bool {
        !self.name.is_empty() && self.name != self.host_name()
    }

    /// Parse an `.sxcu` document without migrating it.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Render as a pretty `.sxcu` document.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Read an `.sxcu` file and bring it to the current format version.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut item = Self::from_json(text.trim_start_matches('\u{feff}')).map_err(|e| {
            Error::config(format!(
                "Invalid custom uploader file {}: {}",
                path.display(),
                e
            ))
        })?;
        item.check_backward_compatibility();
        Ok(item)
    }

    /// Write this item as an `.sxcu` document.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = self
            .to_json()
            .map_err(|e| Error::internal(format!("Failed to serialize custom uploader: {e}")))?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

impl fmt::Display for CustomUploaderItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

impl<'de> Deserialize<'de> for CustomUploaderItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let mut document = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        // `RequestType` is the old name of `RequestMethod`; the new key wins.
        if let Some(legacy) = document.remove("RequestType") {
            document.entry("RequestMethod").or_insert(legacy);
        }
        CustomUploaderItem::deserialize(serde_json::Value::Object(document))
            .map_err(serde::de::Error::custom)
    }
}

impl Serialize for CustomUploaderItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if !self.version.is_empty() {
            map.serialize_entry("Version", &self.version)?;
        }
        if self.should_serialize_name() {
            map.serialize_entry("Name", &self.name)?;
        }
        if !self.destination_type.is_empty() {
            map.serialize_entry("DestinationType", &self.destination_type)?;
        }
        map.serialize_entry("RequestMethod", &self.request_method)?;
        if !self.request_url.is_empty() {
            map.serialize_entry("RequestURL", &self.request_url)?;
        }
        if !self.parameters.is_empty() {
            map.serialize_entry("Parameters", &self.parameters)?;
        }
        if !self.headers.is_empty() {
            map.serialize_entry("Headers", &self.headers)?;
        }
        if self.body != CustomUploaderBody::None {
            map.serialize_entry("Body", &self.body)?;
        }
        if self.body.uses_arguments() && !self.arguments.is_empty() {
            map.serialize_entry("Arguments", &self.arguments)?;
        }
        if self.body == CustomUploaderBody::MultipartFormData && !self.file_form_name.is_empty() {
            map.serialize_entry("FileFormName", &self.file_form_name)?;
        }
        if self.body.uses_data() && !self.data.is_empty() {
            map.serialize_entry("Data", &self.data)?;
        }
        for (key, value) in [
            ("URL", &self.url),
            ("ThumbnailURL", &self.thumbnail_url),
            ("DeletionURL", &self.deletion_url),
            ("ErrorMessage", &self.error_message),
        ] {
            if !value.is_empty() {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}
