//! Anonymous Imgur image upload.

use crate::upload::backend::{read_response, transport, UploadSource, Uploader};
use crate::upload::registry::BackendContext;
use async_trait::async_trait;
use droplift_common::{Error, ErrorList, Result, UploadResult};
use reqwest::multipart::Form;
use reqwest::Client;
use serde::Deserialize;

pub const SERVICE_NAME: &str = "Imgur";

#[derive(Debug, Deserialize)]
struct ImgurResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<ImgurData>,
}

#[derive(Debug, Default, Deserialize)]
struct ImgurData {
    link: Option<String>,
    deletehash: Option<String>,
    error: Option<serde_json::Value>,
}

impl ImgurData {
    fn error_message(&self) -> Option<String> {
        match self.error.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(map) => map
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string),
            _ => None,
        }
    }
}

/// Multipart upload to the Imgur image endpoint with a `Client-ID`.
#[derive(Debug, Clone)]
pub struct ImgurUploader {
    client: Client,
    client_id: String,
    endpoint: String,
}

impl ImgurUploader {
    pub fn new(client: Client, client_id: String, endpoint: String) -> Self {
        Self {
            client,
            client_id,
            endpoint,
        }
    }

    pub fn from_context(ctx: &BackendContext) -> Result<Self> {
        let imgur = &ctx.config.uploaders.imgur;
        if imgur.endpoint.trim().is_empty() {
            return Err(Error::config("Imgur endpoint is not configured"));
        }
        Ok(Self::new(
            ctx.client.clone(),
            imgur.client_id().to_string(),
            imgur.endpoint.clone(),
        ))
    }
}

/// Medium thumbnail link: `abc.png` becomes `abcm.png`.
fn thumbnail_link(link: &str) -> String {
    let name_start = link.rfind('/').map_or(0, |i| i + 1);
    match link[name_start..].rfind('.') {
        Some(dot) => {
            let dot = name_start + dot;
            format!("{}m{}", &link[..dot], &link[dot..])
        }
        None => String::new(),
    }
}

#[async_trait]
impl Uploader for ImgurUploader {
    fn service_name(&self) -> &str {
        SERVICE_NAME
    }

    async fn upload(&self, source: UploadSource, errors: &mut ErrorList) -> Result<UploadResult> {
        let form = Form::new()
            .text("type", "file")
            .part("image", source.into_part()?);

        let response = self
            .client
            .post(&self.endpoint)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Client-ID {}", self.client_id),
            )
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        let info = read_response(response).await?;

        let parsed: Option<ImgurResponse> = serde_json::from_str(&info.body).ok();
        let mut result = UploadResult::default().with_response(info.clone());

        match parsed {
            Some(ImgurResponse {
                success: true,
                data: Some(data),
            }) if info.is_success() => match data.link {
                Some(link) if !link.is_empty() => {
                    result.thumbnail_url = thumbnail_link(&link);
                    if let Some(hash) = data.deletehash.filter(|h| !h.is_empty()) {
                        result.deletion_url = format!("https://imgur.com/delete/{}", hash);
                    }
                    result.url = link;
                }
                _ => errors.add("Imgur response did not contain a link."),
            },
            Some(ImgurResponse {
                data: Some(data), ..
            }) => {
                errors.add(format!("Request failed with status {}.", info.status));
                if let Some(message) = data.error_message() {
                    errors.add_first(message);
                }
            }
            _ => {
                errors.add(format!("Request failed with status {}.", info.status));
            }
        }
        Ok(result)
    }
}
