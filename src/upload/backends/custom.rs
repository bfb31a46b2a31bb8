//! Backend driven by a [`CustomUploaderItem`].

use crate::upload::backend::{read_response, transport, UploadSource, Uploader};
use crate::upload::registry::BackendContext;
use async_trait::async_trait;
use droplift_common::{Error, ErrorList, Result, UploadResult};
use droplift_custom::{CustomUploaderItem, HttpMethod, PreparedRequest, RequestBody, UploaderInput};
use droplift_naming::{Clock, Counters, NameContext};
use reqwest::multipart::Form;
use reqwest::{Client, Method};
use std::sync::Arc;

pub struct CustomUploader {
    client: Client,
    item: CustomUploaderItem,
    name: String,
    input: String,
    clock: Arc<dyn Clock>,
    counters: Arc<Counters>,
    word_list: Option<Arc<Vec<String>>>,
}

impl std::fmt::Debug for CustomUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomUploader")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl CustomUploader {
    pub fn new(
        client: Client,
        item: CustomUploaderItem,
        clock: Arc<dyn Clock>,
        counters: Arc<Counters>,
    ) -> Self {
        Self {
            client,
            name: item.display_name(),
            item,
            input: String::new(),
            clock,
            counters,
            word_list: None,
        }
    }

    /// Value of `{input}`.
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = input.into();
        self
    }

    pub fn with_word_list(mut self, words: Arc<Vec<String>>) -> Self {
        self.word_list = Some(words);
        self
    }

    pub fn from_context(ctx: &BackendContext) -> Result<Self> {
        let uploaders = &ctx.config.uploaders;
        let item = uploaders.selected_custom_uploader().cloned().ok_or_else(|| {
            Error::config(format!(
                "Custom uploader {} is not configured",
                uploaders.custom_uploader_selected
            ))
        })?;
        let mut uploader = Self::new(
            ctx.client.clone(),
            item,
            ctx.clock.clone(),
            ctx.counters.clone(),
        )
        .with_input(ctx.config.upload.input.clone());
        if let Some(words) = &ctx.word_list {
            uploader = uploader.with_word_list(words.clone());
        }
        Ok(uploader)
    }

    pub fn item(&self) -> &CustomUploaderItem {
        &self.item
    }

    fn prepare(&self, file_name: &str) -> Result<PreparedRequest> {
        let mut ctx = NameContext::from_clock(self.clock.as_ref(), self.counters.clone());
        if let Some(words) = &self.word_list {
            ctx = ctx.with_word_list(words.clone());
        }
        let input = UploaderInput::new(file_name, self.input.clone());
        self.item
            .build_request(&input, &mut ctx)
            .map_err(|e| Error::template(self.item.host_name(), e.to_string()))
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl Uploader for CustomUploader {
    fn service_name(&self) -> &str {
        &self.name
    }

    async fn upload(&self, source: UploadSource, errors: &mut ErrorList) -> Result<UploadResult> {
        let file_name = source.file_name.clone();
        let prepared = self.prepare(&file_name)?;

        tracing::debug!(
            uploader = %self.name,
            method = %prepared.method,
            url = %prepared.url,
            "Sending custom uploader request"
        );

        let mut request = self
            .client
            .request(method(prepared.method), &prepared.url);
        for (name, value) in &prepared.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        request = match prepared.body {
            RequestBody::None => request,
            RequestBody::Multipart { file_field, fields } => {
                let mut form = Form::new();
                for (name, value) in fields {
                    form = form.text(name, value);
                }
                request.multipart(form.part(file_field, source.into_part()?))
            }
            RequestBody::FormUrlEncoded { fields } => request.form(&fields),
            RequestBody::Text { content_type, data } => request
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(data),
            RequestBody::Binary => {
                let len = source.len;
                request
                    .header(reqwest::header::CONTENT_TYPE, source.mime.clone())
                    .header(reqwest::header::CONTENT_LENGTH, len)
                    .body(source.into_body())
            }
        };

        let response = request.send().await.map_err(transport)?;
        let info = read_response(response).await?;
        Ok(self.item.try_parse_response(&info, &file_name, errors, false))
    }
}
