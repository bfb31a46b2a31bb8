//! Building outbound requests from a custom uploader item.

use crate::engine::{Renderer, Scope};
use crate::error::{Result, TemplateError};
use crate::item::{CustomUploaderBody, CustomUploaderItem, HttpMethod};
use crate::urls;
use droplift_naming::NameContext;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static BODY_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\{(input|filename)\}").expect("body placeholder pattern is valid")
});

/// Caller-supplied values for request templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploaderInput {
    /// Outgoing file name, `{filename}`.
    pub file_name: String,
    /// Free text, `{input}`.
    pub input: String,
}

impl UploaderInput {
    pub fn new(file_name: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            input: input.into(),
        }
    }
}

/// Body of a [`PreparedRequest`]. File bytes are attached by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    None,
    /// The file goes into `file_field`; `fields` are sent alongside it.
    Multipart {
        file_field: String,
        fields: Vec<(String, String)>,
    },
    FormUrlEncoded {
        fields: Vec<(String, String)>,
    },
    /// Rendered JSON or XML text.
    Text {
        content_type: &'static str,
        data: String,
    },
    /// The raw file is the body.
    Binary,
}

/// A fully rendered request, ready for an HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl CustomUploaderItem {
    fn scope<'a>(&'a self, input: &'a UploaderInput) -> Scope<'a> {
        Scope {
            file_name: &input.file_name,
            input: &input.input,
            uploader_name: &self.name,
            response: None,
        }
    }

    /// Render the request URL with parameters appended as a query string.
    ///
    /// Placeholder results are percent-encoded and a missing scheme becomes
    /// `https://`.
    pub fn render_request_url(
        &self,
        input: &UploaderInput,
        ctx: &mut NameContext,
    ) -> Result<String> {
        if self.request_url.trim().is_empty() {
            return Err(TemplateError::Missing("Request must be configured."));
        }
        let url = Renderer::new(self.scope(input))
            .url_encode(true)
            .render(&self.request_url)?;
        let url = urls::fix_prefix(&url);
        let parameters = self.render_map(&self.parameters, input, ctx)?;
        Ok(urls::create_query_string(&url, &parameters))
    }

    fn render_map(
        &self,
        templates: &BTreeMap<String, String>,
        input: &UploaderInput,
        ctx: &mut NameContext,
    ) -> Result<BTreeMap<String, String>> {
        let mut renderer = Renderer::new(self.scope(input)).with_name_tokens(ctx);
        templates
            .iter()
            .map(|(key, template)| -> Result<(String, String)> {
                Ok((key.clone(), renderer.render(template)?))
            })
            .collect()
    }

    /// Rendered query parameters.
    pub fn render_parameters(
        &self,
        input: &UploaderInput,
        ctx: &mut NameContext,
    ) -> Result<BTreeMap<String, String>> {
        self.render_map(&self.parameters, input, ctx)
    }

    /// Rendered headers.
    pub fn render_headers(
        &self,
        input: &UploaderInput,
        ctx: &mut NameContext,
    ) -> Result<Vec<(String, String)>> {
        Ok(self
            .render_map(&self.headers, input, ctx)?
            .into_iter()
            .collect())
    }

    /// Rendered form fields.
    pub fn render_arguments(
        &self,
        input: &UploaderInput,
        ctx: &mut NameContext,
    ) -> Result<Vec<(String, String)>> {
        Ok(self
            .render_map(&self.arguments, input, ctx)?
            .into_iter()
            .collect())
    }

    /// Rendered JSON/XML body.
    ///
    /// Name tokens are applied first, then `{input}` and `{filename}` (any
    /// case) are replaced with values escaped for the body format.
    pub fn render_data(&self, input: &UploaderInput, ctx: &mut NameContext) -> String {
        let text = droplift_naming::render(&self.data, ctx);
        BODY_PLACEHOLDER
            .replace_all(&text, |caps: &regex::Captures| {
                let value = if caps[1].eq_ignore_ascii_case("input") {
                    &input.input
                } else {
                    &input.file_name
                };
                self.encode_body_value(value)
            })
            .into_owned()
    }

    fn encode_body_value(&self, value: &str) -> String {
        match self.body {
            CustomUploaderBody::Json => json_encode(value),
            CustomUploaderBody::Xml => xml_encode(value),
            _ => value.to_string(),
        }
    }

    /// The multipart file field name.
    pub fn require_file_form_name(&self) -> Result<&str> {
        if self.file_form_name.trim().is_empty() {
            return Err(TemplateError::Missing("File form name must be configured."));
        }
        Ok(&self.file_form_name)
    }

    /// Render everything needed to send the request.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use droplift_custom::{CustomUploaderItem, RequestBody, UploaderInput};
    /// use droplift_naming::{Counters, NameContext, SystemClock};
    ///
    /// let mut item = CustomUploaderItem::new();
    /// item.request_url = "i.example.com/upload".into();
    /// item.file_form_name = "file".into();
    ///
    /// let mut ctx = NameContext::from_clock(&SystemClock, Arc::new(Counters::new()));
    /// let request = item
    ///     .build_request(&UploaderInput::new("a.png", ""), &mut ctx)
    ///     .unwrap();
    /// assert_eq!(request.url, "https://i.example.com/upload");
    /// assert!(request.headers.is_empty());
    /// assert!(matches!(request.body, RequestBody::Multipart { .. }));
    /// ```
    pub fn build_request(
        &self,
        input: &UploaderInput,
        ctx: &mut NameContext,
    ) -> Result<PreparedRequest> {
        let url = self.render_request_url(input, ctx)?;
        let headers = self.render_headers(input, ctx)?;
        let body = match self.body {
            CustomUploaderBody::None => RequestBody::None,
            CustomUploaderBody::MultipartFormData => RequestBody::Multipart {
                file_field: self.require_file_form_name()?.to_string(),
                fields: self.render_arguments(input, ctx)?,
            },
            CustomUploaderBody::FormUrlEncoded => RequestBody::FormUrlEncoded {
                fields: self.render_arguments(input, ctx)?,
            },
            CustomUploaderBody::Json | CustomUploaderBody::Xml => RequestBody::Text {
                content_type: self.body.content_type().unwrap_or("text/plain"),
                data: self.render_data(input, ctx),
            },
            CustomUploaderBody::Binary => RequestBody::Binary,
        };
        Ok(PreparedRequest {
            method: self.request_method,
            url,
            headers,
            body,
        })
    }
}

/// Escape `value` for a JSON string literal, without the quotes.
pub fn json_encode(value: &str) -> String {
    let quoted = serde_json::Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

/// Escape `value` for XML text or attribute content.
pub fn xml_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
