//! Extracting upload results from responses.

use crate::engine::{Renderer, Scope};
use crate::error::Result;
use crate::item::CustomUploaderItem;
use droplift_common::{ErrorList, ResponseInfo, UploadResult};
use tracing::warn;

impl CustomUploaderItem {
    /// Render the response templates against `response`.
    ///
    /// On a 2xx status the `url` template (or the raw body when it is empty)
    /// becomes the result URL, or the shortened URL when `shortened`. On any
    /// other status a generic failure is recorded and the rendered
    /// `error_message`, if non-empty, is put ahead of it.
    pub fn parse_response(
        &self,
        response: &ResponseInfo,
        file_name: &str,
        errors: &mut ErrorList,
        shortened: bool,
    ) -> Result<UploadResult> {
        let mut result = UploadResult::default().with_response(response.clone());
        let scope = Scope {
            file_name,
            input: "",
            uploader_name: &self.name,
            response: Some(response),
        };
        let mut renderer = Renderer::new(scope);

        if response.is_success() {
            let url = if self.url.is_empty() {
                response.body.clone()
            } else {
                renderer.render(&self.url)?
            };
            if shortened {
                result.shortened_url = url;
            } else {
                result.url = url;
            }
            result.thumbnail_url = renderer.render(&self.thumbnail_url)?;
            result.deletion_url = renderer.render(&self.deletion_url)?;
        } else {
            errors.add(format!("Request failed with status {}.", response.status));
            if !self.error_message.is_empty() {
                let message = renderer.render(&self.error_message)?;
                if !message.is_empty() {
                    errors.add_first(message);
                }
            }
        }
        Ok(result)
    }

    /// [`parse_response`](Self::parse_response), turning template failures
    /// into an error message that names the host.
    pub fn try_parse_response(
        &self,
        response: &ResponseInfo,
        file_name: &str,
        errors: &mut ErrorList,
        shortened: bool,
    ) -> UploadResult {
        match self.parse_response(response, file_name, errors, shortened) {
            Ok(result) => result,
            Err(e) => {
                let host = self.host_name();
                warn!(host = %host, error = %e, "Failed to parse custom uploader response");
                let message = if e.is_json() {
                    format!(
                        "Invalid response content is returned from host ({host}), expected response content is JSON.\n\n{e}"
                    )
                } else {
                    format!("Unable to parse response content returned from host ({host}).\n\n{e}")
                };
                errors.add_first(message);
                UploadResult::default().with_response(response.clone())
            }
        }
    }
}
