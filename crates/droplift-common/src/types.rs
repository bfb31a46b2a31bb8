//! Upload result types shared by every backend.
//!
//! Backends never throw their failures at the orchestrator; they report them
//! through an [`UploadResult`] whose `errors` list was accumulated in an
//! [`ErrorList`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// What came back from the remote endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseInfo {
    /// HTTP status code.
    pub status: u16,
    /// Final URL after redirects.
    pub url: String,
    /// Response headers in arrival order.
    pub headers: Vec<(String, String)>,
    /// Response body decoded as text.
    pub body: String,
}

impl ResponseInfo {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Look up a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Errors collected during one upload attempt.
///
/// The default title names the backend (`"Imgur error"`) and is used when the
/// list is rendered for logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorList {
    default_title: String,
    messages: Vec<String>,
}

impl ErrorList {
    pub fn new(default_title: impl Into<String>) -> Self {
        Self {
            default_title: default_title.into(),
            messages: Vec::new(),
        }
    }

    pub fn default_title(&self) -> &str {
        &self.default_title
    }

    pub fn set_default_title(&mut self, title: impl Into<String>) {
        self.default_title = title.into();
    }

    /// Append a message.
    pub fn add(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Insert a message ahead of everything collected so far.
    pub fn add_first(&mut self, message: impl Into<String>) {
        self.messages.insert(0, message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<String> {
        self.messages
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.messages.is_empty() {
            return Ok(());
        }
        write!(f, "{}:", self.default_title)?;
        for message in &self.messages {
            write!(f, "\n- {message}")?;
        }
        Ok(())
    }
}

/// Uniform outcome of one backend invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    pub url: String,
    pub thumbnail_url: String,
    pub deletion_url: String,
    pub shortened_url: String,
    pub is_error: bool,
    /// Heading for `errors`, such as `"Imgur error"`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error_title: String,
    pub errors: Vec<String>,
    /// Raw response text, kept for diagnostics.
    pub raw_response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseInfo>,
    /// Wall time spent inside the backend call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
}

impl UploadResult {
    /// A successful result carrying only a URL.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// A failed result carrying the given messages.
    pub fn failure(errors: ErrorList) -> Self {
        Self {
            is_error: true,
            error_title: errors.default_title().to_string(),
            errors: errors.into_messages(),
            ..Default::default()
        }
    }

    /// Attach the response the result was parsed from.
    pub fn with_response(mut self, response: ResponseInfo) -> Self {
        self.raw_response = response.body.clone();
        self.response = Some(response);
        self
    }

    /// Fold an error list into this result; any message marks it failed.
    pub fn absorb_errors(&mut self, errors: ErrorList) {
        if !errors.is_empty() {
            self.is_error = true;
            if self.error_title.is_empty() {
                self.error_title = errors.default_title().to_string();
            }
            let mut messages = errors.into_messages();
            messages.append(&mut self.errors);
            self.errors = messages;
        }
    }

    /// A result is successful when nothing was reported and a URL exists.
    pub fn is_success(&self) -> bool {
        !self.is_error && !self.url.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_header_lookup_is_case_insensitive() {
        let info = ResponseInfo {
            status: 302,
            url: "https://example.com".into(),
            headers: vec![("Location".into(), "https://example.com/x".into())],
            body: String::new(),
        };
        assert_eq!(info.header("location"), Some("https://example.com/x"));
        assert_eq!(info.header("X-Missing"), None);
        assert!(!info.is_success());
    }

    #[test]
    fn test_error_list_ordering_and_display() {
        let mut errors = ErrorList::new("Imgur error");
        assert_eq!(errors.to_string(), "");

        errors.add("HTTP 500");
        errors.add_first("Upload rejected");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.messages()[0], "Upload rejected");
        assert_eq!(
            errors.to_string(),
            "Imgur error:\n- Upload rejected\n- HTTP 500"
        );
    }

    #[test]
    fn test_absorb_errors_marks_failure() {
        let mut result = UploadResult::from_url("https://example.com/a.png");
        assert!(result.is_success());

        result.absorb_errors(ErrorList::new("S3 error"));
        assert!(result.is_success());

        let mut errors = ErrorList::new("S3 error");
        errors.add("denied");
        result.absorb_errors(errors);
        assert!(result.is_error);
        assert!(!result.is_success());
        assert_eq!(result.errors, vec!["denied".to_string()]);
        assert_eq!(result.error_title, "S3 error");
    }

    #[test]
    fn test_failure_keeps_title() {
        let mut errors = ErrorList::new("Imgur error");
        errors.add("File type invalid");
        let result = UploadResult::failure(errors);
        assert_eq!(result.error_title, "Imgur error");
        assert_eq!(result.errors, vec!["File type invalid".to_string()]);

        let empty = UploadResult::from_url("https://example.com/a.png");
        let json = serde_json::to_value(&empty).unwrap();
        assert!(json.get("error_title").is_none());
    }

    #[test]
    fn test_empty_url_is_not_success() {
        let result = UploadResult::default();
        assert!(!result.is_success());
    }
}
