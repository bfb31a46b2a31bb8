//! Format migration for older custom uploader documents.
//!
//! Two generations are upgraded:
//!
//! - up to 12.3.1: no `Body` field (inferred from the method) and a
//!   `ResponseType` switch instead of response templates
//! - up to 13.7.1: `$name$` placeholders instead of `{name}`
//!
//! Query parameters written inline in `RequestURL` are moved into
//! `Parameters` on every load.

use crate::item::{CustomUploaderBody, CustomUploaderItem, HttpMethod, ResponseType};
use crate::urls;
use regex::Regex;
use semver::Version;
use std::sync::LazyLock;
use tracing::debug;

/// Format version written by this crate.
pub const CURRENT_VERSION: &str = "14.0.0";

/// Last version with the `$name$` placeholder syntax.
pub const DOLLAR_SYNTAX_VERSION: &str = "13.7.1";

/// Last version without a `Body` field.
pub const LEGACY_BODY_VERSION: &str = "12.3.1";

const DEPRECATED_HEADERS_MESSAGE: &str =
    "Response type option is deprecated, please use \\$header:header_name\\$ syntax instead.";

static LEGACY_DATA_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\$(input|filename)\$").expect("legacy data placeholder pattern is valid")
});

/// Parse a loosely formatted version (`"13.7"`, `"12.3.1.0"`).
///
/// Anything unparseable counts as `0.0.0`, which always migrates.
pub fn parse_version(text: &str) -> Version {
    let text = text.trim();
    if let Ok(version) = Version::parse(text) {
        return version;
    }
    let mut parts = [0u64; 3];
    for (slot, part) in parts.iter_mut().zip(text.split('.')) {
        let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
        match digits.parse() {
            Ok(n) => *slot = n,
            Err(_) => return Version::new(0, 0, 0),
        }
    }
    Version::new(parts[0], parts[1], parts[2])
}

fn at_most(version: &str, limit: &str) -> bool {
    parse_version(version) <= parse_version(limit)
}

/// Translate `$name$` syntax into `{name}` syntax.
///
/// `$` alternately opens and closes a placeholder. Literal braces become
/// `\{` / `\}`. An old escape of a brace, pipe or backslash is kept; any
/// other escaped character is emitted as itself.
///
/// # Examples
///
/// ```
/// use droplift_custom::migrate::migrate_old_syntax;
///
/// assert_eq!(migrate_old_syntax("$json:data.link$"), "{json:data.link}");
/// assert_eq!(migrate_old_syntax("{\"a\":\"$filename$\"}"), "\\{\"a\":\"{filename}\"\\}");
/// assert_eq!(migrate_old_syntax("cost \\$5"), "cost $5");
/// ```
pub fn migrate_old_syntax(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 8);
    let mut opening = true;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '$' => {
                out.push(if opening { '{' } else { '}' });
                opening = !opening;
            }
            '\\' => match chars.next() {
                Some(next @ ('{' | '}' | '|' | '\\')) => {
                    out.push('\\');
                    out.push(next);
                }
                Some(next) => out.push(next),
                None => out.push_str("\\\\"),
            },
            '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

impl CustomUploaderItem {
    /// Bring this item to [`CURRENT_VERSION`]. Running it again is a no-op.
    pub fn check_backward_compatibility(&mut self) {
        self.extract_query_parameters();

        if self.version.trim().is_empty() || at_most(&self.version, LEGACY_BODY_VERSION) {
            debug!(uploader = %self.display_name(), version = %self.version, "Inferring body and response templates");
            self.infer_legacy_body();
            self.rewrite_response_type();
            self.response_type = ResponseType::Text;
            self.version = DOLLAR_SYNTAX_VERSION.to_string();
        }

        if at_most(&self.version, DOLLAR_SYNTAX_VERSION) {
            debug!(uploader = %self.display_name(), version = %self.version, "Migrating placeholder syntax");
            self.request_url = migrate_old_syntax(&self.request_url);
            for map in [&mut self.parameters, &mut self.headers, &mut self.arguments] {
                for value in map.values_mut() {
                    *value = migrate_old_syntax(value);
                }
            }
            self.data = LEGACY_DATA_PLACEHOLDER
                .replace_all(&self.data, |caps: &regex::Captures| {
                    format!("{{{}}}", caps[1].to_ascii_lowercase())
                })
                .into_owned();
            self.url = migrate_old_syntax(&self.url);
            self.thumbnail_url = migrate_old_syntax(&self.thumbnail_url);
            self.deletion_url = migrate_old_syntax(&self.deletion_url);
            self.error_message = migrate_old_syntax(&self.error_message);
            self.version = CURRENT_VERSION.to_string();
        }
    }

    /// Move `?key=value` pairs from the request URL into `parameters`.
    /// Keys already present in `parameters` win.
    fn extract_query_parameters(&mut self) {
        if self.request_url.is_empty() {
            return;
        }
        let (base, pairs) = urls::split_query(&self.request_url);
        if pairs.is_empty() {
            return;
        }
        for (key, value) in pairs {
            self.parameters.entry(key).or_insert(value);
        }
        self.request_url = base;
    }

    fn infer_legacy_body(&mut self) {
        if self.request_method == HttpMethod::Post {
            self.body = CustomUploaderBody::MultipartFormData;
        } else {
            self.body = CustomUploaderBody::None;
            for (key, value) in std::mem::take(&mut self.arguments) {
                self.parameters.entry(key).or_insert(value);
            }
        }
    }

    fn rewrite_response_type(&mut self) {
        let replacement = match self.response_type {
            ResponseType::Text => return,
            ResponseType::Headers => {
                self.url = DEPRECATED_HEADERS_MESSAGE.to_string();
                return;
            }
            ResponseType::RedirectionUrl => "$responseurl$",
            ResponseType::LocationHeader => "$header:Location$",
        };
        if self.url.is_empty() {
            self.url = replacement.to_string();
        }
        for field in [
            &mut self.url,
            &mut self.thumbnail_url,
            &mut self.deletion_url,
        ] {
            *field = field.replace("$response$", replacement);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy(json: &str) -> CustomUploaderItem {
        CustomUploaderItem::from_json(json).unwrap()
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("13.7.1"), Version::new(13, 7, 1));
        assert_eq!(parse_version("13.7"), Version::new(13, 7, 0));
        assert_eq!(parse_version("12.3.1.0"), Version::new(12, 3, 1));
        assert_eq!(parse_version("garbage"), Version::new(0, 0, 0));
        assert!(at_most("0.1", LEGACY_BODY_VERSION));
        assert!(!at_most(CURRENT_VERSION, DOLLAR_SYNTAX_VERSION));
    }

    #[test]
    fn test_old_syntax_escapes() {
        assert_eq!(migrate_old_syntax(""), "");
        assert_eq!(migrate_old_syntax("$regex:a\\|b|1$"), "{regex:a\\|b|1}");
        assert_eq!(migrate_old_syntax("a\\\\b"), "a\\\\b");
        assert_eq!(migrate_old_syntax("a\\{b"), "a\\{b");
        assert_eq!(migrate_old_syntax("end\\"), "end\\\\");
    }

    #[test]
    fn test_post_without_version_becomes_multipart() {
        let mut item = legacy(
            r#"{"RequestType":"POST","RequestURL":"https://x.test/up?key=abc","FileFormName":"f","URL":"$json:url$"}"#,
        );
        item.check_backward_compatibility();
        assert_eq!(item.body, CustomUploaderBody::MultipartFormData);
        assert_eq!(item.request_url, "https://x.test/up");
        assert_eq!(item.parameters["key"], "abc");
        assert_eq!(item.url, "{json:url}");
        assert_eq!(item.version, CURRENT_VERSION);
    }

    #[test]
    fn test_get_moves_arguments_into_parameters() {
        let mut item = legacy(
            r#"{"Version":"12.0.0","RequestType":"GET","RequestURL":"https://x.test/s?url=$input$","Arguments":{"url":"ignored","fmt":"json"}}"#,
        );
        item.check_backward_compatibility();
        assert_eq!(item.body, CustomUploaderBody::None);
        assert!(item.arguments.is_empty());
        assert_eq!(item.parameters["url"], "{input}");
        assert_eq!(item.parameters["fmt"], "json");
    }

    #[test]
    fn test_response_type_rewrites() {
        let mut item = legacy(
            r#"{"Version":"11.0","RequestURL":"x.test","ResponseType":"RedirectionURL","ThumbnailURL":"$response$?thumb"}"#,
        );
        item.check_backward_compatibility();
        assert_eq!(item.url, "{responseurl}");
        assert_eq!(item.thumbnail_url, "{responseurl}?thumb");

        let mut item = legacy(r#"{"RequestURL":"x.test","ResponseType":"LocationHeader"}"#);
        item.check_backward_compatibility();
        assert_eq!(item.url, "{header:Location}");

        let mut item = legacy(r#"{"RequestURL":"x.test","ResponseType":"Headers"}"#);
        item.check_backward_compatibility();
        assert_eq!(
            item.url,
            "Response type option is deprecated, please use $header:header_name$ syntax instead."
        );
    }

    #[test]
    fn test_data_placeholders() {
        let mut item = legacy(
            r#"{"Version":"13.0.0","Body":"JSON","Data":"{\"text\":\"$INPUT$\",\"name\":\"$filename$\"}"}"#,
        );
        item.check_backward_compatibility();
        assert_eq!(item.data, r#"{"text":"{input}","name":"{filename}"}"#);
    }

    #[test]
    fn test_current_version_is_untouched() {
        let mut item = legacy(
            r#"{"Version":"14.0.0","RequestURL":"https://x.test/{filename}","URL":"cost: $5"}"#,
        );
        let before = item.clone();
        item.check_backward_compatibility();
        assert_eq!(item, before);
    }

    #[test]
    fn test_migration_is_idempotent() {
        let mut once = legacy(
            r#"{"RequestType":"GET","RequestURL":"https://x.test/a?b=$input$","Arguments":{"c":"{d}"},"ResponseType":"LocationHeader","DeletionURL":"$response$/del"}"#,
        );
        once.check_backward_compatibility();
        let mut twice = once.clone();
        twice.check_backward_compatibility();
        assert_eq!(once, twice);
        assert_eq!(once.parameters["c"], "\\{d\\}");
        assert_eq!(once.deletion_url, "{header:Location}/del");
    }
}
