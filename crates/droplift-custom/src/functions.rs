//! Built-in template functions.
//!
//! | Function | Forms |
//! |---|---|
//! | `regex` | `{regex:pattern}`, `{regex:pattern\|group}`, `{regex:input\|pattern\|group}` |
//! | `json` | `{json:path}`, `{json:input\|path}` |
//! | `header` | `{header:Name}` |
//! | `random` | `{random:a\|b\|c}` |
//! | `base64` | `{base64:text}` |
//!
//! Forms without an explicit input read the response body.

use crate::error::{Result, TemplateError};
use base64::Engine as _;
use droplift_common::ResponseInfo;
use rand::{Rng, RngCore};
use regex::Regex;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Regex,
    Json,
    Header,
    Random,
    Base64,
}

impl Function {
    /// Look up a function by name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "regex" => Some(Function::Regex),
            "json" => Some(Function::Json),
            "header" => Some(Function::Header),
            "random" => Some(Function::Random),
            "base64" => Some(Function::Base64),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Regex => "regex",
            Function::Json => "json",
            Function::Header => "header",
            Function::Random => "random",
            Function::Base64 => "base64",
        }
    }

    pub fn min_args(self) -> usize {
        1
    }

    /// Fail unless `args` satisfies the minimum arity.
    pub fn check_args(self, args: &[String]) -> Result<()> {
        if args.len() < self.min_args() {
            return Err(TemplateError::MissingArgument {
                function: self.name(),
                min: self.min_args(),
            });
        }
        Ok(())
    }
}

/// `{regex:...}`. Returns the whole match, or the named/numbered group.
///
/// No match, a missing group, or an empty input yields the empty string.
/// Look-around assertions are not supported; use a capture group instead.
pub fn regex(response: &str, args: &[String]) -> Result<String> {
    Function::Regex.check_args(args)?;
    let (input, pattern, group) = match args {
        [input, pattern, group, ..] => (input.as_str(), pattern.as_str(), group.as_str()),
        [pattern, group] => (response, pattern.as_str(), group.as_str()),
        [pattern] => (response, pattern.as_str(), ""),
        [] => return Ok(String::new()),
    };

    if input.is_empty() || pattern.is_empty() {
        return Ok(String::new());
    }

    let re = Regex::new(pattern).map_err(|source| TemplateError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })?;
    let Some(caps) = re.captures(input) else {
        return Ok(String::new());
    };

    let matched = if group.is_empty() {
        caps.get(0)
    } else if let Ok(index) = group.parse::<usize>() {
        caps.get(index)
    } else {
        caps.name(group)
    };
    Ok(matched.map(|m| m.as_str().to_string()).unwrap_or_default())
}

/// `{json:...}`. Values are rendered as text; strings without quotes.
pub fn json(response: &str, args: &[String]) -> Result<String> {
    Function::Json.check_args(args)?;
    let (input, path) = match args {
        [input, path, ..] => (input.as_str(), path.as_str()),
        [path] => (response, path.as_str()),
        [] => return Ok(String::new()),
    };

    let document: Value = serde_json::from_str(input)?;
    Ok(select_json(&document, path)
        .map(json_to_text)
        .unwrap_or_default())
}

#[derive(Debug, PartialEq, Eq)]
enum PathSegment {
    Key(String),
    Index(usize),
}

/// Split `data.items[0].url` (optionally prefixed with `$.`) into segments.
fn json_path_segments(path: &str) -> Vec<PathSegment> {
    let path = path.trim();
    let path = path
        .strip_prefix("$.")
        .or_else(|| path.strip_prefix('$'))
        .unwrap_or(path);

    let mut segments = Vec::new();
    for part in path.split('.').filter(|p| !p.is_empty()) {
        let mut rest = part;
        if let Some(bracket) = rest.find('[') {
            if bracket > 0 {
                segments.push(PathSegment::Key(rest[..bracket].to_string()));
            }
            rest = &rest[bracket..];
            while let Some(inner) = rest.strip_prefix('[') {
                let Some(end) = inner.find(']') else {
                    segments.push(PathSegment::Key(rest.to_string()));
                    break;
                };
                let index = &inner[..end];
                match index.parse::<usize>() {
                    Ok(n) => segments.push(PathSegment::Index(n)),
                    Err(_) => segments.push(PathSegment::Key(
                        index.trim_matches(|c| c == '\'' || c == '"').to_string(),
                    )),
                }
                rest = &inner[end + 1..];
            }
        } else {
            segments.push(PathSegment::Key(rest.to_string()));
        }
    }
    segments
}

fn select_json<'v>(document: &'v Value, path: &str) -> Option<&'v Value> {
    json_path_segments(path)
        .iter()
        .try_fold(document, |value, segment| match segment {
            PathSegment::Key(key) => value.get(key.as_str()),
            PathSegment::Index(index) => value.get(*index),
        })
}

fn json_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// `{header:Name}`. Empty when there is no response or no such header.
pub fn header(response: Option<&ResponseInfo>, args: &[String]) -> Result<String> {
    Function::Header.check_args(args)?;
    Ok(response
        .and_then(|info| info.header(args[0].trim()))
        .unwrap_or_default()
        .to_string())
}

/// `{random:a|b|c}`. Picks one argument.
pub fn random(args: &[String], rng: &mut dyn RngCore) -> Result<String> {
    Function::Random.check_args(args)?;
    let index = rng.gen_range(0..args.len());
    Ok(args[index].clone())
}

/// `{base64:text}`. Standard alphabet with padding.
pub fn base64(args: &[String]) -> Result<String> {
    Function::Base64.check_args(args)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(args[0].as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_regex_forms() {
        let body = r#"<a href="https://x">link</a>"#;
        assert_eq!(
            regex(body, &args(&[r#"href="(.+)""#, "1"])).unwrap(),
            "https://x"
        );
        assert_eq!(
            regex("", &args(&["id=abc", "id=(?P<id>\\w+)", "id"])).unwrap(),
            "abc"
        );
        assert_eq!(regex(body, &args(&["href"])).unwrap(), "href");
    }

    #[test]
    fn test_regex_no_match_is_empty() {
        assert_eq!(regex("nothing here", &args(&["href=\"(.+)\"", "1"])).unwrap(), "");
        assert_eq!(regex("abc", &args(&["(a)", "5"])).unwrap(), "");
        assert_eq!(regex("", &args(&["a"])).unwrap(), "");
    }

    #[test]
    fn test_regex_invalid_pattern() {
        let err = regex("abc", &args(&["("])).unwrap_err();
        assert!(matches!(err, TemplateError::InvalidRegex { .. }));
    }

    #[test]
    fn test_json_paths() {
        let body = r#"{"data":{"link":"https://i.example.com/a.png","size":12,"tags":["a","b"],"gone":null}}"#;
        assert_eq!(
            json(body, &args(&["data.link"])).unwrap(),
            "https://i.example.com/a.png"
        );
        assert_eq!(json(body, &args(&["$.data.size"])).unwrap(), "12");
        assert_eq!(json(body, &args(&["data.tags[1]"])).unwrap(), "b");
        assert_eq!(json(body, &args(&["data.tags"])).unwrap(), r#"["a","b"]"#);
        assert_eq!(json(body, &args(&["data.gone"])).unwrap(), "");
        assert_eq!(json(body, &args(&["data.missing.deep"])).unwrap(), "");
        assert_eq!(json("", &args(&[r#"[{"id":7}]"#, "[0].id"])).unwrap(), "7");
    }

    #[test]
    fn test_json_invalid_document() {
        let err = json("<html>", &args(&["data.link"])).unwrap_err();
        assert!(err.is_json());
    }

    #[test]
    fn test_header() {
        let info = ResponseInfo {
            status: 201,
            url: String::new(),
            headers: vec![("Location".into(), "https://x/1".into())],
            body: String::new(),
        };
        assert_eq!(header(Some(&info), &args(&["location"])).unwrap(), "https://x/1");
        assert_eq!(header(None, &args(&["Location"])).unwrap(), "");
        assert!(header(None, &[]).is_err());
    }

    #[test]
    fn test_random_and_base64() {
        let mut rng = StdRng::seed_from_u64(9);
        let choices = args(&["a", "b", "c"]);
        let picked = random(&choices, &mut rng).unwrap();
        assert!(choices.contains(&picked));

        assert_eq!(base64(&args(&["user:pass"])).unwrap(), "dXNlcjpwYXNz");
        assert!(matches!(
            base64(&[]),
            Err(TemplateError::MissingArgument { function: "base64", .. })
        ));
    }

    #[test]
    fn test_function_lookup() {
        assert_eq!(Function::from_name("REGEX"), Some(Function::Regex));
        assert_eq!(Function::from_name("xml"), None);
    }
}
