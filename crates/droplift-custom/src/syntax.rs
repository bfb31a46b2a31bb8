//! Placeholder syntax parser.
//!
//! Templates are literal text with placeholders:
//!
//! - `{name}` inserts a value (`{filename}`, `{response}`, ...)
//! - `{function:arg1|arg2}` calls a function; arguments may contain
//!   placeholders of their own
//! - `\` escapes the next character, so `\{`, `\}`, `\|` and `\\` are literal
//!
//! Outside a placeholder a lone `}` or `|` is literal text.

use crate::error::{Result, TemplateError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Placeholder {
        name: String,
        /// `None` for `{name}`, `Some` for `{name:...}`.
        args: Option<Vec<Vec<Node>>>,
    },
}

/// Parse `template` into nodes.
///
/// # Examples
///
/// ```
/// use droplift_custom::syntax::{parse, Node};
///
/// let nodes = parse("https://{json:data.id}.example.com").unwrap();
/// assert_eq!(nodes.len(), 3);
/// assert!(matches!(&nodes[1], Node::Placeholder { name, .. } if name == "json"));
/// ```
pub fn parse(template: &str) -> Result<Vec<Node>> {
    let chars: Vec<char> = template.chars().collect();
    let (nodes, _) = parse_sequence(&chars, 0, false)?;
    Ok(nodes)
}

/// Parse until the end of input, or until `|` / `}` when `in_argument`.
///
/// Returns the nodes and the index of the character that stopped parsing.
fn parse_sequence(chars: &[char], mut i: usize, in_argument: bool) -> Result<(Vec<Node>, usize)> {
    let mut nodes = Vec::new();
    let mut text = String::new();

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                match chars.get(i + 1) {
                    Some(next) => text.push(*next),
                    None => text.push('\\'),
                }
                i += 2;
            }
            '{' => {
                if !text.is_empty() {
                    nodes.push(Node::Text(std::mem::take(&mut text)));
                }
                let (node, next) = parse_placeholder(chars, i)?;
                nodes.push(node);
                i = next;
            }
            '|' | '}' if in_argument => break,
            c => {
                text.push(c);
                i += 1;
            }
        }
    }

    if !text.is_empty() {
        nodes.push(Node::Text(text));
    }
    Ok((nodes, i.min(chars.len())))
}

/// Parse a placeholder whose `{` is at `start`; returns the index after `}`.
fn parse_placeholder(chars: &[char], start: usize) -> Result<(Node, usize)> {
    let mut i = start + 1;
    let mut name = String::new();

    while i < chars.len() && chars[i] != ':' && chars[i] != '}' {
        name.push(chars[i]);
        i += 1;
    }
    if i >= chars.len() {
        return Err(TemplateError::UnclosedPlaceholder(start));
    }
    if name.trim().is_empty() {
        return Err(TemplateError::EmptyPlaceholder(start));
    }
    let name = name.trim().to_string();

    if chars[i] == '}' {
        return Ok((Node::Placeholder { name, args: None }, i + 1));
    }

    let mut args = Vec::new();
    i += 1;
    loop {
        let (arg, stop) = parse_sequence(chars, i, true)?;
        if stop >= chars.len() {
            return Err(TemplateError::UnclosedPlaceholder(start));
        }
        args.push(arg);
        if chars[stop] == '}' {
            return Ok((
                Node::Placeholder {
                    name,
                    args: Some(args),
                },
                stop + 1,
            ));
        }
        i = stop + 1;
    }
}
