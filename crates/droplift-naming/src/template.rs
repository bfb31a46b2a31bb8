//! Name template compilation and rendering.

use crate::context::NameContext;
use crate::tokens::{self, TokenKind, PREFIX};

/// One piece of a compiled name template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Token {
        kind: TokenKind,
        parameter: Option<u32>,
    },
}

/// A pattern compiled into literal and token segments.
///
/// Compilation never fails. `%%` is a literal `%`, an unknown `%x` stays as
/// written, and a `{...}` after a token that does not hold an integer is left
/// as literal text.
///
/// # Examples
///
/// ```
/// use droplift_naming::NameTemplate;
///
/// let template = NameTemplate::compile("100%% %zz_%i{2}");
/// assert_eq!(template.segments().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTemplate {
    pattern: String,
    segments: Vec<Segment>,
}

impl NameTemplate {
    /// Compile `pattern`, matching the longest token id at each `%`.
    pub fn compile(pattern: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = pattern;

        while let Some(pos) = rest.find(PREFIX) {
            literal.push_str(&rest[..pos]);
            let after = &rest[pos + PREFIX.len_utf8()..];

            if let Some(tail) = after.strip_prefix(PREFIX) {
                literal.push(PREFIX);
                rest = tail;
                continue;
            }

            match TokenKind::longest_prefix(after) {
                Some((kind, len)) => {
                    let (parameter, consumed) = parse_parameter(&after[len..]);
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Token { kind, parameter });
                    rest = &after[len + consumed..];
                }
                None => {
                    literal.push(PREFIX);
                    rest = after;
                }
            }
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self {
            pattern: pattern.to_string(),
            segments,
        }
    }

    /// Render the template. The caller appends any file extension.
    pub fn render(&self, ctx: &mut NameContext) -> String {
        let mut out = String::with_capacity(self.pattern.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Token { kind, parameter } => {
                    out.push_str(&tokens::resolve(*kind, *parameter, ctx))
                }
            }
        }
        out
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when rendering does not depend on the context.
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, Segment::Literal(_)))
    }
}

/// Parse a `{N}` suffix. Returns the value and the bytes consumed.
fn parse_parameter(input: &str) -> (Option<u32>, usize) {
    let Some(body) = input.strip_prefix('{') else {
        return (None, 0);
    };
    let Some(end) = body.find('}') else {
        return (None, 0);
    };
    match body[..end].parse::<u32>() {
        Ok(value) => (Some(value), end + 2),
        Err(_) => (None, 0),
    }
}

/// Compile and render `pattern` in one step.
pub fn render(pattern: &str, ctx: &mut NameContext) -> String {
    NameTemplate::compile(pattern).render(ctx)
}
