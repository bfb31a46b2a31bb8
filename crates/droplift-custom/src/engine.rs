//! Template evaluation.

use crate::error::{Result, TemplateError};
use crate::functions::{self, Function};
use crate::syntax::{self, Node};
use droplift_common::ResponseInfo;
use droplift_naming::NameContext;

/// Values a template can refer to.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scope<'a> {
    pub file_name: &'a str,
    pub input: &'a str,
    /// Display name of the uploader, `{name}`.
    pub uploader_name: &'a str,
    /// Present when rendering response templates.
    pub response: Option<&'a ResponseInfo>,
}

/// Renders templates against a [`Scope`].
///
/// Two switches change how output is assembled:
///
/// - `url_encode`: top-level placeholder results are percent-encoded (request
///   URLs). Literal text is never encoded.
/// - name tokens: top-level literal text is run through the `%` name template
///   renderer (request side). Function arguments are left untouched so regex
///   patterns keep their `%`.
///
/// # Examples
///
/// ```
/// use droplift_custom::engine::{Renderer, Scope};
///
/// let scope = Scope { file_name: "a b.png", ..Default::default() };
/// let mut renderer = Renderer::new(scope).url_encode(true);
/// assert_eq!(
///     renderer.render("https://x.test/{filename}").unwrap(),
///     "https://x.test/a%20b.png"
/// );
/// ```
pub struct Renderer<'a> {
    scope: Scope<'a>,
    url_encode: bool,
    names: Option<&'a mut NameContext>,
}

impl<'a> Renderer<'a> {
    pub fn new(scope: Scope<'a>) -> Self {
        Self {
            scope,
            url_encode: false,
            names: None,
        }
    }

    pub fn url_encode(mut self, enabled: bool) -> Self {
        self.url_encode = enabled;
        self
    }

    /// Apply `%` name tokens to literal text.
    pub fn with_name_tokens(mut self, ctx: &'a mut NameContext) -> Self {
        self.names = Some(ctx);
        self
    }

    /// Render `template`. An empty template renders to the empty string.
    pub fn render(&mut self, template: &str) -> Result<String> {
        if template.is_empty() {
            return Ok(String::new());
        }
        let nodes = syntax::parse(template)?;
        let mut out = String::with_capacity(template.len());
        for node in &nodes {
            match node {
                Node::Text(text) => match self.names.as_deref_mut() {
                    Some(ctx) => out.push_str(&droplift_naming::render(text, ctx)),
                    None => out.push_str(text),
                },
                Node::Placeholder { name, args } => {
                    let value = self.placeholder(name, args.as_deref())?;
                    if self.url_encode {
                        out.push_str(&urlencoding::encode(&value));
                    } else {
                        out.push_str(&value);
                    }
                }
            }
        }
        Ok(out)
    }

    fn render_nested(&mut self, nodes: &[Node]) -> Result<String> {
        let mut out = String::new();
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Placeholder { name, args } => {
                    out.push_str(&self.placeholder(name, args.as_deref())?)
                }
            }
        }
        Ok(out)
    }

    fn placeholder(&mut self, name: &str, args: Option<&[Vec<Node>]>) -> Result<String> {
        let args = match args {
            Some(args) => args
                .iter()
                .map(|arg| self.render_nested(arg))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        let scope = self.scope;
        let body = scope.response.map(|r| r.body.as_str()).unwrap_or_default();

        match name.to_ascii_lowercase().as_str() {
            "filename" => return Ok(scope.file_name.to_string()),
            "input" => return Ok(scope.input.to_string()),
            "name" => return Ok(scope.uploader_name.to_string()),
            "response" => return Ok(body.to_string()),
            "responseurl" => {
                return Ok(scope
                    .response
                    .map(|r| r.url.clone())
                    .unwrap_or_default())
            }
            "status" => {
                return Ok(scope
                    .response
                    .map(|r| r.status.to_string())
                    .unwrap_or_default())
            }
            _ => {}
        }

        let function =
            Function::from_name(name).ok_or_else(|| TemplateError::UnknownFunction(name.into()))?;
        match function {
            Function::Regex => functions::regex(body, &args),
            Function::Json => functions::json(body, &args),
            Function::Header => functions::header(scope.response, &args),
            Function::Base64 => functions::base64(&args),
            Function::Random => match self.names.as_deref_mut() {
                Some(ctx) => functions::random(&args, ctx.rng()),
                None => functions::random(&args, &mut rand::thread_rng()),
            },
        }
    }
}
