//! # droplift-naming
//!
//! Name templates for files picked up by the watcher.
//!
//! A pattern mixes literal text with `%` tokens: date and time parts,
//! auto-increment counters, random strings and a few specials. Tokens may
//! carry a `{N}` parameter (`%ra{6}` is six random alphanumerics).
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use chrono::DateTime;
//! use droplift_naming::{Counters, NameContext, NameTemplate};
//!
//! let now = DateTime::parse_from_rfc3339("2024-03-05T13:04:05+00:00").unwrap();
//! let mut ctx = NameContext::new(now, Arc::new(Counters::new()));
//!
//! let name = NameTemplate::compile("%y%mo%dT%h%mi%s_%ra{6}").render(&mut ctx);
//! assert!(name.starts_with("20240305T130405_"));
//! assert_eq!(name.len(), 22);
//! ```

pub mod context;
pub mod counters;
pub mod template;
pub mod tokens;

pub use context::{Clock, FixedClock, NameContext, SystemClock};
pub use counters::Counters;
pub use template::{render, NameTemplate, Segment};
pub use tokens::TokenKind;

/// Default pattern for files picked up by the watcher.
pub const DEFAULT_PATTERN: &str = "%y%mo%dT%h%mi%s_%ra{6}";
