//! Droplift-Common: Shared types and utilities.
//!
//! This crate provides the pieces every other droplift crate agrees on:
//!
//! - **Error Handling**: a unified [`Error`] tagged with an [`ErrorClass`]
//!   (retryable, non-retryable, configuration)
//! - **Upload Types**: [`UploadResult`], [`ErrorList`] and [`ResponseInfo`],
//!   the uniform shape every backend reports through
//! - **Path Utilities**: extension checks and outgoing file name sanitizing
//!
//! # Examples
//!
//! ```
//! use droplift_common::{Error, ErrorClass, UploadResult};
//! use droplift_common::paths::remove_bidi_control_characters;
//!
//! let err = Error::config("no backend registered for destination");
//! assert_eq!(err.class(), ErrorClass::Configuration);
//!
//! let result = UploadResult::from_url("https://example.com/a.png");
//! assert!(result.is_success());
//!
//! assert_eq!(remove_bidi_control_characters("a\u{202E}b.png"), "ab.png");
//! ```

pub mod error;
pub mod paths;
pub mod types;

pub use error::{Error, ErrorClass, Result};
pub use types::*;
