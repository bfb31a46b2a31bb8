//! # droplift-custom
//!
//! User-defined HTTP uploaders driven by templates instead of code.
//!
//! A [`CustomUploaderItem`] describes the request (method, URL, parameters,
//! headers, body) and how to read the response (result URL, thumbnail,
//! deletion URL, error message). Templates use a small placeholder language,
//! see [`syntax`] and [`functions`]. Items are stored as `.sxcu` JSON
//! documents; older documents are upgraded by [`migrate`] on load.
//!
//! ## Example
//!
//! ```
//! use droplift_common::{ErrorList, ResponseInfo};
//! use droplift_custom::CustomUploaderItem;
//!
//! let item = CustomUploaderItem::from_json(r#"{
//!     "Version": "14.0.0",
//!     "RequestURL": "https://i.example.com/upload",
//!     "Body": "MultipartFormData",
//!     "FileFormName": "file",
//!     "URL": "{json:files[0].url}"
//! }"#).unwrap();
//!
//! let response = ResponseInfo {
//!     status: 200,
//!     body: r#"{"files":[{"url":"https://i.example.com/f/1.png"}]}"#.into(),
//!     ..Default::default()
//! };
//! let mut errors = ErrorList::new("i.example.com error");
//! let result = item.try_parse_response(&response, "1.png", &mut errors, false);
//! assert_eq!(result.url, "https://i.example.com/f/1.png");
//! ```

pub mod engine;
pub mod error;
pub mod functions;
pub mod item;
pub mod migrate;
pub mod request;
mod response;
pub mod syntax;
pub mod urls;

pub use error::{Result, TemplateError};
pub use item::{
    CustomUploaderBody, CustomUploaderItem, DestinationKind, DestinationType, HttpMethod,
    ResponseType,
};
pub use migrate::CURRENT_VERSION;
pub use request::{PreparedRequest, RequestBody, UploaderInput};
