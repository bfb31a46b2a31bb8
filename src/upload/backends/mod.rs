//! Built-in upload backends.

pub mod custom;
pub mod imgur;
pub mod s3;

pub use custom::CustomUploader;
pub use imgur::ImgurUploader;
pub use s3::AmazonS3Uploader;
