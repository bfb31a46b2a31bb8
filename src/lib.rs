//! droplift - watch a folder, rename what lands in it, upload it
//!
//! This library crate exposes the pipeline for the binary and for
//! integration testing.

pub mod config;
pub mod events;
pub mod pipeline;
pub mod transcode;
pub mod upload;
pub mod watch;
