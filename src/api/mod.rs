//! Extraction API module
//!
//! This module talks to the remote extraction service:
//! - [`client::ApiClient`] - presigned-URL request, upload, probe and result fetch
//! - [`types`] - request/response bodies and the selected file

pub mod client;
pub mod types;

// Re-export commonly used types
pub use client::ApiClient;
pub use types::{FileHandle, PresignedUrlPair};
