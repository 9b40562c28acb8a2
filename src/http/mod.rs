//! HTTP transport: authenticated single requests, status classification and
//! streamed downloads.

mod client;
mod status;

use std::time::Duration;

pub use client::{HttpClient, HttpMethod, Payload, RequestOptions};
pub use status::{check_status, classify_status, redact_url};

/// Timeout applied to each request when the caller does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Buffer size for writing streamed downloads to disk.
pub const DOWNLOAD_CHUNK_SIZE: usize = 512 * 1024;

/// Header carrying the caller's API token (`X-API-TOKEN`).
pub const TOKEN_HEADER: &str = "x-api-token";
