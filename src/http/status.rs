//! Classification of HTTP responses into the domain error taxonomy.

use anyhow::Result;
use log::debug;
use reqwest::{Response, StatusCode, Url};

use crate::error::ApiError;

/// Maps a non-success status to an [`ApiError`].
///
/// Only 401 has a context-free meaning. A 404 can mean either bad connection
/// parameters or a missing artifact, so it is reported as a plain request
/// failure and reclassified by the workflow that issued the call.
pub fn classify_status(status: StatusCode, url: &str) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED => {
            ApiError::InvalidToken("The server rejected the provided API token".to_string())
        }
        s => ApiError::RequestFailed {
            status: s.as_u16(),
            url: redact_url(url),
        },
    }
}

/// Passes 2xx responses through and turns anything else into an error.
pub fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        debug!("Got HTTP {} from the server", status.as_u16());
        return Ok(response);
    }

    debug!(
        "HTTP error {} from {}",
        status.as_u16(),
        redact_url(response.url().as_str())
    );
    Err(classify_status(status, response.url().as_str()).into())
}

/// Drops the query string, which for presigned storage URLs carries credentials.
pub fn redact_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.to_string()
        }
        Err(_) => url.split('?').next().unwrap_or_default().to_string(),
    }
}
