//! Error taxonomy for Skafos operations.
//!
//! Operations return `anyhow::Result`; domain failures are carried as an
//! [`ApiError`] inside the `anyhow::Error` and can be recovered with
//! `err.downcast_ref::<ApiError>()`. Connection-level failures stay as the
//! original `reqwest::Error`.

use std::fmt;

/// Connection parameter identifiers, used to report which value is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamField {
    ApiToken,
    OrgName,
    AppName,
    ModelName,
}

impl ParamField {
    /// Environment variable consulted as a fallback for this field.
    pub fn env_var(&self) -> &'static str {
        match self {
            ParamField::ApiToken => "SKAFOS_API_TOKEN",
            ParamField::OrgName => "SKAFOS_ORG_NAME",
            ParamField::AppName => "SKAFOS_APP_NAME",
            ParamField::ModelName => "SKAFOS_MODEL_NAME",
        }
    }
}

impl fmt::Display for ParamField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamField::ApiToken => "Skafos API token",
            ParamField::OrgName => "organization name",
            ParamField::AppName => "app name",
            ParamField::ModelName => "model name",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A required connection value was neither passed nor set in the environment.
    #[error("Missing {0}. Pass it explicitly or set {var}.", var = .0.env_var())]
    MissingParam(ParamField),

    /// The server rejected the API token (HTTP 401).
    #[error("Invalid Skafos API token: {0}")]
    InvalidToken(String),

    /// A call argument or connection value is malformed or refers to nothing.
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    /// One of the create, store or finalize steps of an upload failed.
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// No model version could be downloaded.
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    /// The server refused to deploy the requested version.
    #[error("Deploy failed: {0}")]
    DeployFailed(String),

    /// Any other non-success HTTP status.
    #[error("Request to {url} failed with HTTP {status}")]
    RequestFailed { status: u16, url: String },

    /// Only GET, POST, PUT and PATCH are issued.
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),
}

impl ApiError {
    /// True for failures caused by an absent or rejected API token.
    pub fn is_credentials(&self) -> bool {
        matches!(
            self,
            ApiError::InvalidToken(_) | ApiError::MissingParam(ParamField::ApiToken)
        )
    }

    /// HTTP status carried by a generic request failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Replaces a 404 request failure with a caller-specific error.
///
/// The transport cannot tell whether a missing resource means bad connection
/// parameters or a missing artifact, so each workflow step decides.
pub fn on_not_found(err: anyhow::Error, replacement: impl FnOnce() -> ApiError) -> anyhow::Error {
    match err.downcast_ref::<ApiError>() {
        Some(ApiError::RequestFailed { status: 404, .. }) => replacement().into(),
        _ => err,
    }
}

/// Whether an error came from a rejected or missing token.
pub fn is_auth_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ApiError>()
        .is_some_and(ApiError::is_credentials)
}

/// Maps a 404 to the generic invalid-parameter error used by most endpoints.
pub fn invalid_connection_params(err: anyhow::Error) -> anyhow::Error {
    on_not_found(err, || {
        ApiError::InvalidParam(
            "Invalid connection parameters. Check your org name, app name, and model name."
                .to_string(),
        )
    })
}
