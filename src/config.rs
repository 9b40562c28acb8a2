use std::path::PathBuf;
use std::time::Duration;

use crate::http::DEFAULT_TIMEOUT;

/// Base URL for metadata and management requests.
pub const API_BASE_URL: &str = "https://api.skafos.ai/v2";

/// Base URL for model artifact downloads.
pub const DOWNLOAD_BASE_URL: &str = "https://download.skafos.ai/v2";

/// Settings shared by every operation of a [`Client`](crate::client::Client).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub download_url: String,
    /// Upper bound for each individual HTTP call.
    pub timeout: Duration,
    /// Directory that relative input paths and downloads resolve against.
    /// `None` uses the process working directory.
    pub working_dir: Option<PathBuf>,
    /// Directory where upload archives are staged.
    /// `None` stages each archive in its own temporary directory.
    pub staging_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: API_BASE_URL.to_string(),
            download_url: DOWNLOAD_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            working_dir: None,
            staging_dir: None,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = trim_base(url.into());
        self
    }

    pub fn with_download_url(mut self, url: impl Into<String>) -> Self {
        self.download_url = trim_base(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.api_url, "https://api.skafos.ai/v2");
        assert_eq!(config.download_url, "https://download.skafos.ai/v2");
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert!(config.working_dir.is_none());
        assert!(config.staging_dir.is_none());
    }

    #[test]
    fn test_builder_trims_trailing_slash() {
        let config = ClientConfig::new()
            .with_api_url("http://127.0.0.1:1234/")
            .with_download_url("http://127.0.0.1:5678//");
        assert_eq!(config.api_url, "http://127.0.0.1:1234");
        assert_eq!(config.download_url, "http://127.0.0.1:5678");
    }
}
