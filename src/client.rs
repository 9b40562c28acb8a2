//! Entry point tying configuration, runtime and transport together.
//!
//! The model version workflow lives in [`crate::models`] and the account
//! walk in [`crate::summary`]; both are exposed as methods on [`Client`].

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use reqwest::Client as ReqwestClient;

use crate::config::ClientConfig;
use crate::http::HttpClient;
use crate::params::{ConnectionParams, EnvDefaults, ParamOverrides};
use crate::runtime::Runtime;

/// Build the HTTP client every Skafos request goes through.
pub fn build_http_client(timeout: Duration) -> Result<HttpClient> {
    let client = ReqwestClient::builder()
        .user_agent(format!("skafos-rs/{}", crate::version()))
        .build()
        .context("Failed to build HTTP client")?;

    Ok(HttpClient::new(client).with_timeout(timeout))
}

/// A Skafos session.
///
/// Calls made through one client are issued strictly one after another; the
/// client holds no per-call state.
pub struct Client<R: Runtime> {
    pub(crate) runtime: R,
    pub(crate) config: ClientConfig,
    pub(crate) http: HttpClient,
}

impl<R: Runtime> Client<R> {
    pub fn new(runtime: R, config: ClientConfig) -> Result<Self> {
        let http = build_http_client(config.timeout)?;
        Ok(Self::with_http_client(runtime, config, http))
    }

    pub fn with_http_client(runtime: R, config: ClientConfig, http: HttpClient) -> Self {
        debug!(
            "Skafos client using api {} and download {}",
            config.api_url, config.download_url
        );
        Self {
            runtime,
            config,
            http,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Environment fallbacks for connection parameters, read through the runtime.
    pub fn env_defaults(&self) -> EnvDefaults {
        EnvDefaults::load(&self.runtime)
    }

    /// Resolves explicit values against the `SKAFOS_*` environment.
    pub fn connection(&self, overrides: &ParamOverrides) -> Result<ConnectionParams> {
        Ok(ConnectionParams::resolve(overrides, &self.env_defaults())?)
    }

    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url, path)
    }

    pub(crate) fn download_url(&self, path: &str) -> String {
        format!("{}{}", self.config.download_url, path)
    }

    pub(crate) fn working_dir(&self) -> Result<PathBuf> {
        match &self.config.working_dir {
            Some(dir) => Ok(dir.clone()),
            None => self.runtime.current_dir(),
        }
    }
}
