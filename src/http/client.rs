//! HTTP client issuing single authenticated requests.

use anyhow::{Context, Result};
use log::debug;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::fmt;
use std::io::{BufWriter, Write};
use std::str::FromStr;
use std::time::Duration;

use super::status::{check_status, redact_url};
use super::{DEFAULT_TIMEOUT, DOWNLOAD_CHUNK_SIZE, TOKEN_HEADER};
use crate::error::ApiError;

/// The verbs the Skafos API is driven with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
}

impl FromStr for HttpMethod {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            _ => Err(ApiError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
        };
        f.write_str(verb)
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

/// Request body.
#[derive(Debug, Clone, Default)]
pub enum Payload {
    #[default]
    Empty,
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

/// Per-request settings on top of the method, URL and token.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Extra headers; these replace the defaults with the same name.
    pub headers: HeaderMap,
    /// Overrides the client's timeout for this request.
    pub timeout: Option<Duration>,
    pub payload: Payload,
    /// Leave the API token off, for URLs that carry their own authorization.
    pub skip_token: bool,
}

impl RequestOptions {
    pub fn json(body: serde_json::Value) -> Self {
        Self {
            payload: Payload::Json(body),
            ..Self::default()
        }
    }

    /// Raw bytes sent as `application/octet-stream`.
    pub fn octet_stream(bytes: Vec<u8>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );
        Self {
            headers,
            payload: Payload::Bytes(bytes),
            ..Self::default()
        }
    }

    pub fn without_token(mut self) -> Self {
        self.skip_token = true;
        self
    }
}

/// Thin wrapper over `reqwest::Client` that authenticates every request and
/// classifies failures. Nothing is retried.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends one request and returns the response if its status is 2xx.
    ///
    /// Connection errors and timeouts are returned as the original
    /// `reqwest::Error`; HTTP failures become an [`ApiError`].
    #[tracing::instrument(skip(self, url, token, options), fields(url = %redact_url(url)))]
    pub async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        token: &str,
        options: RequestOptions,
    ) -> Result<Response> {
        let timeout = options.timeout.unwrap_or(self.timeout);
        let token = (!options.skip_token).then_some(token);
        let headers = build_headers(token, options.headers)?;

        let mut builder = self
            .client
            .request(method.into(), url)
            .headers(headers)
            .timeout(timeout);
        builder = match options.payload {
            Payload::Empty => builder,
            Payload::Json(body) => builder.body(serde_json::to_vec(&body)?),
            Payload::Bytes(bytes) => builder.body(bytes),
        };

        debug!("Sending {} request to {}", method, redact_url(url));
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                if e.is_timeout() {
                    debug!(
                        "Request timed out after {} seconds, consider increasing the timeout",
                        timeout.as_secs()
                    );
                } else {
                    debug!("Error connecting to server: {}", e);
                }
                return Err(e.into());
            }
        };

        check_status(response)
    }

    /// Performs a GET request and deserializes the JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, token: &str) -> Result<T> {
        self.send_json(HttpMethod::Get, url, token, RequestOptions::default())
            .await
    }

    /// Sends a request and deserializes the JSON response.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        url: &str,
        token: &str,
        options: RequestOptions,
    ) -> Result<T> {
        let response = self.request(method, url, token, options).await?;
        let result = response
            .json::<T>()
            .await
            .context("Failed to parse JSON response from Skafos")?;
        Ok(result)
    }

    /// Streams a GET response body into a writer.
    ///
    /// The writer is only created once the server has answered with a success
    /// status, so a failed request never produces a file. Chunks are buffered
    /// up to [`DOWNLOAD_CHUNK_SIZE`] before being written.
    #[tracing::instrument(skip(self, token, create_writer))]
    pub async fn download_file<W, F>(&self, url: &str, token: &str, create_writer: F) -> Result<u64>
    where
        W: Write,
        F: FnOnce() -> Result<W>,
    {
        let mut response = self
            .request(HttpMethod::Get, url, token, RequestOptions::default())
            .await?;

        let mut writer = BufWriter::with_capacity(DOWNLOAD_CHUNK_SIZE, create_writer()?);
        let mut downloaded_bytes: u64 = 0;

        while let Some(chunk) = response.chunk().await? {
            writer
                .write_all(&chunk)
                .context("Failed to write chunk to file")?;
            downloaded_bytes += chunk.len() as u64;
        }
        writer.flush().context("Failed to flush downloaded file")?;

        debug!(
            "Downloaded {:.2} MB",
            downloaded_bytes as f64 / (1024.0 * 1024.0)
        );

        Ok(downloaded_bytes)
    }
}

fn build_headers(token: Option<&str>, overrides: HeaderMap) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    if let Some(token) = token {
        let mut token_value = HeaderValue::from_str(token).map_err(|_| {
            ApiError::InvalidParam(
                "API token contains characters that are not allowed in an HTTP header"
                    .to_string(),
            )
        })?;
        token_value.set_sensitive(true);
        headers.insert(HeaderName::from_static(TOKEN_HEADER), token_value);
    }
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    headers.extend(overrides);
    Ok(headers)
}
