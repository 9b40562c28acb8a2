use anyhow::Result;
use log::info;
use serde_json::json;

use super::types::{DeployReceipt, DeployReply, DeploySpec, DeployVersion};
use crate::client::Client;
use crate::error::ApiError;
use crate::http::{HttpMethod, RequestOptions};
use crate::params::ConnectionParams;
use crate::runtime::Runtime;

impl<R: Runtime> Client<R> {
    /// Makes a version available to the devices of one environment.
    #[tracing::instrument(skip(self, params))]
    pub async fn deploy_version(
        &self,
        spec: &DeploySpec,
        params: &ConnectionParams,
    ) -> Result<DeployReceipt> {
        let environment = spec.environment.trim();
        if environment.is_empty() {
            return Err(ApiError::InvalidParam(
                "Please provide an environment to deploy to".to_string(),
            )
            .into());
        }

        let url = self.api_url(&format!("{}/deploy", params.model_path()));
        let body = json!({ "version": spec.version, "environment": environment });

        let response = self
            .http
            .request(
                HttpMethod::Post,
                &url,
                &params.api_token,
                RequestOptions::json(body),
            )
            .await
            .map_err(|e| deploy_failed(e, spec.version, environment))?;

        let reply = DeployReply::parse(&response.text().await?);
        if reply.success == Some(false) {
            return Err(ApiError::DeployFailed(reply.message.unwrap_or_else(|| {
                format!(
                    "the server declined to deploy version {} to {}",
                    spec.version, environment
                )
            }))
            .into());
        }

        let version = reply
            .version
            .map(DeployVersion::Number)
            .unwrap_or(spec.version);
        info!("Deployed version {} to {}", version, environment);

        Ok(DeployReceipt {
            environment: environment.to_string(),
            version,
            message: reply.message,
        })
    }
}

/// Client errors from the deploy endpoint mean the version or environment
/// was refused. A rejected token is still reported as such.
fn deploy_failed(err: anyhow::Error, version: DeployVersion, environment: &str) -> anyhow::Error {
    match err.downcast_ref::<ApiError>() {
        Some(ApiError::RequestFailed { status, .. }) if (400..500).contains(status) => {
            ApiError::DeployFailed(format!(
                "could not deploy version {} to {} (HTTP {})",
                version, environment, status
            ))
            .into()
        }
        _ => err,
    }
}
