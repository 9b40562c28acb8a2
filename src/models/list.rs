use anyhow::{Context, Result};
use log::debug;
use serde_json::Value;

use super::types::{EnvironmentGroup, ModelVersionRecord, VersionSummary};
use crate::client::Client;
use crate::error::invalid_connection_params;
use crate::params::ConnectionParams;
use crate::runtime::Runtime;

impl<R: Runtime> Client<R> {
    /// All versions of the model, in the order the server returns them
    /// (ascending version number).
    #[tracing::instrument(skip(self, params))]
    pub async fn list_versions(&self, params: &ConnectionParams) -> Result<Vec<VersionSummary>> {
        let url = self.api_url(&format!(
            "{}/model_versions?order_by=version",
            params.model_path()
        ));
        let records: Vec<ModelVersionRecord> = self
            .http
            .get_json(&url, &params.api_token)
            .await
            .map_err(invalid_connection_params)?;

        debug!("Found {} version(s) of {}", records.len(), params.model_name);
        Ok(records.into_iter().map(VersionSummary::from).collect())
    }

    /// Deployment targets of the model, with device counts and without any
    /// internal identifiers.
    #[tracing::instrument(skip(self, params))]
    pub async fn list_environments(
        &self,
        params: &ConnectionParams,
    ) -> Result<Vec<EnvironmentGroup>> {
        let url = self.api_url(&format!(
            "{}/environment_groups?with_device_counts=true",
            params.model_path()
        ));
        let mut groups: Value = self
            .http
            .get_json(&url, &params.api_token)
            .await
            .map_err(invalid_connection_params)?;

        strip_ids(&mut groups);
        serde_json::from_value(groups).context("Unexpected environment group response")
    }
}

fn is_id_key(key: &str) -> bool {
    key == "id" || key.ends_with("_id")
}

/// Removes every `id` and `*_id` key, at any depth.
fn strip_ids(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !is_id_key(key));
            map.values_mut().for_each(strip_ids);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_ids),
        _ => {}
    }
}
