use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use log::info;
use serde::Serialize;

use crate::archive::archive_filename;
use crate::cleanup::CleanupGuard;
use crate::client::Client;
use crate::error::{ApiError, on_not_found};
use crate::params::ConnectionParams;
use crate::runtime::Runtime;

/// A model archive saved to the working directory.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FetchedVersion {
    pub path: PathBuf,
    pub bytes: u64,
    /// The requested version; `None` means the latest one was fetched.
    pub version: Option<u64>,
}

impl<R: Runtime> Client<R> {
    /// Downloads a model version into `<model>.zip` in the working directory.
    ///
    /// An existing file with that name is never overwritten. If the transfer
    /// fails midway the partial file is removed.
    #[tracing::instrument(skip(self, params))]
    pub async fn fetch_version(
        &self,
        version: Option<u64>,
        params: &ConnectionParams,
    ) -> Result<FetchedVersion> {
        let target = self
            .working_dir()?
            .join(archive_filename(&params.model_name));
        if self.runtime.exists(&target) {
            return Err(target_exists(&target).into());
        }

        let mut url = self.download_url(&params.model_path());
        if let Some(version) = version {
            url = format!("{}?version={}", url, version);
        }

        let mut partial = CleanupGuard::new();
        let result = self
            .http
            .download_file(&url, &params.api_token, || {
                // The target may have appeared while the request was in flight
                let file = self.runtime.create_new_file(&target).map_err(|e| {
                    let kind = e.downcast_ref::<io::Error>().map(io::Error::kind);
                    if kind == Some(io::ErrorKind::AlreadyExists) {
                        anyhow::Error::from(target_exists(&target))
                    } else {
                        e.context(format!("Failed to create {:?}", target))
                    }
                })?;
                partial.track(target.clone());
                Ok(file)
            })
            .await;

        let bytes = result.map_err(|e| {
            on_not_found(e, || {
                ApiError::DownloadFailed(match version {
                    Some(v) => format!(
                        "version {} of model {} was not found",
                        v, params.model_name
                    ),
                    None => format!("model {} has no versions to fetch", params.model_name),
                })
            })
        })?;
        partial.disarm();

        info!("Saved model to {}", target.display());
        Ok(FetchedVersion {
            path: target,
            bytes,
            version,
        })
    }
}

fn target_exists(target: &Path) -> ApiError {
    ApiError::InvalidParam(format!(
        "{} already exists. Move or remove it before fetching a model version.",
        target.display()
    ))
}
