use anyhow::{Context, Result};
use log::{debug, info};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::types::{CreatedVersion, ModelVersionRecord, UploadedVersion, check_description};
use crate::archive::{ArchiveBuilder, FileList, archive_filename};
use crate::client::Client;
use crate::error::{ApiError, invalid_connection_params};
use crate::http::{HttpMethod, RequestOptions};
use crate::params::ConnectionParams;
use crate::runtime::Runtime;

impl<R: Runtime> Client<R> {
    /// Packages `files` and registers them as a new version of the model.
    ///
    /// The upload runs in three steps: create the version record, store the
    /// archive at the presigned location the server hands back, then record
    /// the stored path on the version. A synthesized archive is removed
    /// afterwards whether or not the upload succeeded.
    #[tracing::instrument(skip(self, files, params))]
    pub async fn upload_version(
        &self,
        files: impl Into<FileList>,
        description: Option<&str>,
        params: &ConnectionParams,
    ) -> Result<UploadedVersion> {
        let files = files.into();
        let description = check_description(description)?;

        let archive = ArchiveBuilder::new(&self.runtime, self.working_dir()?)
            .with_staging_dir(self.config.staging_dir.clone())
            .build(&params.model_name, &files)?;

        let token = params.api_token.as_str();
        let versions_url = self.api_url(&format!("{}/model_versions", params.model_path()));

        let mut body = json!({ "filename": archive_filename(&params.model_name) });
        if let Some(description) = &description {
            body["description"] = json!(description);
        }

        let response = self
            .http
            .request(HttpMethod::Post, &versions_url, token, RequestOptions::json(body))
            .await
            .map_err(invalid_connection_params)
            .map_err(|e| upload_step_failed(e, "Creating the model version"))?;
        let created: CreatedVersion = read_record(response, "create").await?;

        let presigned_url = created
            .presigned_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                ApiError::UploadFailed("the server did not return an upload location".to_string())
            })?;
        let filepath = created.filepath.ok_or_else(|| {
            ApiError::UploadFailed("the server did not return a storage path".to_string())
        })?;
        let version_id = created.model_version_id.ok_or_else(|| {
            ApiError::UploadFailed("the server did not return a model version id".to_string())
        })?;

        let data = self
            .runtime
            .read(archive.path())
            .with_context(|| format!("Failed to read archive {:?}", archive.path()))?;
        info!("Uploading model version to Skafos.");
        debug!("Storing {} bytes", data.len());

        let response = self
            .http
            .request(
                HttpMethod::Put,
                &presigned_url,
                token,
                RequestOptions::octet_stream(data).without_token(),
            )
            .await
            .map_err(|e| upload_step_failed(e, "Storing the archive"))?;
        expect_ok(&response, "Storing the archive")?;

        let record_url = self.api_url(&format!(
            "{}/model_versions/{}",
            params.model_path(),
            version_id
        ));
        let response = self
            .http
            .request(
                HttpMethod::Patch,
                &record_url,
                token,
                RequestOptions::json(json!({ "filepath": filepath })),
            )
            .await
            .map_err(|e| upload_step_failed(e, "Finalizing the model version"))?;
        expect_ok(&response, "Finalizing the model version")?;
        let record: ModelVersionRecord = read_record(response, "finalize").await?;

        info!("Successfully uploaded version {}", record.version);
        drop(archive);
        Ok(UploadedVersion::from(record))
    }
}

/// Turns a generic HTTP failure of one upload step into an upload error.
/// Token rejections and connection errors pass through unchanged.
fn upload_step_failed(err: anyhow::Error, step: &str) -> anyhow::Error {
    match err.downcast_ref::<ApiError>() {
        Some(ApiError::RequestFailed { status, .. }) => {
            ApiError::UploadFailed(format!("{} returned HTTP {}", step, status)).into()
        }
        _ => err,
    }
}

fn expect_ok(response: &Response, step: &str) -> Result<(), ApiError> {
    if response.status() == StatusCode::OK {
        Ok(())
    } else {
        Err(ApiError::UploadFailed(format!(
            "{} returned HTTP {} instead of 200",
            step,
            response.status().as_u16()
        )))
    }
}

async fn read_record<T: DeserializeOwned>(response: Response, step: &str) -> Result<T> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| {
        anyhow::Error::from(ApiError::UploadFailed(format!(
            "unexpected {} response: {}",
            step, e
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::runtime::RealRuntime;
    use crate::test_utils::{connection, test_client};
    use mockito::Matcher;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    const VERSIONS_PATH: &str = "/organizations/acme/apps/demo/models/classifier/model_versions";

    fn write_model(dir: &Path) {
        fs::write(dir.join("model.mlmodel"), b"weights").unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn test_upload_three_steps() {
        let mut server = mockito::Server::new_async().await;
        let work = tempdir().unwrap();
        let staging = tempdir().unwrap();
        write_model(work.path());

        let create = server
            .mock("POST", VERSIONS_PATH)
            .match_header("x-api-token", "tok")
            .match_body(Matcher::Json(
                json!({"filename": "classifier.zip", "description": "v1"}),
            ))
            .with_status(201)
            .with_body(
                json!({
                    "model_version_id": 7,
                    "presigned_url": format!("{}/bucket/classifier.zip?sig=abc", server.url()),
                    "filepath": "acme/demo/classifier/1/classifier.zip",
                    "version": 1
                })
                .to_string(),
            )
            .create_async()
            .await;
        let store = server
            .mock("PUT", "/bucket/classifier.zip")
            .match_query(Matcher::UrlEncoded("sig".into(), "abc".into()))
            .match_header("content-type", "application/octet-stream")
            .match_header("x-api-token", Matcher::Missing)
            .with_status(200)
            .create_async()
            .await;
        let finalize = server
            .mock("PATCH", format!("{}/7", VERSIONS_PATH).as_str())
            .match_body(Matcher::Json(
                json!({"filepath": "acme/demo/classifier/1/classifier.zip"}),
            ))
            .with_status(200)
            .with_body(
                json!({
                    "id": 7,
                    "version": 1,
                    "name": "classifier",
                    "description": "v1",
                    "model": "classifier",
                    "filepath": "acme/demo/classifier/1/classifier.zip"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let config = ClientConfig::default()
            .with_api_url(server.url())
            .with_working_dir(work.path())
            .with_staging_dir(staging.path());
        let client = Client::new(RealRuntime, config).unwrap();

        let uploaded = client
            .upload_version("model.mlmodel", Some("v1"), &connection())
            .await
            .unwrap();

        create.assert_async().await;
        store.assert_async().await;
        finalize.assert_async().await;
        assert_eq!(
            uploaded,
            UploadedVersion {
                version: 1,
                name: Some("classifier".to_string()),
                description: Some("v1".to_string()),
                model: Some("classifier".to_string()),
            }
        );
        assert!(!staging.path().join("classifier.zip").exists());
        assert!(work.path().join("model.mlmodel").exists());
    }

    #[tokio::test]
    async fn test_upload_rejects_long_description_before_any_request() {
        let mut server = mockito::Server::new_async().await;
        let work = tempdir().unwrap();
        write_model(work.path());
        let create = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = test_client(&server, work.path());
        let err = client
            .upload_version("model.mlmodel", Some("x".repeat(256).as_str()), &connection())
            .await
            .unwrap_err();

        create.assert_async().await;
        assert!(matches!(
            err.downcast_ref::<ApiError>(),
            Some(ApiError::InvalidParam(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_missing_file_is_invalid_param() {
        let server = mockito::Server::new_async().await;
        let work = tempdir().unwrap();

        let client = test_client(&server, work.path());
        let err = client
            .upload_version("missing.mlmodel", None, &connection())
            .await
            .unwrap_err();

        match err.downcast_ref::<ApiError>() {
            Some(ApiError::InvalidParam(msg)) => assert!(msg.contains("missing.mlmodel")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_create_not_found_is_invalid_param() {
        let mut server = mockito::Server::new_async().await;
        let work = tempdir().unwrap();
        let staging = tempdir().unwrap();
        write_model(work.path());
        let _m = server
            .mock("POST", VERSIONS_PATH)
            .with_status(404)
            .create_async()
            .await;

        let config = ClientConfig::default()
            .with_api_url(server.url())
            .with_working_dir(work.path())
            .with_staging_dir(staging.path());
        let client = Client::new(RealRuntime, config).unwrap();
        let err = client
            .upload_version("model.mlmodel", None, &connection())
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ApiError>(),
            Some(ApiError::InvalidParam(_))
        ));
        assert!(!staging.path().join("classifier.zip").exists());
    }

    #[tokio::test]
    async fn test_upload_create_unauthorized_is_invalid_token() {
        let mut server = mockito::Server::new_async().await;
        let work = tempdir().unwrap();
        write_model(work.path());
        let _m = server
            .mock("POST", VERSIONS_PATH)
            .with_status(401)
            .create_async()
            .await;

        let client = test_client(&server, work.path());
        let err = client
            .upload_version("model.mlmodel", None, &connection())
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ApiError>(),
            Some(ApiError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_without_presigned_url_fails() {
        let mut server = mockito::Server::new_async().await;
        let work = tempdir().unwrap();
        write_model(work.path());
        let _m = server
            .mock("POST", VERSIONS_PATH)
            .with_status(201)
            .with_body(json!({"model_version_id": 7, "filepath": "a/b.zip"}).to_string())
            .create_async()
            .await;

        let client = test_client(&server, work.path());
        let err = client
            .upload_version("model.mlmodel", None, &connection())
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ApiError>(),
            Some(ApiError::UploadFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_store_failure_skips_finalize() {
        let mut server = mockito::Server::new_async().await;
        let work = tempdir().unwrap();
        let staging = tempdir().unwrap();
        write_model(work.path());

        let _create = server
            .mock("POST", VERSIONS_PATH)
            .with_status(201)
            .with_body(
                json!({
                    "model_version_id": 7,
                    "presigned_url": format!("{}/bucket/classifier.zip", server.url()),
                    "filepath": "a/b.zip"
                })
                .to_string(),
            )
            .create_async()
            .await;
        let _store = server
            .mock("PUT", "/bucket/classifier.zip")
            .with_status(403)
            .create_async()
            .await;
        let finalize = server
            .mock("PATCH", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let config = ClientConfig::default()
            .with_api_url(server.url())
            .with_working_dir(work.path())
            .with_staging_dir(staging.path());
        let client = Client::new(RealRuntime, config).unwrap();
        let err = client
            .upload_version("model.mlmodel", None, &connection())
            .await
            .unwrap_err();

        finalize.assert_async().await;
        match err.downcast_ref::<ApiError>() {
            Some(ApiError::UploadFailed(msg)) => assert!(msg.contains("403")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!staging.path().join("classifier.zip").exists());
    }

    #[tokio::test]
    async fn test_upload_finalize_with_unexpected_success_status_fails() {
        let mut server = mockito::Server::new_async().await;
        let work = tempdir().unwrap();
        write_model(work.path());

        let _create = server
            .mock("POST", VERSIONS_PATH)
            .with_status(201)
            .with_body(
                json!({
                    "model_version_id": "mv_7",
                    "presigned_url": format!("{}/bucket/classifier.zip", server.url()),
                    "filepath": "a/b.zip"
                })
                .to_string(),
            )
            .create_async()
            .await;
        let _store = server
            .mock("PUT", "/bucket/classifier.zip")
            .with_status(200)
            .create_async()
            .await;
        let _finalize = server
            .mock("PATCH", format!("{}/mv_7", VERSIONS_PATH).as_str())
            .with_status(204)
            .create_async()
            .await;

        let client = test_client(&server, work.path());
        let err = client
            .upload_version("model.mlmodel", None, &connection())
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ApiError>(),
            Some(ApiError::UploadFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_existing_archive_is_sent_and_kept() {
        let mut server = mockito::Server::new_async().await;
        let work = tempdir().unwrap();
        fs::write(work.path().join("classifier.zip"), b"PK\x05\x06prebuilt").unwrap();

        let _create = server
            .mock("POST", VERSIONS_PATH)
            .match_body(Matcher::Json(json!({"filename": "classifier.zip"})))
            .with_status(201)
            .with_body(
                json!({
                    "model_version_id": 3,
                    "presigned_url": format!("{}/bucket/classifier.zip", server.url()),
                    "filepath": "a/b.zip"
                })
                .to_string(),
            )
            .create_async()
            .await;
        let store = server
            .mock("PUT", "/bucket/classifier.zip")
            .match_body(Matcher::Exact("PK\u{5}\u{6}prebuilt".to_string()))
            .with_status(200)
            .create_async()
            .await;
        let _finalize = server
            .mock("PATCH", format!("{}/3", VERSIONS_PATH).as_str())
            .with_status(200)
            .with_body(json!({"version": 4, "name": "classifier"}).to_string())
            .create_async()
            .await;

        let client = test_client(&server, work.path());
        let uploaded = client
            .upload_version("classifier.zip", None, &connection())
            .await
            .unwrap();

        store.assert_async().await;
        assert_eq!(uploaded.version, 4);
        assert_eq!(uploaded.description, None);
        assert!(work.path().join("classifier.zip").exists());
    }
}
