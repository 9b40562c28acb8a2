use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ApiError;

/// Longest accepted model version description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 255;

/// Server-assigned record identifier; the API has used both integers and strings.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum RecordId {
    Int(u64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{}", id),
            RecordId::Text(id) => f.write_str(id),
        }
    }
}

/// Response to the create step of an upload.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct CreatedVersion {
    pub model_version_id: Option<RecordId>,
    pub presigned_url: Option<String>,
    pub filepath: Option<String>,
    pub version: Option<u64>,
}

/// A model version as stored by the server.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct ModelVersionRecord {
    #[serde(default)]
    pub id: Option<RecordId>,
    pub version: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub filepath: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Metadata returned after a successful upload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UploadedVersion {
    pub version: u64,
    pub name: Option<String>,
    pub description: Option<String>,
    pub model: Option<String>,
}

impl From<ModelVersionRecord> for UploadedVersion {
    fn from(record: ModelVersionRecord) -> Self {
        Self {
            version: record.version,
            name: record.name,
            description: record.description,
            model: record.model,
        }
    }
}

/// One entry of a model's version history.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VersionSummary {
    pub version: u64,
    pub name: Option<String>,
    pub updated_at: Option<String>,
    pub description: Option<String>,
}

impl From<ModelVersionRecord> for VersionSummary {
    fn from(record: ModelVersionRecord) -> Self {
        Self {
            version: record.version,
            name: record.name,
            updated_at: record.updated_at,
            description: record.description,
        }
    }
}

/// A deployment target with internal identifiers removed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EnvironmentGroup {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_count: Option<u64>,
    /// Remaining server attributes, e.g. nested model groups.
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// Version selector for a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeployVersion {
    #[default]
    Latest,
    Number(u64),
}

impl FromStr for DeployVersion {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "latest" {
            return Ok(DeployVersion::Latest);
        }
        s.parse::<u64>().map(DeployVersion::Number).map_err(|_| {
            ApiError::InvalidParam(format!(
                "Version must be an integer or \"latest\", got \"{}\"",
                s
            ))
        })
    }
}

impl fmt::Display for DeployVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployVersion::Latest => f.write_str("latest"),
            DeployVersion::Number(n) => write!(f, "{}", n),
        }
    }
}

impl Serialize for DeployVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DeployVersion::Latest => serializer.serialize_str("latest"),
            DeployVersion::Number(n) => serializer.serialize_u64(*n),
        }
    }
}

/// What to deploy and where.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DeploySpec {
    pub version: DeployVersion,
    pub environment: String,
}

impl Default for DeploySpec {
    fn default() -> Self {
        Self {
            version: DeployVersion::Latest,
            environment: "dev".to_string(),
        }
    }
}

impl DeploySpec {
    pub fn new(version: DeployVersion, environment: impl Into<String>) -> Self {
        Self {
            version,
            environment: environment.into(),
        }
    }
}

/// Acknowledgement of a successful deployment.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DeployReceipt {
    pub environment: String,
    pub version: DeployVersion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Body of a deploy response. Every field is optional; older servers answer
/// with a bare message.
#[derive(Deserialize, Debug, Default, PartialEq)]
pub(crate) struct DeployReply {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub version: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl DeployReply {
    pub fn parse(body: &str) -> Self {
        let body = body.trim();
        if body.is_empty() {
            return Self::default();
        }
        match serde_json::from_str::<DeployReply>(body) {
            Ok(reply) => reply,
            Err(_) => Self {
                message: Some(body.trim_matches('"').to_string()),
                ..Self::default()
            },
        }
    }
}

/// Checks a description against the length limit. Empty descriptions are dropped.
pub fn check_description(description: Option<&str>) -> Result<Option<String>, ApiError> {
    match description {
        None | Some("") => Ok(None),
        Some(text) if text.chars().count() > MAX_DESCRIPTION_LEN => {
            Err(ApiError::InvalidParam(format!(
                "Description too long. Please provide a description that is at most {} characters",
                MAX_DESCRIPTION_LEN
            )))
        }
        Some(text) => Ok(Some(text.to_string())),
    }
}
