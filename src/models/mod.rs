//! Model version workflow: upload, fetch, listing and deployment.
//!
//! Every operation is a method on [`Client`](crate::client::Client) and
//! targets the model named by a resolved
//! [`ConnectionParams`](crate::params::ConnectionParams).

mod deploy;
mod fetch;
mod list;
mod types;
mod upload;

pub use fetch::FetchedVersion;
pub use types::{
    DeployReceipt, DeploySpec, DeployVersion, EnvironmentGroup, MAX_DESCRIPTION_LEN,
    ModelVersionRecord, RecordId, UploadedVersion, VersionSummary, check_description,
};
