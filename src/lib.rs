pub mod archive;
pub mod cleanup;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod params;
pub mod runtime;
pub mod summary;

pub use client::Client;
pub use config::ClientConfig;
pub use error::{ApiError, ParamField};
pub use params::{ConnectionParams, EnvDefaults, ParamOverrides};

/// Version of this SDK, taken from `git describe` at build time.
pub fn version() -> &'static str {
    env!("SKAFOS_VERSION")
}
