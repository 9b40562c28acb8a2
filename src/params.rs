//! Connection parameter resolution.
//!
//! Explicit values always win. Environment fallbacks are read once into
//! [`EnvDefaults`] at session start and merged by a pure resolver, so the
//! operations themselves never touch the process environment.

use std::fmt;

use crate::error::{ApiError, ParamField};
use crate::runtime::Runtime;

/// Identifies the organization, app and model a call targets, plus the token
/// used to authenticate it. All fields are non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub api_token: String,
    pub org_name: String,
    pub app_name: String,
    pub model_name: String,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("api_token", &mask_token(&self.api_token))
            .field("org_name", &self.org_name)
            .field("app_name", &self.app_name)
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl ConnectionParams {
    /// Merges explicit values with environment defaults.
    ///
    /// Fields are checked in the order token, org, app, model; the first one
    /// that is absent from both sources is reported.
    pub fn resolve(explicit: &ParamOverrides, defaults: &EnvDefaults) -> Result<Self, ApiError> {
        let api_token = pick(
            ParamField::ApiToken,
            &explicit.api_token,
            &defaults.api_token,
        )?;
        let org_name = pick(ParamField::OrgName, &explicit.org_name, &defaults.org_name)?;
        let app_name = pick(ParamField::AppName, &explicit.app_name, &defaults.app_name)?;
        let model_name = pick(
            ParamField::ModelName,
            &explicit.model_name,
            &defaults.model_name,
        )?;

        Ok(Self {
            api_token,
            org_name,
            app_name,
            model_name,
        })
    }

    /// URL path of the model resource, without a leading base URL.
    pub fn model_path(&self) -> String {
        format!(
            "/organizations/{}/apps/{}/models/{}",
            self.org_name, self.app_name, self.model_name
        )
    }
}

/// Values passed explicitly by the caller. `None` defers to the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamOverrides {
    pub api_token: Option<String>,
    pub org_name: Option<String>,
    pub app_name: Option<String>,
    pub model_name: Option<String>,
}

impl ParamOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn org_name(mut self, org: impl Into<String>) -> Self {
        self.org_name = Some(org.into());
        self
    }

    pub fn app_name(mut self, app: impl Into<String>) -> Self {
        self.app_name = Some(app.into());
        self
    }

    pub fn model_name(mut self, model: impl Into<String>) -> Self {
        self.model_name = Some(model.into());
        self
    }
}

/// Fallback values read from `SKAFOS_*` environment variables.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct EnvDefaults {
    pub api_token: Option<String>,
    pub org_name: Option<String>,
    pub app_name: Option<String>,
    pub model_name: Option<String>,
}

impl fmt::Debug for EnvDefaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvDefaults")
            .field("api_token", &self.api_token.as_deref().map(mask_token))
            .field("org_name", &self.org_name)
            .field("app_name", &self.app_name)
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl EnvDefaults {
    /// Reads all four fallbacks. Unset or empty variables are treated as absent.
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime + ?Sized>(runtime: &R) -> Self {
        let read = |field: ParamField| {
            runtime
                .env_var(field.env_var())
                .ok()
                .filter(|value| !value.is_empty())
        };

        let defaults = Self {
            api_token: read(ParamField::ApiToken),
            org_name: read(ParamField::OrgName),
            app_name: read(ParamField::AppName),
            model_name: read(ParamField::ModelName),
        };
        log::debug!("Loaded environment defaults: {:?}", defaults);
        defaults
    }
}

/// Resolves only the API token, for calls that are not scoped to a model.
pub fn resolve_token(explicit: Option<&str>, defaults: &EnvDefaults) -> Result<String, ApiError> {
    pick(
        ParamField::ApiToken,
        &explicit.map(str::to_string),
        &defaults.api_token,
    )
}

fn pick(
    field: ParamField,
    explicit: &Option<String>,
    fallback: &Option<String>,
) -> Result<String, ApiError> {
    explicit
        .as_ref()
        .or(fallback.as_ref())
        .filter(|value| !value.is_empty())
        .cloned()
        .ok_or(ApiError::MissingParam(field))
}

/// Shows only the outer characters of a token, for debug output.
pub(crate) fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}*********{}", head, tail)
}
