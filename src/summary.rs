//! Account summary: every organization, app and model a token can reach.

use anyhow::Result;
use async_trait::async_trait;
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::http::HttpClient;
use crate::params::resolve_token;
use crate::runtime::Runtime;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Organization {
    pub display_name: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct App {
    pub name: String,
    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

/// Model entry as listed under an app.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// One model in the flat summary.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SummaryEntry {
    pub org_name: String,
    pub app_name: String,
    pub model_name: String,
}

/// `org -> app -> models`, in the order the server listed them.
pub type CompactSummary = IndexMap<String, IndexMap<String, Vec<ModelInfo>>>;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Summary {
    Full(Vec<SummaryEntry>),
    Compact(CompactSummary),
}

impl Summary {
    /// Number of models listed.
    pub fn model_count(&self) -> usize {
        match self {
            Summary::Full(entries) => entries.len(),
            Summary::Compact(orgs) => orgs
                .values()
                .flat_map(|apps| apps.values())
                .map(Vec::len)
                .sum(),
        }
    }
}

/// The organization/app/model hierarchy visible to a token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountTree {
    pub organizations: Vec<(String, Vec<App>)>,
}

impl AccountTree {
    pub fn flatten(&self) -> Vec<SummaryEntry> {
        self.organizations
            .iter()
            .flat_map(|(org, apps)| {
                apps.iter().flat_map(move |app| {
                    app.models.iter().map(move |model| SummaryEntry {
                        org_name: org.clone(),
                        app_name: app.name.clone(),
                        model_name: model.name.clone(),
                    })
                })
            })
            .collect()
    }

    /// Apps sharing a name within an organization are merged so that both
    /// shapes list the same models.
    pub fn compact(&self) -> CompactSummary {
        let mut summary = CompactSummary::new();
        for (org, apps) in &self.organizations {
            let entry = summary.entry(org.clone()).or_default();
            for app in apps {
                entry
                    .entry(app.name.clone())
                    .or_default()
                    .extend(app.models.iter().cloned());
            }
        }
        summary
    }

    pub fn into_summary(self, compact: bool) -> Summary {
        if compact {
            Summary::Compact(self.compact())
        } else {
            Summary::Full(self.flatten())
        }
    }
}

/// Read access to the account hierarchy.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn organizations(&self, token: &str) -> Result<Vec<Organization>>;
    async fn apps(&self, token: &str, org_name: &str) -> Result<Vec<App>>;
}

/// [`AccountDirectory`] backed by the Skafos API.
pub struct SkafosDirectory<'a> {
    http: &'a HttpClient,
    api_url: &'a str,
}

impl<'a> SkafosDirectory<'a> {
    pub fn new(http: &'a HttpClient, api_url: &'a str) -> Self {
        Self { http, api_url }
    }
}

#[async_trait]
impl<'a> AccountDirectory for SkafosDirectory<'a> {
    #[tracing::instrument(skip(self, token))]
    async fn organizations(&self, token: &str) -> Result<Vec<Organization>> {
        self.http
            .get_json(&format!("{}/organizations", self.api_url), token)
            .await
    }

    #[tracing::instrument(skip(self, token))]
    async fn apps(&self, token: &str, org_name: &str) -> Result<Vec<App>> {
        self.http
            .get_json(
                &format!(
                    "{}/organizations/{}/apps?with_models=true",
                    self.api_url, org_name
                ),
                token,
            )
            .await
    }
}

/// Walks organizations, then each organization's apps, one request at a time.
pub async fn collect_account<D: AccountDirectory + ?Sized>(
    directory: &D,
    token: &str,
) -> Result<AccountTree> {
    let mut tree = AccountTree::default();
    for org in directory.organizations(token).await? {
        let apps = directory.apps(token, &org.display_name).await?;
        debug!("{} has {} app(s)", org.display_name, apps.len());
        tree.organizations.push((org.display_name, apps));
    }
    Ok(tree)
}

impl<R: Runtime> Client<R> {
    /// Everything the token can reach, flat or nested.
    ///
    /// `token` falls back to `SKAFOS_API_TOKEN`.
    #[tracing::instrument(skip(self, token))]
    pub async fn summary(&self, token: Option<&str>, compact: bool) -> Result<Summary> {
        let token = resolve_token(token, &self.env_defaults())?;
        let directory = SkafosDirectory::new(&self.http, &self.config.api_url);
        let tree = collect_account(&directory, &token).await?;
        Ok(tree.into_summary(compact))
    }
}
