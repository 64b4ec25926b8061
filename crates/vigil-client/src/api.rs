//! Resource API client using direct HTTP requests.
//!
//! [`ResourceClient`] implements every `vigil-core` source trait over the
//! backend's REST API with a bearer token.
//!
//! ## Example
//!
//! ```no_run
//! use vigil_client::ResourceClient;
//! use vigil_core::config::ApiConfig;
//! use vigil_core::source::ResourceSource;
//! use vigil_core::types::WorkspaceRef;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = ResourceClient::from_config(&ApiConfig::default())?;
//! let scope = WorkspaceRef::new("billing", "my-ws").with_workspace_id("3f9c1c2e");
//! let snapshot = client.fetch(&scope).await?;
//! println!("{} resources", snapshot.len());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::time::Duration;
use tracing::debug;
use vigil_core::config::ApiConfig;
use vigil_core::source::{DetailSource, MigrationSource, ResourceSource, WorkspaceStateSource};
use vigil_core::types::{
    MigrationReport, ResourceDetails, ResourceKind, ResourceRecord, Snapshot, WorkspaceRef,
    WorkspaceStateReport,
};

use crate::api_types::{AppSummary, DetailsResponse, MigrationEntry, RuntimeSummary, WorkspaceResponse};
use crate::error::{ClientError, Result};

/// HTTP client for the resource, workspace, and storage APIs.
pub struct ResourceClient {
    client: reqwest::Client,
    base_url: String,
    storage_url: String,
    token: String,
    timeout_secs: u64,
}

impl ResourceClient {
    /// Create a client, reading the bearer token from `config.token_env`.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let token = std::env::var(&config.token_env).map_err(|_| {
            ClientError::ConfigError(format!("{} environment variable not set", config.token_env))
        })?;
        Self::with_token(config, token)
    }

    /// Create a client with an explicit token.
    pub fn with_token(config: &ApiConfig, token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClientError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            storage_url: config.storage_url.trim_end_matches('/').to_string(),
            token: token.into(),
            timeout_secs: config.timeout_secs,
        })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClientError::Timeout(self.timeout_secs)
                } else {
                    ClientError::from(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_http_status(status, url, &body));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.get(url).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    fn runtimes_url(&self, scope: &WorkspaceRef) -> Result<String> {
        match (&scope.workspace_id, &scope.project) {
            (Some(id), _) => Ok(format!("{}/api/v2/runtimes/{}", self.base_url, id)),
            (None, Some(project)) => Ok(format!("{}/api/google/v1/runtimes/{}", self.base_url, project)),
            (None, None) => Err(ClientError::MissingField {
                resource: scope.to_string(),
                field: "workspace id or project",
            }),
        }
    }

    fn apps_url(&self, scope: &WorkspaceRef) -> Result<String> {
        match (&scope.workspace_id, &scope.project) {
            (Some(id), _) => Ok(format!("{}/api/apps/v2/{}", self.base_url, id)),
            (None, Some(project)) => Ok(format!("{}/api/google/v1/apps/{}", self.base_url, project)),
            (None, None) => Err(ClientError::MissingField {
                resource: scope.to_string(),
                field: "workspace id or project",
            }),
        }
    }

    /// Runtimes visible in a workspace.
    pub async fn list_runtimes(&self, scope: &WorkspaceRef) -> Result<Vec<ResourceRecord>> {
        let runtimes: Vec<RuntimeSummary> = self.get_json(&self.runtimes_url(scope)?).await?;
        Ok(runtimes.into_iter().map(ResourceRecord::from).collect())
    }

    /// Apps visible in a workspace.
    pub async fn list_apps(&self, scope: &WorkspaceRef) -> Result<Vec<ResourceRecord>> {
        let apps: Vec<AppSummary> = self.get_json(&self.apps_url(scope)?).await?;
        Ok(apps.into_iter().map(ResourceRecord::from).collect())
    }

    fn details_url(&self, record: &ResourceRecord) -> Result<String> {
        let segment = match record.kind {
            ResourceKind::App => "apps",
            _ => "runtimes",
        };
        match (&record.workspace_id, &record.project) {
            (_, Some(project)) => Ok(format!(
                "{}/api/google/v1/{}/{}/{}",
                self.base_url, segment, project, record.name
            )),
            (Some(workspace_id), None) => Ok(format!(
                "{}/api/v2/{}/{}/{}",
                self.base_url, segment, workspace_id, record.name
            )),
            (None, None) => Err(ClientError::MissingField {
                resource: record.id.clone(),
                field: "project",
            }),
        }
    }

    fn object_url(&self, bucket: &str, object: &str) -> String {
        format!("{}/storage/v1/b/{}/o/{}?alt=media", self.storage_url, bucket, object)
    }
}

#[async_trait]
impl ResourceSource for ResourceClient {
    async fn fetch(&self, scope: &WorkspaceRef) -> vigil_core::Result<Snapshot> {
        let (runtimes, apps) = tokio::try_join!(self.list_runtimes(scope), self.list_apps(scope))
            .map_err(|e| e.into_vigil(scope.to_string(), self.timeout_secs))?;
        Ok(Snapshot::new(runtimes).extend(Snapshot::new(apps)))
    }
}

#[async_trait]
impl DetailSource for ResourceClient {
    async fn fetch_details(&self, record: &ResourceRecord) -> vigil_core::Result<ResourceDetails> {
        let scope = format!("{} {}", record.kind, record.name);
        let url = self
            .details_url(record)
            .map_err(|e| e.into_vigil(&scope, self.timeout_secs))?;
        let details: DetailsResponse = self
            .get_json(&url)
            .await
            .map_err(|e| e.into_vigil(&scope, self.timeout_secs))?;
        Ok(ResourceDetails {
            error_messages: details.errors.into_iter().map(|e| e.error_message).collect(),
        })
    }

    async fn fetch_error_artifact(
        &self,
        record: &ResourceRecord,
        artifact: &str,
    ) -> vigil_core::Result<String> {
        let scope = format!("{artifact} for {} {}", record.kind, record.name);
        let bucket = record.staging_bucket.as_deref().ok_or_else(|| {
            ClientError::MissingField {
                resource: record.id.clone(),
                field: "staging bucket",
            }
            .into_vigil(&scope, self.timeout_secs)
        })?;

        let response = self
            .get(&self.object_url(bucket, artifact))
            .await
            .map_err(|e| e.into_vigil(&scope, self.timeout_secs))?;
        response
            .text()
            .await
            .map_err(|e| ClientError::from(e).into_vigil(&scope, self.timeout_secs))
    }
}

#[async_trait]
impl WorkspaceStateSource for ResourceClient {
    async fn workspace_state(&self, workspace: &WorkspaceRef) -> vigil_core::Result<WorkspaceStateReport> {
        let url = format!(
            "{}/api/workspaces/{}/{}?fields=workspace.state,workspace.errorMessage",
            self.base_url, workspace.namespace, workspace.name
        );
        let response: WorkspaceResponse = self
            .get_json(&url)
            .await
            .map_err(|e| e.into_vigil(workspace.to_string(), self.timeout_secs))?;
        Ok(response.into())
    }
}

#[async_trait]
impl MigrationSource for ResourceClient {
    async fn migrations(&self, billing_project: &str) -> vigil_core::Result<Vec<MigrationReport>> {
        let url = format!(
            "{}/api/billing/v2/{}/bucketMigration",
            self.base_url, billing_project
        );
        let entries: Vec<MigrationEntry> = self
            .get_json(&url)
            .await
            .map_err(|e| e.into_vigil(format!("migrations of {billing_project}"), self.timeout_secs))?;
        Ok(entries.into_iter().map(MigrationReport::from).collect())
    }
}

impl std::fmt::Debug for ResourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceClient")
            .field("base_url", &self.base_url)
            .field("storage_url", &self.storage_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ResourceClient {
        let config = ApiConfig {
            base_url: "https://leo.example.org/".into(),
            ..ApiConfig::default()
        };
        ResourceClient::with_token(&config, "token").unwrap()
    }

    #[test]
    fn test_runtimes_url_prefers_workspace_id() {
        let scope = WorkspaceRef::new("b", "w")
            .with_workspace_id("ws-1")
            .with_project("proj");
        assert_eq!(
            client().runtimes_url(&scope).unwrap(),
            "https://leo.example.org/api/v2/runtimes/ws-1"
        );
    }

    #[test]
    fn test_runtimes_url_falls_back_to_project() {
        let scope = WorkspaceRef::new("b", "w").with_project("proj");
        assert_eq!(
            client().apps_url(&scope).unwrap(),
            "https://leo.example.org/api/google/v1/apps/proj"
        );
    }

    #[test]
    fn test_scope_without_ids_is_rejected() {
        let scope = WorkspaceRef::new("b", "w");
        assert!(matches!(
            client().runtimes_url(&scope),
            Err(ClientError::MissingField { .. })
        ));
    }

    #[test]
    fn test_from_config_requires_token() {
        let config = ApiConfig {
            token_env: "VIGIL_TEST_TOKEN_THAT_IS_NEVER_SET".into(),
            ..ApiConfig::default()
        };
        assert!(matches!(
            ResourceClient::from_config(&config),
            Err(ClientError::ConfigError(_))
        ));
    }
}
