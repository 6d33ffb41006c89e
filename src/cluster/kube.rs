//! Kubernetes API server client for service-account queries.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{ClusterClient, ClusterError};
use crate::selector::{validate_labels, NameAndNamespace};

/// Longest response body kept in [`ClusterError::Status`].
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Deserialize)]
struct ServiceAccountList {
    #[serde(default)]
    items: Vec<ServiceAccount>,
}

#[derive(Debug, Deserialize)]
struct ServiceAccount {
    metadata: ObjectMeta,
}

#[derive(Debug, Deserialize)]
struct ObjectMeta {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
}

/// Service-account lister backed by the Kubernetes REST API.
#[derive(Debug, Clone)]
pub struct KubeApiClient {
    http: reqwest::Client,
    api_url: Url,
    token: Option<String>,
    namespace: String,
}

impl KubeApiClient {
    /// Build a client for the API server at `api_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::Config`] for an unusable URL or HTTP client.
    pub fn new(
        api_url: &str,
        namespace: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClusterError> {
        let api_url = Url::parse(api_url)
            .map_err(|e| ClusterError::Config(format!("invalid api url '{api_url}': {e}")))?;
        if api_url.cannot_be_a_base() {
            return Err(ClusterError::Config(format!(
                "api url '{api_url}' cannot be a base"
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClusterError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_url,
            token,
            namespace: namespace.into(),
        })
    }

    /// URL listing service accounts in `namespace` filtered by `labels`.
    ///
    /// Labels that would change the selector's meaning once joined (`!`, `,`,
    /// set operators) are refused before any URL is built.
    #[doc(hidden)]
    pub fn service_accounts_url(
        &self,
        namespace: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<Url, ClusterError> {
        validate_labels(labels).map_err(|e| ClusterError::InvalidSelector(e.to_string()))?;
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClusterError::Config("api url cannot be a base".to_owned()))?
            .pop_if_empty()
            .extend(["api", "v1", "namespaces", namespace, "serviceaccounts"]);
        let selector = label_selector(labels);
        if !selector.is_empty() {
            url.query_pairs_mut().append_pair("labelSelector", &selector);
        }
        Ok(url)
    }
}

/// Render an equality-based label selector (`k1=v1,k2=v2`).
///
/// Does no escaping; callers validate the labels first.
#[doc(hidden)]
pub fn label_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait]
impl ClusterClient for KubeApiClient {
    fn default_namespace(&self) -> &str {
        &self.namespace
    }

    async fn list_service_accounts(
        &self,
        namespace: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<NameAndNamespace>, ClusterError> {
        let url = self.service_accounts_url(namespace, labels)?;
        debug!(%url, "listing service accounts");

        let mut request = self.http.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ClusterError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClusterError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let list: ServiceAccountList = response
            .json()
            .await
            .map_err(|e| ClusterError::Decode(e.to_string()))?;

        Ok(list
            .items
            .into_iter()
            .map(|sa| {
                let ns = sa
                    .metadata
                    .namespace
                    .unwrap_or_else(|| namespace.to_owned());
                NameAndNamespace::new(sa.metadata.name, ns)
            })
            .collect())
    }
}
