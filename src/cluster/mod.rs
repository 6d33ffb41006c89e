//! Cluster query capability used by selector resolution.
//!
//! The cluster is an external, possibly blocking dependency. Implementations
//! impose their own transport settings; callers add no retry, and every
//! failure surfaces as a [`ClusterError`].

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::selector::NameAndNamespace;

pub mod kube;

pub use kube::KubeApiClient;

/// Errors produced by cluster queries.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// The request never produced a response.
    #[error("cluster request failed: {0}")]
    Transport(String),
    /// The API answered with a non-success status.
    #[error("cluster API returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },
    /// The response body could not be decoded.
    #[error("failed to decode cluster response: {0}")]
    Decode(String),
    /// The label set cannot be expressed as an exact-match selector.
    #[error("refusing label selector: {0}")]
    InvalidSelector(String),
    /// The client is misconfigured.
    #[error("invalid cluster client configuration: {0}")]
    Config(String),
}

/// Read access to service accounts in the cluster.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Namespace substituted for selectors that leave theirs unset.
    fn default_namespace(&self) -> &str;

    /// List service accounts in `namespace` carrying every label in `labels`.
    async fn list_service_accounts(
        &self,
        namespace: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<NameAndNamespace>, ClusterError>;
}
