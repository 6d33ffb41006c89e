//! Composable service-account selectors.
//!
//! A [`ServiceAccountSelector`] describes which service accounts a scope may
//! grant to newly provisioned protected pods. Selectors are plain data and are
//! resolved against the live cluster only when a pod is about to be created;
//! results are never cached.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cluster::{ClusterClient, ClusterError};
use crate::scope::{Binding, ScopeValue};

static DNS_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("DNS label regex is valid")
});

static DNS_SUBDOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("DNS subdomain regex is valid")
});

/// Label names and non-empty label values.
static LABEL_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?$").expect("label name regex is valid")
});

const MAX_LABEL_LEN: usize = 63;
const MAX_SUBDOMAIN_LEN: usize = 253;

/// Errors produced while validating or resolving a selector.
#[derive(Debug, thiserror::Error)]
pub enum SelectorError {
    /// The selector is structurally invalid.
    #[error("invalid service account selector: {0}")]
    Invalid(String),
    /// The cluster query backing a selector failed.
    #[error("service account selector resolution failed: {0}")]
    Cluster(#[from] ClusterError),
}

/// A resolved service account reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NameAndNamespace {
    /// Service account name.
    pub name: String,
    /// Namespace the service account lives in.
    pub namespace: String,
}

impl NameAndNamespace {
    /// Create a reference from its parts.
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for NameAndNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Predicate over service accounts a scope may grant.
///
/// An unset namespace means "the cluster client's default namespace at
/// resolve time", never a value captured at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServiceAccountSelector {
    /// Service accounts whose labels contain every given key/value pair.
    FromLabels {
        /// Namespace to search; defaults to the cluster namespace.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
        /// Exact-match label set.
        labels: BTreeMap<String, String>,
    },
    /// An explicit list of service account names.
    FromNames {
        /// Namespace of the accounts; defaults to the cluster namespace.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
        /// Service account names.
        names: Vec<String>,
    },
    /// Concatenation of two selectors' results.
    Union {
        /// Resolved first.
        first: Box<ServiceAccountSelector>,
        /// Resolved second.
        second: Box<ServiceAccountSelector>,
    },
}

impl ServiceAccountSelector {
    /// Label selector in the cluster's default namespace.
    pub fn from_labels(labels: BTreeMap<String, String>) -> Self {
        Self::FromLabels {
            namespace: None,
            labels,
        }
    }

    /// Label selector in a fixed namespace.
    pub fn from_labels_in(namespace: impl Into<String>, labels: BTreeMap<String, String>) -> Self {
        Self::FromLabels {
            namespace: Some(namespace.into()),
            labels,
        }
    }

    /// Name list in the cluster's default namespace.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::FromNames {
            namespace: None,
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Name list in a fixed namespace.
    pub fn from_names_in<I, S>(namespace: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::FromNames {
            namespace: Some(namespace.into()),
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Union of two selectors; `first` resolves before `second`.
    pub fn union(first: Self, second: Self) -> Self {
        Self::Union {
            first: Box::new(first),
            second: Box::new(second),
        }
    }

    /// Resolve against the live cluster.
    ///
    /// Unions are flattened left to right and their results concatenated
    /// without deduplication. The first failing cluster query aborts the whole
    /// resolution; partial results are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError::Invalid`] for label keys or values that are not
    /// plain Kubernetes identifiers, before any query is sent, and
    /// [`SelectorError::Cluster`] when a label query fails.
    pub async fn resolve<C>(&self, client: &C) -> Result<Vec<NameAndNamespace>, SelectorError>
    where
        C: ClusterClient + ?Sized,
    {
        let mut resolved = Vec::new();
        for leaf in self.leaves() {
            match leaf {
                Self::FromLabels { namespace, labels } => {
                    validate_labels(labels)?;
                    let ns = namespace.as_deref().unwrap_or(client.default_namespace());
                    let found = client.list_service_accounts(ns, labels).await?;
                    info!(namespace = ns, matched = found.len(), "resolved label selector");
                    resolved.extend(found);
                }
                Self::FromNames { namespace, names } => {
                    let ns = namespace.as_deref().unwrap_or(client.default_namespace());
                    resolved.extend(names.iter().map(|name| NameAndNamespace::new(name, ns)));
                }
                // leaves() never yields unions
                Self::Union { .. } => {}
            }
        }
        Ok(resolved)
    }

    /// Check names, namespaces, and labels against Kubernetes naming rules.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError::Invalid`] describing the first offending field.
    pub fn validate(&self) -> Result<(), SelectorError> {
        for leaf in self.leaves() {
            match leaf {
                Self::FromLabels { namespace, labels } => {
                    check_namespace(namespace.as_deref())?;
                    if labels.is_empty() {
                        return Err(SelectorError::Invalid(
                            "label selector must match at least one label".to_owned(),
                        ));
                    }
                    validate_labels(labels)?;
                }
                Self::FromNames { namespace, names } => {
                    check_namespace(namespace.as_deref())?;
                    if names.is_empty() {
                        return Err(SelectorError::Invalid(
                            "name selector must list at least one service account".to_owned(),
                        ));
                    }
                    for name in names {
                        if name.len() > MAX_SUBDOMAIN_LEN || !DNS_SUBDOMAIN.is_match(name) {
                            return Err(SelectorError::Invalid(format!(
                                "invalid service account name '{name}'"
                            )));
                        }
                    }
                }
                Self::Union { .. } => {}
            }
        }
        Ok(())
    }

    /// Non-union selectors in resolution order.
    fn leaves(&self) -> Vec<&Self> {
        let mut stack = vec![self];
        let mut leaves = Vec::new();
        while let Some(selector) = stack.pop() {
            match selector {
                Self::Union { first, second } => {
                    stack.push(second);
                    stack.push(first);
                }
                leaf => leaves.push(leaf),
            }
        }
        leaves
    }
}

impl ScopeValue for ServiceAccountSelector {
    fn from_binding(binding: &Binding) -> Option<&Self> {
        match binding {
            Binding::ServiceAccounts(selector) => Some(selector),
            Binding::ProtectedPods(_) => None,
        }
    }

    fn into_binding(self) -> Binding {
        Binding::ServiceAccounts(self)
    }
}

/// Check every label key and value of an exact-match label set.
///
/// Keys and values that pass can be joined into a `key=value` selector without
/// changing its meaning. An empty set passes.
///
/// # Errors
///
/// Returns [`SelectorError::Invalid`] naming the first offending key or value.
pub fn validate_labels(labels: &BTreeMap<String, String>) -> Result<(), SelectorError> {
    for (key, value) in labels {
        check_label_key(key)?;
        if !value.is_empty() && (value.len() > MAX_LABEL_LEN || !LABEL_NAME.is_match(value)) {
            return Err(SelectorError::Invalid(format!(
                "invalid label value '{value}' for key '{key}'"
            )));
        }
    }
    Ok(())
}

fn check_namespace(namespace: Option<&str>) -> Result<(), SelectorError> {
    match namespace {
        Some(ns) if ns.len() > MAX_LABEL_LEN || !DNS_LABEL.is_match(ns) => Err(
            SelectorError::Invalid(format!("invalid namespace '{ns}'")),
        ),
        _ => Ok(()),
    }
}

/// Label keys are `name` or `prefix/name` with a DNS subdomain prefix.
fn check_label_key(key: &str) -> Result<(), SelectorError> {
    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };
    let prefix_ok = prefix
        .map(|p| p.len() <= MAX_SUBDOMAIN_LEN && DNS_SUBDOMAIN.is_match(p))
        .unwrap_or(true);
    if !prefix_ok || name.len() > MAX_LABEL_LEN || !LABEL_NAME.is_match(name) {
        return Err(SelectorError::Invalid(format!("invalid label key '{key}'")));
    }
    Ok(())
}
