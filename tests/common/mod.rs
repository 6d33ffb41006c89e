//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use podguard::cluster::{ClusterClient, ClusterError};
use podguard::launcher::{LaunchRequest, LaunchResult, Launcher, LauncherError};
use podguard::node::{PodNode, PodTemplate};
use podguard::selector::NameAndNamespace;

/// In-memory cluster holding labelled service accounts.
pub struct FakeCluster {
    namespace: String,
    accounts: Vec<(NameAndNamespace, BTreeMap<String, String>)>,
    unreachable: bool,
    queries: Mutex<Vec<String>>,
}

impl FakeCluster {
    pub fn new(default_namespace: &str) -> Self {
        Self {
            namespace: default_namespace.to_owned(),
            accounts: Vec::new(),
            unreachable: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_account(mut self, name: &str, namespace: &str, labels: &[(&str, &str)]) -> Self {
        self.accounts
            .push((NameAndNamespace::new(name, namespace), labels_of(labels)));
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Namespaces queried so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().expect("queries lock").clone()
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    fn default_namespace(&self) -> &str {
        &self.namespace
    }

    async fn list_service_accounts(
        &self,
        namespace: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<NameAndNamespace>, ClusterError> {
        self.queries
            .lock()
            .expect("queries lock")
            .push(namespace.to_owned());
        if self.unreachable {
            return Err(ClusterError::Transport("connection refused".to_owned()));
        }
        Ok(self
            .accounts
            .iter()
            .filter(|(account, account_labels)| {
                account.namespace == namespace
                    && labels.iter().all(|(k, v)| account_labels.get(k) == Some(v))
            })
            .map(|(account, _)| account.clone())
            .collect())
    }
}

/// Innermost launcher recording every request it receives.
#[derive(Default)]
pub struct RecordingLauncher {
    calls: Mutex<Vec<LaunchRequest>>,
    failure: Option<String>,
}

impl RecordingLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Records requests, then fails every launch with `reason`.
    pub fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::default(),
            failure: Some(reason.to_owned()),
        })
    }

    pub fn calls(&self) -> Vec<LaunchRequest> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl Launcher for RecordingLauncher {
    async fn launch(&self, request: LaunchRequest) -> Result<LaunchResult, LauncherError> {
        self.calls.lock().expect("calls lock").push(request);
        if let Some(reason) = &self.failure {
            return Err(LauncherError::Failed(reason.clone()));
        }
        Ok(LaunchResult {
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::ZERO,
        })
    }
}

pub fn labels_of(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

pub fn protected_template(id: &str) -> Arc<PodTemplate> {
    Arc::new(PodTemplate::new(id, format!("{id}-agent")).protected())
}

pub fn open_template(id: &str) -> Arc<PodTemplate> {
    Arc::new(PodTemplate::new(id, format!("{id}-agent")))
}

pub fn pod(template: Arc<PodTemplate>) -> PodNode {
    PodNode::new(format!("{}-x1y2z", template.name), template)
}
