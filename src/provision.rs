//! Pod provisioning admission.
//!
//! Provisioning is where a template first enters scope. With dynamic
//! service-account security enabled, the service account a template requests
//! must be one the nearest selector resolves to at this moment. An admitted
//! protected template is then appended to the scope's protected pod context so
//! the body that provisioned it, and only that body, can use the pod.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cluster::ClusterClient;
use crate::node::{PodNode, PodTemplate};
use crate::scope::{ProtectedPodContext, Scope};
use crate::selector::{NameAndNamespace, SelectorError, ServiceAccountSelector};

/// Cloud-level provisioning switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisionSettings {
    /// Restrict requested service accounts to those allowed by scope selectors.
    pub dynamic_service_account_security: bool,
}

/// Errors that stop a pod from being provisioned.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// The requested service account is not in the scope's allowed set.
    #[error("Dynamic Service Account Security enabled and Service account {name} is not allowed in namespace {namespace}")]
    ServiceAccountNotAllowed {
        /// Requested service account.
        name: String,
        /// Namespace the pod would run in.
        namespace: String,
    },
    /// Resolving the scope's selector failed.
    #[error(transparent)]
    Selector(#[from] SelectorError),
}

/// Admits pods and registers protected templates in scope.
#[derive(Clone)]
pub struct Provisioner {
    client: Arc<dyn ClusterClient>,
    settings: ProvisionSettings,
}

impl std::fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provisioner")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Provisioner {
    /// Provisioner resolving selectors through `client`.
    pub fn new(client: Arc<dyn ClusterClient>, settings: ProvisionSettings) -> Self {
        Self { client, settings }
    }

    /// Check that `template` may be provisioned from `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::ServiceAccountNotAllowed`] when the requested
    /// account is outside the resolved set, or [`ProvisionError::Selector`]
    /// when resolution fails.
    pub async fn admit(&self, template: &PodTemplate, scope: &Scope) -> Result<(), ProvisionError> {
        if !self.settings.dynamic_service_account_security {
            return Ok(());
        }
        let Some(account) = template.service_account.as_deref() else {
            return Ok(());
        };
        let namespace = template
            .namespace
            .as_deref()
            .unwrap_or(self.client.default_namespace());
        let requested = NameAndNamespace::new(account, namespace);

        let allowed = match scope.get::<ServiceAccountSelector>() {
            Some(selector) => selector.resolve(self.client.as_ref()).await?,
            None => Vec::new(),
        };

        if allowed.contains(&requested) {
            info!(template_id = %template.id, service_account = %requested, "service account admitted");
            return Ok(());
        }

        warn!(
            template_id = %template.id,
            service_account = %requested,
            allowed = allowed.len(),
            "service account not allowed in scope"
        );
        Err(ProvisionError::ServiceAccountNotAllowed {
            name: requested.name,
            namespace: requested.namespace,
        })
    }

    /// Admit `template`, create the pod, and return it with the scope its body runs in.
    ///
    /// # Errors
    ///
    /// Propagates admission failures from [`Provisioner::admit`].
    pub async fn provision(
        &self,
        template: Arc<PodTemplate>,
        pod_name: impl Into<String>,
        scope: &Scope,
    ) -> Result<(PodNode, Scope), ProvisionError> {
        self.admit(&template, scope).await?;
        let body_scope = register_template(scope, &template);
        Ok((PodNode::new(pod_name, template), body_scope))
    }
}

/// Child scope allowing `template` if it is protected; otherwise `scope` itself.
pub fn register_template(scope: &Scope, template: &PodTemplate) -> Scope {
    if !template.protected {
        return scope.clone();
    }
    scope.with(ProtectedPodContext::from_scope(scope).append(template.id.clone()))
}
