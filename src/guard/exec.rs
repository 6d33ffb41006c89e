//! Execution guard installed on every pod launcher.
//!
//! Any job can name any pod, and commands such as shell steps reach a pod
//! without passing through another guarded entry point, so the decorator is
//! applied to every pod launcher unconditionally.
//!
//! Launchers nest to an unknown depth. Only the outermost guard evaluates the
//! scope; it stamps a [`CheckedFlag`](crate::launcher::CheckedFlag) for the
//! template into the request, and every inner guard that sees the flag
//! forwards the request untouched.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::ensure_in_scope;
use crate::launcher::{LaunchRequest, LaunchResult, Launcher, LauncherError};
use crate::node::{Node, PodNode};
use crate::scope::Scope;

/// Wraps pod launchers in a [`ProtectedLauncher`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtectedExecDecorator;

impl ProtectedExecDecorator {
    /// Decorate `launcher` for `node` at the execution point `scope`.
    ///
    /// Non-pod nodes get their launcher back unchanged.
    pub fn decorate(
        &self,
        launcher: Arc<dyn Launcher>,
        node: &Node,
        scope: &Scope,
    ) -> Arc<dyn Launcher> {
        match node {
            Node::Pod(pod) => Arc::new(ProtectedLauncher::new(launcher, pod.clone(), scope.clone())),
            Node::Static { .. } => launcher,
        }
    }
}

/// Launcher layer enforcing scope containment for one pod.
pub struct ProtectedLauncher {
    inner: Arc<dyn Launcher>,
    pod: PodNode,
    scope: Scope,
}

impl ProtectedLauncher {
    /// Guard `inner` for launches on `pod` issued from `scope`.
    pub fn new(inner: Arc<dyn Launcher>, pod: PodNode, scope: Scope) -> Self {
        Self { inner, pod, scope }
    }
}

impl std::fmt::Debug for ProtectedLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtectedLauncher")
            .field("pod", &self.pod)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Launcher for ProtectedLauncher {
    async fn launch(&self, request: LaunchRequest) -> Result<LaunchResult, LauncherError> {
        let template_id = &self.pod.template().id;

        if request.is_checked(template_id) {
            debug!(launch_id = %request.id, template_id = %template_id, "already checked, passing through");
            return self.inner.launch(request).await;
        }

        ensure_in_scope(&self.pod, &self.scope)?;

        debug!(launch_id = %request.id, template_id = %template_id, node = self.pod.name(), "launch allowed");
        self.inner.launch(request.stamp(template_id)).await
    }
}
