//! Scope containment guards for protected pods.
//!
//! Two interception points enforce the same policy: a pod created from a
//! protected template may only be used from a scope whose
//! [`ProtectedPodContext`](crate::scope::ProtectedPodContext) lists the
//! template id. Both fail closed with [`GuardError`].

use tracing::warn;

use crate::node::PodNode;
use crate::scope::{ProtectedPodContext, Scope};

pub mod exec;
pub mod file;

pub use exec::{ProtectedExecDecorator, ProtectedLauncher};
pub use file::{FileAccessGuard, FileHandle};

/// Message carried by every scope-violation denial. Operator tooling greps for it.
pub const PROTECTED_TEMPLATE_DENIAL: &str = "No executions allowed in a pod created from a protected template when template is not in pipeline context.";

/// Security failure raised when a protected pod is used out of scope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    /// The pod's template is protected and absent from the resolved context.
    #[error("{}", PROTECTED_TEMPLATE_DENIAL)]
    ProtectedTemplateOutOfScope {
        /// Template the pod was created from.
        template_id: String,
        /// Pod that was targeted.
        node: String,
    },
}

/// Allow the pod when its template is unprotected or in the scope's context.
///
/// The scope is resolved only for protected templates.
pub(crate) fn ensure_in_scope(pod: &PodNode, scope: &Scope) -> Result<(), GuardError> {
    let template = pod.template();
    if !template.protected {
        return Ok(());
    }
    if ProtectedPodContext::from_scope(scope).contains(&template.id) {
        return Ok(());
    }
    warn!(
        template_id = %template.id,
        node = pod.name(),
        "blocked use of protected pod outside its pipeline context"
    );
    Err(GuardError::ProtectedTemplateOutOfScope {
        template_id: template.id.clone(),
        node: pod.name().to_owned(),
    })
}
