//! The `withAllowedServiceAccounts` pipeline step.
//!
//! Runs a body in a child scope whose service-account selector is the union of
//! the inherited selector (if any) and the step's own. Grants accumulate as
//! scopes nest: an inner block can add accounts but never lose ones granted by
//! an ancestor. The step never queries the cluster and returns the body's
//! outcome untouched.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scope::Scope;
use crate::selector::ServiceAccountSelector;

/// Static metadata the script engine uses to expose a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDescriptor {
    /// Name scripts call the step by.
    pub function_name: &'static str,
    /// Help text.
    pub display_name: &'static str,
    /// Whether the step takes a nested block.
    pub takes_implicit_block: bool,
    /// Ambient context types the step requires.
    pub required_context: &'static [&'static str],
}

/// Descriptor for [`WithAllowedServiceAccountsStep`].
pub const WITH_ALLOWED_SERVICE_ACCOUNTS: StepDescriptor = StepDescriptor {
    function_name: "withAllowedServiceAccounts",
    display_name: "For use with dynamic service account security mode. Allows service accounts to be constrained on new pod templates.",
    takes_implicit_block: true,
    required_context: &[],
};

/// Scope-extension step carrying one selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithAllowedServiceAccountsStep {
    selector: ServiceAccountSelector,
}

impl WithAllowedServiceAccountsStep {
    /// Step granting the accounts matched by `selector`.
    pub fn new(selector: ServiceAccountSelector) -> Self {
        Self { selector }
    }

    /// Engine-facing descriptor.
    pub fn descriptor() -> &'static StepDescriptor {
        &WITH_ALLOWED_SERVICE_ACCOUNTS
    }

    /// Selector supplied by the script.
    pub fn selector(&self) -> &ServiceAccountSelector {
        &self.selector
    }

    /// Child scope the body runs in.
    ///
    /// The inherited selector comes first in the union, the step's second.
    pub fn body_scope(&self, scope: &Scope) -> Scope {
        let combined = match scope.get::<ServiceAccountSelector>() {
            Some(inherited) => {
                debug!("extending inherited service account selector");
                ServiceAccountSelector::union(inherited.clone(), self.selector.clone())
            }
            None => self.selector.clone(),
        };
        scope.with(combined)
    }

    /// Run `body` in the extended scope and hand back its outcome unchanged.
    pub async fn start<F, Fut, T>(&self, scope: &Scope, body: F) -> T
    where
        F: FnOnce(Scope) -> Fut,
        Fut: Future<Output = T>,
    {
        body(self.body_scope(scope)).await
    }
}

/// Run `body` with `selector` added to the service accounts allowed in `scope`.
pub async fn with_allowed_service_accounts<F, Fut, T>(
    scope: &Scope,
    selector: ServiceAccountSelector,
    body: F,
) -> T
where
    F: FnOnce(Scope) -> Fut,
    Fut: Future<Output = T>,
{
    WithAllowedServiceAccountsStep::new(selector)
        .start(scope, body)
        .await
}
