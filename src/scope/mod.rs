//! Explicit scope chain for nested script execution.
//!
//! The script engine nests scopes as a pipeline enters blocks. Each frame binds
//! one capability value (a [`ProtectedPodContext`] or a
//! [`ServiceAccountSelector`]) and points at its parent. Lookups walk from the
//! innermost frame outward and return the nearest bound value of the requested
//! type. Frames are immutable and shared through [`Arc`], so a [`Scope`] is
//! cheap to clone and safe to read from concurrent flows.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::selector::ServiceAccountSelector;

pub mod context;

pub use context::ProtectedPodContext;

/// Capability value bound to a single scope frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Binding {
    /// Protected template ids allowed in this scope.
    ProtectedPods(ProtectedPodContext),
    /// Service accounts this scope may grant to new protected pods.
    ServiceAccounts(ServiceAccountSelector),
}

/// Capability type that can be bound to and looked up from a [`Scope`].
pub trait ScopeValue: Clone {
    /// Borrow the value out of a binding if the binding holds this type.
    fn from_binding(binding: &Binding) -> Option<&Self>;
    /// Wrap the value into a binding.
    fn into_binding(self) -> Binding;
}

#[derive(Debug)]
struct Frame {
    binding: Binding,
    parent: Option<Arc<Frame>>,
}

/// Immutable handle on a point of the execution tree.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    head: Option<Arc<Frame>>,
}

impl Scope {
    /// Outermost scope with no bindings.
    pub fn root() -> Self {
        Self::default()
    }

    /// Child scope binding `value`; the receiver is left untouched.
    #[must_use]
    pub fn with<T: ScopeValue>(&self, value: T) -> Self {
        Self {
            head: Some(Arc::new(Frame {
                binding: value.into_binding(),
                parent: self.head.clone(),
            })),
        }
    }

    /// Nearest value of type `T` bound at or above this scope.
    pub fn get<T: ScopeValue>(&self) -> Option<&T> {
        self.frames().find_map(|frame| T::from_binding(&frame.binding))
    }

    /// Serializable view of the values this scope resolves to.
    pub fn snapshot(&self) -> ScopeSnapshot {
        ScopeSnapshot {
            protected_pods: self.get::<ProtectedPodContext>().cloned(),
            service_accounts: self.get::<ServiceAccountSelector>().cloned(),
        }
    }

    /// Rebuild a scope that resolves to the same values as the snapshot.
    ///
    /// Intermediate frames are not preserved; only what lookups observe is.
    pub fn from_snapshot(snapshot: ScopeSnapshot) -> Self {
        let mut scope = Self::root();
        if let Some(selector) = snapshot.service_accounts {
            scope = scope.with(selector);
        }
        if let Some(ctx) = snapshot.protected_pods {
            scope = scope.with(ctx);
        }
        scope
    }

    fn frames(&self) -> impl Iterator<Item = &Frame> {
        std::iter::successors(self.head.as_deref(), |&frame| frame.parent.as_deref())
    }
}

/// Resolved scope values captured for suspension and later resumption.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSnapshot {
    /// Nearest protected pod context, if any.
    #[serde(default)]
    pub protected_pods: Option<ProtectedPodContext>,
    /// Nearest service account selector, if any.
    #[serde(default)]
    pub service_accounts: Option<ServiceAccountSelector>,
}
