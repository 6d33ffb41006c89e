//! Allow-set of protected template ids bound to a scope.

use serde::{Deserialize, Serialize};

use super::{Binding, Scope, ScopeValue};

/// Immutable set of protected template ids that are in scope.
///
/// Appending never mutates the receiver; it returns a new context holding the
/// prior ids plus the new one. Child scopes that extend a context therefore
/// never leak ids into sibling or parent scopes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedPodContext {
    allowed_template_ids: Vec<String>,
}

impl ProtectedPodContext {
    /// Context with no allowed ids.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Context allowing exactly the given ids.
    pub fn new(allowed_template_ids: Vec<String>) -> Self {
        Self {
            allowed_template_ids,
        }
    }

    /// Return a new context allowing `template_id` in addition to the current ids.
    #[must_use]
    pub fn append(&self, template_id: impl Into<String>) -> Self {
        let mut ids = Vec::with_capacity(self.allowed_template_ids.len().saturating_add(1));
        ids.extend(self.allowed_template_ids.iter().cloned());
        ids.push(template_id.into());
        Self::new(ids)
    }

    /// Whether `template_id` is allowed.
    pub fn contains(&self, template_id: &str) -> bool {
        self.allowed_template_ids.iter().any(|id| id == template_id)
    }

    /// Allowed ids in insertion order.
    pub fn template_ids(&self) -> &[String] {
        &self.allowed_template_ids
    }

    /// Returns `true` when nothing is allowed.
    pub fn is_empty(&self) -> bool {
        self.allowed_template_ids.is_empty()
    }

    /// Nearest context bound to `scope`, or an empty one when none is bound.
    pub fn from_scope(scope: &Scope) -> Self {
        scope.get::<Self>().cloned().unwrap_or_default()
    }
}

impl ScopeValue for ProtectedPodContext {
    fn from_binding(binding: &Binding) -> Option<&Self> {
        match binding {
            Binding::ProtectedPods(ctx) => Some(ctx),
            Binding::ServiceAccounts(_) => None,
        }
    }

    fn into_binding(self) -> Binding {
        Binding::ProtectedPods(self)
    }
}
