//! Pod templates, live nodes, and the template registry.
//!
//! A [`PodTemplate`] is a provisioning blueprint. Templates marked `protected`
//! hand elevated credentials (a service account) to whatever runs on their
//! pods, so every use of such a pod is subject to scope containment.
//! A [`Node`] is a live execution target; only [`Node::Pod`] nodes carry a
//! template and therefore participate in protection.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for template registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two templates share the same id.
    #[error("duplicate template id: {0}")]
    Duplicate(String),
    /// Failed to parse a template TOML file.
    #[error("failed to parse template TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    /// I/O error reading template files.
    #[error("failed to read template file: {0}")]
    IoError(#[from] std::io::Error),
}

/// Pod provisioning blueprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodTemplate {
    /// Unique identifier for this template.
    pub id: String,
    /// Human-readable template name (label used when selecting agents).
    pub name: String,
    /// Whether pods from this template require scope authorization.
    #[serde(default)]
    pub protected: bool,
    /// Service account granted to pods created from this template.
    #[serde(default)]
    pub service_account: Option<String>,
    /// Namespace the pod is created in; the cluster default applies when unset.
    #[serde(default)]
    pub namespace: Option<String>,
}

impl PodTemplate {
    /// Create an unprotected template with no service account.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            protected: false,
            service_account: None,
            namespace: None,
        }
    }

    /// Mark the template as protected.
    #[must_use]
    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }

    /// Grant a service account to pods created from this template.
    #[must_use]
    pub fn with_service_account(mut self, service_account: impl Into<String>) -> Self {
        self.service_account = Some(service_account.into());
        self
    }

    /// Pin the namespace pods are created in.
    #[must_use]
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// A running pod created from exactly one template.
#[derive(Debug, Clone)]
pub struct PodNode {
    name: String,
    template: Arc<PodTemplate>,
}

impl PodNode {
    /// Create a pod node bound to its template.
    pub fn new(name: impl Into<String>, template: Arc<PodTemplate>) -> Self {
        Self {
            name: name.into(),
            template,
        }
    }

    /// Pod (agent) name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Template the pod was created from.
    pub fn template(&self) -> &PodTemplate {
        &self.template
    }
}

/// Live execution target.
#[derive(Debug, Clone)]
pub enum Node {
    /// Dynamically provisioned pod; protection derives from its template.
    Pod(PodNode),
    /// Any other node kind. Never protected.
    Static {
        /// Node name.
        name: String,
    },
}

impl Node {
    /// Node name regardless of kind.
    pub fn name(&self) -> &str {
        match self {
            Self::Pod(pod) => pod.name(),
            Self::Static { name } => name,
        }
    }

    /// Template backing this node, if it is a pod.
    pub fn template(&self) -> Option<&PodTemplate> {
        match self {
            Self::Pod(pod) => Some(pod.template()),
            Self::Static { .. } => None,
        }
    }
}

/// Registry of pod templates indexed by id.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Arc<PodTemplate>>,
}

impl TemplateRegistry {
    /// Create an empty template registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single template.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] when a template with the same id exists.
    pub fn register(&mut self, template: PodTemplate) -> Result<(), RegistryError> {
        if self.templates.contains_key(&template.id) {
            return Err(RegistryError::Duplicate(template.id));
        }
        self.templates
            .insert(template.id.clone(), Arc::new(template));
        Ok(())
    }

    /// Load all `.toml` files from a directory, one template per file.
    ///
    /// # Errors
    ///
    /// Returns an error on unreadable files, invalid TOML, or duplicate ids.
    pub fn load_from_dir(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for entry in std::fs::read_dir(path)? {
            let file_path = entry?.path();
            if file_path.extension().and_then(|e| e.to_str()) == Some("toml") {
                let contents = std::fs::read_to_string(&file_path)?;
                let template: PodTemplate = toml::from_str(&contents)?;
                registry.register(template)?;
            }
        }
        Ok(registry)
    }

    /// Get a template by its id.
    pub fn get(&self, id: &str) -> Option<Arc<PodTemplate>> {
        self.templates.get(id).cloned()
    }

    /// All templates, sorted by id.
    pub fn templates(&self) -> Vec<Arc<PodTemplate>> {
        let mut all: Vec<_> = self.templates.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Number of registered templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns `true` when no templates are registered.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
