//! Configuration loading and validation.
//!
//! `podguard.toml` declares the cluster connection, the dynamic
//! service-account security switch, and the pod templates in use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::cluster::KubeApiClient;
use crate::node::{PodTemplate, TemplateRegistry};
use crate::provision::ProvisionSettings;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Cluster API connection.
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Security switches.
    #[serde(default)]
    pub security: SecurityConfig,

    /// Directory of additional template files, one template per `.toml`.
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,

    /// Inline pod templates.
    #[serde(default)]
    pub templates: Vec<PodTemplate>,
}

/// Kubernetes API connection settings.
#[derive(Debug, Deserialize)]
pub struct ClusterConfig {
    /// API server base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Namespace substituted into selectors that leave theirs unset.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Environment variable holding the bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            namespace: default_namespace(),
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ClusterConfig {
    /// Build an API client, reading the token from `token_env` when set.
    ///
    /// # Errors
    ///
    /// Returns an error if the API URL or HTTP client is invalid.
    pub fn connect(&self) -> anyhow::Result<KubeApiClient> {
        let token = std::env::var(&self.token_env).ok().filter(|t| !t.is_empty());
        if token.is_none() {
            tracing::warn!(var = %self.token_env, "no cluster token set, using anonymous access");
        }
        KubeApiClient::new(
            &self.api_url,
            self.namespace.clone(),
            token,
            Duration::from_secs(self.timeout_secs),
        )
        .with_context(|| format!("failed to create cluster client for {}", self.api_url))
    }
}

/// Security switches.
#[derive(Debug, Default, Deserialize)]
pub struct SecurityConfig {
    /// Restrict pod service accounts to those granted by `withAllowedServiceAccounts`.
    #[serde(default)]
    pub dynamic_service_account_security: bool,
}

impl Config {
    /// Build the template registry from `templates_dir` and inline templates.
    ///
    /// # Errors
    ///
    /// Returns an error on unreadable template files or duplicate ids.
    pub fn template_registry(&self) -> anyhow::Result<TemplateRegistry> {
        let mut registry = match &self.templates_dir {
            Some(dir) => TemplateRegistry::load_from_dir(dir)
                .with_context(|| format!("failed to load templates from {}", dir.display()))?,
            None => TemplateRegistry::new(),
        };
        for template in &self.templates {
            registry
                .register(template.clone())
                .context("invalid inline template")?;
        }
        Ok(registry)
    }

    /// Provisioning switches derived from `[security]`.
    pub fn provision_settings(&self) -> ProvisionSettings {
        ProvisionSettings {
            dynamic_service_account_security: self.security.dynamic_service_account_security,
        }
    }
}

// Default value functions for serde

fn default_api_url() -> String {
    "https://kubernetes.default.svc".to_owned()
}
fn default_namespace() -> String {
    "default".to_owned()
}
fn default_token_env() -> String {
    "PODGUARD_CLUSTER_TOKEN".to_owned()
}
fn default_timeout_secs() -> u64 {
    30
}

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config at {}: {e}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config at {}: {e}", path.display()))?;
    Ok(config)
}

/// Resolve the default config directory (`~/.podguard/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".podguard"))
}

/// Default config file path (`~/.podguard/podguard.toml`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(config_dir()?.join("podguard.toml"))
}
