//! Podguard CLI entry point.
//!
//! Provides `templates`, `check`, and `resolve` subcommands for inspecting
//! template protection, dry-running a launch through the execution guard, and
//! resolving a service-account selector against the cluster.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::debug;

use podguard::config::{default_config_path, load_config, Config};
use podguard::guard::ProtectedExecDecorator;
use podguard::launcher::dry_run::DryRunLauncher;
use podguard::launcher::LaunchRequest;
use podguard::node::{Node, PodNode};
use podguard::scope::{ProtectedPodContext, Scope};
use podguard::selector::ServiceAccountSelector;

/// Podguard — protected pod scope guard.
#[derive(Parser)]
#[command(name = "podguard", version, about)]
struct Cli {
    /// Config file (default: ~/.podguard/podguard.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// List configured templates and whether they are protected.
    Templates,
    /// Dry-run a launch on a pod of TEMPLATE through the execution guard.
    Check {
        /// Template id of the target pod.
        #[arg(long)]
        template: String,
        /// Template ids allowed in the calling scope.
        #[arg(long = "allow")]
        allow: Vec<String>,
        /// Command to launch.
        #[arg(trailing_var_arg = true)]
        command: Vec<String>,
    },
    /// Resolve a JSON service-account selector against the cluster.
    Resolve {
        /// Path to the selector JSON file.
        #[arg(long)]
        selector: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    podguard::logging::init_cli();

    let config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Command::Templates => handle_templates(&config),
        Command::Check {
            template,
            allow,
            command,
        } => handle_check(&config, &template, allow, command).await,
        Command::Resolve { selector } => handle_resolve(&config, &selector).await,
    }
}

/// Load the explicit config, else the default file if present, else defaults.
fn resolve_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    let path = default_config_path()?;
    if path.exists() {
        return load_config(&path);
    }
    debug!(path = %path.display(), "no config file, using defaults");
    Ok(Config::default())
}

/// Print every template, one per line.
fn handle_templates(config: &Config) -> anyhow::Result<()> {
    let registry = config.template_registry()?;
    for template in registry.templates() {
        let protection = if template.protected {
            "protected"
        } else {
            "unprotected"
        };
        let account = template.service_account.as_deref().unwrap_or("-");
        println!("{}\t{}\t{protection}\t{account}", template.id, template.name);
    }
    Ok(())
}

/// Push a launch through the guard with a scope allowing `allow`.
async fn handle_check(
    config: &Config,
    template_id: &str,
    allow: Vec<String>,
    command: Vec<String>,
) -> anyhow::Result<()> {
    let registry = config.template_registry()?;
    let template = registry
        .get(template_id)
        .ok_or_else(|| anyhow::anyhow!("unknown template: {template_id}"))?;

    let node = Node::Pod(PodNode::new(format!("{}-check", template.name), template));
    let scope = Scope::root().with(ProtectedPodContext::new(allow));
    let launcher = ProtectedExecDecorator.decorate(Arc::new(DryRunLauncher), &node, &scope);

    let command = if command.is_empty() {
        vec!["true".to_owned()]
    } else {
        command
    };
    let result = launcher.launch(LaunchRequest::new(command)).await?;
    println!("{}", result.stdout);
    Ok(())
}

/// Parse, validate, and resolve a selector file.
async fn handle_resolve(config: &Config, selector_path: &Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(selector_path)
        .with_context(|| format!("failed to read selector {}", selector_path.display()))?;
    let selector: ServiceAccountSelector = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse selector {}", selector_path.display()))?;
    selector.validate()?;

    let client = config.cluster.connect()?;
    for account in selector.resolve(&client).await? {
        println!("{account}");
    }
    Ok(())
}
