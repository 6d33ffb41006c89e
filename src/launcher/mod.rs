//! Process launch abstractions decorated by the execution guard.
//!
//! Launchers stack: the platform wraps more permissive launchers around less
//! permissive ones, so one launch travels through an unknown number of
//! [`Launcher`] layers before a process starts.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::guard::GuardError;

pub mod dry_run;

/// Per-launch marker recording that the protection check for a template passed.
///
/// Lives only inside the [`LaunchRequest`] that carries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedFlag {
    template_id: String,
}

impl CheckedFlag {
    /// Template whose check already passed.
    pub fn template_id(&self) -> &str {
        &self.template_id
    }
}

/// A single process launch travelling through the launcher chain.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    /// Correlation id for logs.
    pub id: Uuid,
    /// Program and arguments.
    pub command: Vec<String>,
    /// Environment passed to the process.
    pub env: Vec<(String, String)>,
    checked: Vec<CheckedFlag>,
}

impl LaunchRequest {
    /// New request for `command` with no environment.
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: Uuid::new_v4(),
            command: command.into_iter().map(Into::into).collect(),
            env: Vec::new(),
            checked: Vec::new(),
        }
    }

    /// Add an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Whether a guard earlier in this chain already checked `template_id`.
    pub fn is_checked(&self, template_id: &str) -> bool {
        // Newest markers sit first, so the common case hits the head.
        self.checked.iter().any(|flag| flag.template_id == template_id)
    }

    /// Markers carried by this request, newest first.
    pub fn checked_flags(&self) -> &[CheckedFlag] {
        &self.checked
    }

    /// Record a passed check, placing the marker first.
    pub(crate) fn stamp(mut self, template_id: &str) -> Self {
        self.checked.insert(
            0,
            CheckedFlag {
                template_id: template_id.to_owned(),
            },
        );
        self
    }

    /// Command line joined for display.
    pub fn display_command(&self) -> String {
        self.command.join(" ")
    }
}

/// Outcome of a completed launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchResult {
    /// Process exit code (`None` when killed).
    pub exit_code: Option<i32>,
    /// Captured stdout text.
    pub stdout: String,
    /// Captured stderr text.
    pub stderr: String,
    /// Wall-clock duration of the launch.
    pub duration: Duration,
}

impl LaunchResult {
    /// Returns `true` when the process exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Errors produced anywhere in a launcher chain.
#[derive(Debug, thiserror::Error)]
pub enum LauncherError {
    /// A guard refused the launch.
    #[error(transparent)]
    Guard(#[from] GuardError),
    /// The innermost launcher could not start the process.
    #[error("launch failed: {0}")]
    Failed(String),
}

/// Starts processes on a node.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Launch the requested process and wait for it.
    async fn launch(&self, request: LaunchRequest) -> Result<LaunchResult, LauncherError>;
}
