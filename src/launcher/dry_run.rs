//! Launcher that reports what would run without starting anything.

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use super::{LaunchRequest, LaunchResult, Launcher, LauncherError};

/// Innermost launcher for operator dry runs.
#[derive(Debug, Clone, Default)]
pub struct DryRunLauncher;

#[async_trait]
impl Launcher for DryRunLauncher {
    async fn launch(&self, request: LaunchRequest) -> Result<LaunchResult, LauncherError> {
        if request.command.is_empty() {
            return Err(LauncherError::Failed("empty command".to_owned()));
        }
        let command = request.display_command();
        info!(launch_id = %request.id, command = %command, "dry run launch");
        Ok(LaunchResult {
            exit_code: Some(0),
            stdout: format!("dry run: {command}"),
            stderr: String::new(),
            duration: Duration::ZERO,
        })
    }
}
