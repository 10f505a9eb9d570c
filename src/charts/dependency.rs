use crate::error::{ReleaseError, Result};
use std::path::Path;
use std::process::Command;

/// Refreshes the chart dependency lock after subchart versions change
pub trait DependencyRefresher {
    /// Run the refresh for `chart_dir`; blocks until it finishes
    fn refresh(&self, chart_dir: &Path) -> Result<()>;
}

/// Runs an external command (by default `helm dependency update <chart_dir>`)
#[derive(Debug, Clone)]
pub struct CommandRefresher {
    command: Vec<String>,
}

impl CommandRefresher {
    /// `command` is program plus arguments; the chart directory is appended.
    /// An empty command disables the refresh.
    pub fn new(command: Vec<String>) -> Self {
        CommandRefresher { command }
    }

    pub fn is_disabled(&self) -> bool {
        self.command.is_empty()
    }
}

impl DependencyRefresher for CommandRefresher {
    fn refresh(&self, chart_dir: &Path) -> Result<()> {
        let Some((program, args)) = self.command.split_first() else {
            log::info!("dependency refresh disabled, skipping");
            return Ok(());
        };

        if !chart_dir.is_dir() {
            return Err(ReleaseError::dependency(format!(
                "Chart directory not found: {}",
                chart_dir.display()
            )));
        }

        log::debug!("running {} {:?} {}", program, args, chart_dir.display());
        let output = Command::new(program)
            .args(args)
            .arg(chart_dir)
            .output()
            .map_err(|e| {
                ReleaseError::dependency(format!("Failed to execute '{}': {}", program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(ReleaseError::dependency(format!(
                "'{}' failed with exit code {}\nStdout: {}\nStderr: {}",
                self.command.join(" "),
                output.status.code().unwrap_or(-1),
                stdout.trim(),
                stderr.trim()
            )));
        }

        Ok(())
    }
}
