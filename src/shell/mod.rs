//! Shell used to run multi-stage pipelines.
//!
//! Pipelines are handed to the platform shell as one script so the OS does
//! the stage-to-stage plumbing: the exit status is the last stage's, and
//! upstream stages see the usual broken-pipe behavior.
//!
//! # Examples
//!
//! ```
//! use kubepipe::shell::ShellConfig;
//!
//! let config = ShellConfig::default();
//! // On Unix: command = "sh", args = ["-c"]
//! // On Windows: command = "cmd.exe", args = ["/C"]
//! ```

use tokio::process::Command;

/// Configuration for platform-specific shell execution.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct ShellConfig {
    /// The shell executable (e.g., "sh" or "cmd.exe").
    pub command: String,
    /// Arguments to pass before the script (e.g., ["-c"] or ["/C"]).
    pub args: Vec<String>,
}

#[cfg(unix)]
impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            command: "sh".to_string(),
            args: vec!["-c".to_string()],
        }
    }
}

#[cfg(windows)]
impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            command: "cmd.exe".to_string(),
            args: vec!["/C".to_string()],
        }
    }
}

impl ShellConfig {
    /// Creates a `Command` that runs `script` through this shell.
    ///
    /// The returned command has no stdio or environment configured yet.
    ///
    /// # Examples
    ///
    /// ```
    /// use kubepipe::shell::ShellConfig;
    ///
    /// let cmd = ShellConfig::default().build_command("kubectl get pods | wc -l");
    /// assert_eq!(cmd.as_std().get_args().last().unwrap(), "kubectl get pods | wc -l");
    /// ```
    #[must_use]
    pub fn build_command(&self, script: &str) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args).arg(script);
        cmd
    }
}
