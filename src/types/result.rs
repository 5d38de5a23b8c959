//! Structured result of a command invocation.

use serde::{Deserialize, Serialize};

/// Return code reported when no process ran (degenerate input, rejected
/// command, launch failure).
pub const NOT_LAUNCHED: i32 = -1;

/// How an invocation ended.
///
/// Every path through the engine maps onto exactly one of these; callers
/// that only care about pass/fail can look at [`ExecutionResult::success`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Process exited with code 0.
    Completed,
    /// Process exited with a nonzero code.
    Failed,
    /// Process exited nonzero with an authentication-related error.
    AuthFailed,
    /// Process exceeded its timeout and was killed.
    TimedOut,
    /// Caller cancelled the invocation and the process was killed.
    Cancelled,
    /// The program could not be started.
    LaunchFailed,
    /// Input had no usable stages; nothing was launched.
    Degenerate,
    /// Command was refused by the security policy; nothing was launched.
    Rejected,
}

impl Outcome {
    /// Stable lowercase label, matching the serialized form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::AuthFailed => "auth_failed",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
            Self::LaunchFailed => "launch_failed",
            Self::Degenerate => "degenerate",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single value returned by every `execute` call.
///
/// Produced once per invocation and owned by the caller; the engine keeps
/// no reference to it.
///
/// # Examples
///
/// ```
/// use kubepipe::types::{ExecutionResult, Outcome};
///
/// let result = ExecutionResult::not_launched("", Outcome::Degenerate, "no stages");
/// assert!(!result.success);
/// assert_eq!(result.return_code, -1);
/// assert!(!result.timed_out);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// `true` iff the process ran and exited with code 0.
    pub success: bool,
    /// Exit code, `128 + signal` when killed by a signal, or [`NOT_LAUNCHED`].
    pub return_code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error, or an explanatory message when nothing ran.
    pub stderr: String,
    /// Wall-clock duration of the invocation.
    pub duration_ms: u64,
    /// `true` iff the timeout fired before the process finished.
    pub timed_out: bool,
    /// Classification of how the invocation ended.
    pub outcome: Outcome,
    /// The command line that was launched (after context injection), or the
    /// raw input when nothing was launched.
    pub command: String,
    /// Extra guidance for the caller, such as how to fix an auth failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ExecutionResult {
    /// Builds a result for an invocation that never started a process.
    #[must_use]
    pub fn not_launched(
        command: impl Into<String>,
        outcome: Outcome,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            return_code: NOT_LAUNCHED,
            stdout: String::new(),
            stderr: message.into(),
            duration_ms: 0,
            timed_out: false,
            outcome,
            command: command.into(),
            hint: None,
        }
    }

    /// Returns stdout on success and stderr otherwise.
    #[must_use]
    pub fn output(&self) -> &str {
        if self.success {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}
