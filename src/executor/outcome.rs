//! Normalization of raw process outcomes into [`ExecutionResult`].
//!
//! Three raw shapes come out of the executor: the process exited on its
//! own, the engine killed it (timeout or cancellation), or it never
//! started. [`ResultAggregator::to_result`] folds all of them into the one
//! result type callers branch on.

use std::time::Duration;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::tools::CliTool;
use crate::types::{ExecutionResult, Outcome, NOT_LAUNCHED};
use crate::util::truncate_chars;

/// Suffix appended to truncated stdout.
pub const TRUNCATION_NOTICE: &str = "\n... (output truncated)";

/// Substrings of stderr that indicate an authentication problem.
const AUTH_ERROR_PATTERNS: &[&str] = &[
    "unable to connect to the server",
    "unauthorized",
    "forbidden",
    "invalid kubeconfig",
    "unable to load authentication",
    "error loading config",
    "no configuration has been provided",
    "you must be logged in",
    "error: helm repo",
];

/// Why the engine killed a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The timeout elapsed.
    TimedOut {
        /// The timeout that was exceeded.
        after: Duration,
    },
    /// The caller cancelled the invocation.
    Cancelled,
}

/// Raw result of one invocation, before normalization.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// The process exited by itself.
    Exited {
        /// Launched command line.
        command: String,
        /// Tool of the first stage, used for auth hints.
        tool: Option<CliTool>,
        /// Shell-style return code.
        return_code: i32,
        /// Captured stdout.
        stdout: Vec<u8>,
        /// Captured stderr.
        stderr: Vec<u8>,
        /// Time from start of the call to exit.
        duration: Duration,
    },
    /// The engine killed the process group.
    Terminated {
        /// Launched command line.
        command: String,
        /// Why it was killed.
        reason: Termination,
        /// Return code after the kill, if the child was reaped.
        return_code: Option<i32>,
        /// Output captured before and shortly after the kill.
        stdout: Vec<u8>,
        /// Output captured before and shortly after the kill.
        stderr: Vec<u8>,
        /// Time from start of the call to the kill.
        duration: Duration,
    },
    /// No process ran.
    NotStarted {
        /// Why nothing ran.
        error: EngineError,
        /// Time spent before giving up.
        duration: Duration,
    },
}

/// Turns [`ProcessOutcome`]s into [`ExecutionResult`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultAggregator {
    /// Stdout is cut to this many characters when set.
    pub max_output_size: Option<usize>,
}

impl ResultAggregator {
    /// Creates an aggregator with an optional stdout limit.
    #[must_use]
    pub fn new(max_output_size: Option<usize>) -> Self {
        Self { max_output_size }
    }

    /// Normalizes one outcome. Never fails.
    #[must_use]
    pub fn to_result(&self, outcome: ProcessOutcome) -> ExecutionResult {
        match outcome {
            ProcessOutcome::Exited {
                command,
                tool,
                return_code,
                stdout,
                stderr,
                duration,
            } => {
                let stdout = self.limit(decode(&stdout));
                let stderr = decode(&stderr);
                let success = return_code == 0;

                let (outcome, hint) = if success {
                    (Outcome::Completed, None)
                } else if is_auth_error(&stderr) {
                    let hint = tool.map_or("Please check your credentials.", |t| t.auth_hint());
                    (Outcome::AuthFailed, Some(hint.to_string()))
                } else {
                    (Outcome::Failed, None)
                };

                if success {
                    debug!(command = %command, "Command completed");
                } else {
                    warn!(command = %command, return_code, outcome = %outcome, "Command failed");
                }

                ExecutionResult {
                    success,
                    return_code,
                    stdout,
                    stderr,
                    duration_ms: millis(duration),
                    timed_out: false,
                    outcome,
                    command,
                    hint,
                }
            }
            ProcessOutcome::Terminated {
                command,
                reason,
                return_code,
                stdout,
                stderr,
                duration,
            } => {
                let (outcome, message) = match reason {
                    Termination::TimedOut { after } => (
                        Outcome::TimedOut,
                        EngineError::timeout(command.as_str(), millis(after)).to_string(),
                    ),
                    Termination::Cancelled => (
                        Outcome::Cancelled,
                        EngineError::cancelled(command.as_str()).to_string(),
                    ),
                };

                ExecutionResult {
                    success: false,
                    return_code: return_code.unwrap_or(NOT_LAUNCHED),
                    stdout: self.limit(decode(&stdout)),
                    stderr: decode(&stderr),
                    duration_ms: millis(duration),
                    timed_out: outcome == Outcome::TimedOut,
                    outcome,
                    command,
                    hint: Some(message),
                }
            }
            ProcessOutcome::NotStarted { error, duration } => {
                let mut result = ExecutionResult::not_launched(
                    error.command(),
                    error.outcome(),
                    error.to_string(),
                );
                result.duration_ms = millis(duration);
                result
            }
        }
    }

    fn limit(&self, output: String) -> String {
        let Some(max) = self.max_output_size else {
            return output;
        };
        match truncate_chars(&output, max) {
            (_, false) => output,
            (kept, true) => {
                debug!(
                    original_size = output.len(),
                    max_size = max,
                    "Output truncated"
                );
                format!("{}{}", kept, TRUNCATION_NOTICE)
            }
        }
    }
}

/// Normalizes an outcome without an output limit.
#[must_use]
pub fn to_result(outcome: ProcessOutcome) -> ExecutionResult {
    ResultAggregator::default().to_result(outcome)
}

/// Returns `true` if `stderr` looks like a credentials or connectivity problem.
#[must_use]
pub fn is_auth_error(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    AUTH_ERROR_PATTERNS.iter().any(|p| lower.contains(p))
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
