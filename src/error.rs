//! Failure taxonomy for the execution engine.
//!
//! Nothing in this module escapes [`Executor::execute`]: every
//! [`EngineError`] is folded into an [`ExecutionResult`] by the result
//! aggregator. The enum exists so that each pre-launch or launch-time
//! failure is an explicit value with a fixed [`Outcome`], instead of ad-hoc
//! strings.
//!
//! Failures of a process that actually ran (nonzero exit, auth errors) are
//! not errors here; they are reported verbatim from the process outcome.
//!
//! [`Executor::execute`]: crate::executor::Executor::execute
//! [`ExecutionResult`]: crate::types::ExecutionResult
//!
//! # Example
//!
//! ```
//! use kubepipe::error::{EngineError, EngineResult};
//! use kubepipe::types::Outcome;
//!
//! fn require_stages(stages: &[String], command: &str) -> EngineResult<()> {
//!     if stages.is_empty() {
//!         return Err(EngineError::degenerate(command));
//!     }
//!     Ok(())
//! }
//!
//! let err = require_stages(&[], "|").unwrap_err();
//! assert_eq!(err.outcome(), Outcome::Degenerate);
//! ```

use std::fmt;

use crate::types::Outcome;

/// Result type alias using `EngineError`.
pub type EngineResult<T> = Result<T, EngineError>;

/// Everything that can stop a command from producing a normal exit status.
#[derive(Debug)]
pub enum EngineError {
    // ============== Parse Errors ==============
    /// Input had no usable stages after splitting.
    Degenerate {
        /// The raw input.
        command: String,
    },

    /// A stage could not be turned into an argument vector.
    Unparseable {
        /// The stage that failed to parse.
        command: String,
    },

    // ============== Security Errors ==============
    /// Command refused by the validation policy.
    Rejected {
        /// The command that was refused.
        command: String,
        /// Why it was refused.
        reason: String,
    },

    // ============== Process Errors ==============
    /// The program could not be spawned.
    Launch {
        /// The command line that failed to start.
        command: String,
        /// The OS error.
        source: std::io::Error,
    },

    /// The timeout fired before the process finished.
    Timeout {
        /// The command that timed out.
        command: String,
        /// Timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The caller cancelled the invocation.
    Cancelled {
        /// The command that was cancelled.
        command: String,
    },
}

// ============== Constructor Methods ==============

impl EngineError {
    /// Creates a degenerate-input error.
    #[must_use]
    pub fn degenerate(command: impl Into<String>) -> Self {
        Self::Degenerate {
            command: command.into(),
        }
    }

    /// Creates an unparseable-stage error.
    #[must_use]
    pub fn unparseable(command: impl Into<String>) -> Self {
        Self::Unparseable {
            command: command.into(),
        }
    }

    /// Creates a policy rejection.
    #[must_use]
    pub fn rejected(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Creates a launch failure from the spawn error.
    #[must_use]
    pub fn launch(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::Launch {
            command: command.into(),
            source,
        }
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(command: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            command: command.into(),
            timeout_ms,
        }
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled(command: impl Into<String>) -> Self {
        Self::Cancelled {
            command: command.into(),
        }
    }
}

// ============== Category Methods ==============

impl EngineError {
    /// The result classification this error is reported as.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Degenerate { .. } => Outcome::Degenerate,
            Self::Rejected { .. } => Outcome::Rejected,
            Self::Unparseable { .. } | Self::Launch { .. } => Outcome::LaunchFailed,
            Self::Timeout { .. } => Outcome::TimedOut,
            Self::Cancelled { .. } => Outcome::Cancelled,
        }
    }

    /// Returns `true` if the error came from the validation policy.
    #[must_use]
    pub fn is_security_related(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// The command the error refers to.
    #[must_use]
    pub fn command(&self) -> &str {
        match self {
            Self::Degenerate { command }
            | Self::Unparseable { command }
            | Self::Rejected { command, .. }
            | Self::Launch { command, .. }
            | Self::Timeout { command, .. }
            | Self::Cancelled { command } => command,
        }
    }
}

// ============== Display Implementation ==============

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Degenerate { command } => {
                write!(
                    f,
                    "parse: no command stages found in {:?}; nothing was executed",
                    command
                )
            }
            Self::Unparseable { command } => {
                write!(f, "parse: could not split {:?} into arguments", command)
            }
            Self::Rejected { command, reason } => {
                write!(f, "security: command '{}' rejected: {}", command, reason)
            }
            Self::Launch { command, source } => {
                write!(f, "launch: failed to start '{}': {}", command, source)
            }
            Self::Timeout {
                command,
                timeout_ms,
            } => {
                write!(
                    f,
                    "process: command '{}' timed out after {} ms",
                    command, timeout_ms
                )
            }
            Self::Cancelled { command } => {
                write!(f, "process: command '{}' was cancelled", command)
            }
        }
    }
}

// ============== Error Implementation ==============

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Launch { source, .. } => Some(source),
            _ => None,
        }
    }
}
