//! Pre-launch command validation.
//!
//! This module decides whether a split pipeline may run at all:
//! - The first stage must invoke a supported Kubernetes CLI with an action
//! - Later stages must be allowed Unix text utilities
//! - Dangerous prefixes are refused unless a safe prefix matches
//! - No stage may use shell syntax beyond the `|` that joins stages
//! - `kubectl exec` may not open a bare interactive shell
//!
//! Validation happens on the stages *before* context injection, so the
//! policy sees exactly what the caller asked for.

pub mod rules;

pub use rules::{RegexRule, SecurityRules, ALLOWED_PIPE_COMMANDS};

use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::pipeline::{tokenize, CharClass, QuoteState, Scanner, Token};
use crate::tools::{supported_tool_names, CliTool};
use crate::util::squash_whitespace;

/// Shell programs that `kubectl exec` must not open without `-c` or `-it`.
const SHELLS: &[&str] = &["sh", "bash", "zsh", "ksh", "csh", "ash", "dash"];

/// Flags that make `kubectl exec` explicitly interactive.
const INTERACTIVE_FLAGS: &[&str] = &["-i", "-t", "-it", "-ti", "--stdin", "--tty"];

/// Whether commands are validated before launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityMode {
    /// Every command is validated.
    #[default]
    Strict,
    /// Validation is skipped.
    Permissive,
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::Permissive => f.write_str("permissive"),
        }
    }
}

impl FromStr for SecurityMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "permissive" => Ok(Self::Permissive),
            other => Err(format!("expected 'strict' or 'permissive', got '{}'", other)),
        }
    }
}

/// Validates split pipelines against [`SecurityRules`].
///
/// # Examples
///
/// ```
/// use kubepipe::security::{CommandValidator, SecurityMode};
///
/// let validator = CommandValidator::new(SecurityMode::Strict);
/// assert!(validator.validate(&["kubectl get pods", "grep Running"]).is_ok());
/// assert!(validator.validate(&["rm -rf /"]).is_err());
/// assert!(validator.validate(&["kubectl get pods", "sh -c id"]).is_err());
/// assert!(validator.validate(&["kubectl get pods", "grep x; id"]).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct CommandValidator {
    mode: SecurityMode,
    rules: SecurityRules,
}

impl Default for CommandValidator {
    fn default() -> Self {
        Self::new(SecurityMode::default())
    }
}

impl CommandValidator {
    /// Creates a validator with the built-in rules.
    #[must_use]
    pub fn new(mode: SecurityMode) -> Self {
        Self {
            mode,
            rules: SecurityRules::default(),
        }
    }

    /// Replaces the rule tables.
    #[must_use]
    pub fn with_rules(mut self, rules: SecurityRules) -> Self {
        self.rules = rules;
        self
    }

    /// The configured mode.
    #[must_use]
    pub fn mode(&self) -> SecurityMode {
        self.mode
    }

    /// Validates the stages of one pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Rejected`] naming the first offending stage.
    pub fn validate<S: AsRef<str>>(&self, stages: &[S]) -> EngineResult<()> {
        if self.mode == SecurityMode::Permissive {
            warn!("Running in permissive security mode, skipping validation");
            return Ok(());
        }

        let Some((first, rest)) = stages.split_first() else {
            return Err(EngineError::rejected("", "Empty command"));
        };

        for (idx, stage) in stages.iter().enumerate() {
            let stage = stage.as_ref();
            if let Some(operator) = shell_operator(stage) {
                return Err(reject(
                    stage,
                    format!(
                        "Shell operator '{}' at position {} is not allowed. Only '|' may join commands.",
                        operator, idx
                    ),
                ));
            }
        }

        self.validate_tool_stage(first.as_ref())?;
        for (idx, stage) in rest.iter().enumerate() {
            validate_pipe_stage(stage.as_ref(), idx + 1)?;
        }

        debug!(stages = stages.len(), "Command validation successful");
        Ok(())
    }

    fn validate_tool_stage(&self, stage: &str) -> EngineResult<()> {
        let tokens = tokenize(stage);
        let Some(program) = tokens.first() else {
            return Err(EngineError::rejected(stage, "Empty command"));
        };

        let tool = CliTool::from_program(&program.value).ok_or_else(|| {
            EngineError::rejected(
                stage,
                format!(
                    "Command must start with a supported CLI tool: {}",
                    supported_tool_names()
                ),
            )
        })?;

        if tokens.len() < 2 {
            return Err(EngineError::rejected(
                stage,
                format!("Command must include a {} action", tool),
            ));
        }

        if tool == CliTool::Kubectl && !is_safe_exec(&tokens) {
            return Err(reject(
                stage,
                "Interactive shells via kubectl exec are restricted. Use explicit commands or proper flags (-it, --command, etc).",
            ));
        }

        let tool_name = tool.as_str();
        for rule in self.rules.regex_for(tool_name) {
            if rule.pattern.is_match(stage) {
                debug!(
                    command = %stage,
                    rule = %rule.description,
                    "Command matches restricted pattern"
                );
                return Err(reject(stage, rule.error_message.clone()));
            }
        }

        let normalized = squash_whitespace(stage);
        let dangerous = self
            .rules
            .dangerous_for(tool_name)
            .iter()
            .find(|prefix| normalized.starts_with(prefix.as_str()));

        if let Some(dangerous) = dangerous {
            let safe = self
                .rules
                .safe_for(tool_name)
                .iter()
                .any(|prefix| normalized.starts_with(prefix.as_str()));
            if safe {
                debug!(command = %stage, "Command matches safe pattern");
                return Ok(());
            }
            return Err(reject(
                stage,
                format!(
                    "This command ({}) is restricted for safety reasons. Please use a more specific form with resource type and name.",
                    dangerous
                ),
            ));
        }

        Ok(())
    }
}

fn validate_pipe_stage(stage: &str, position: usize) -> EngineResult<()> {
    let tokens = tokenize(stage);
    let Some(program) = tokens.first() else {
        return Err(EngineError::rejected(
            stage,
            format!("Empty command at position {} in pipe", position),
        ));
    };

    if !ALLOWED_PIPE_COMMANDS.contains(&program.value.as_str()) {
        return Err(reject(
            stage,
            format!(
                "Command '{}' at position {} in pipe is not allowed. Only {} commands and basic Unix utilities are permitted.",
                program.value,
                position,
                supported_tool_names()
            ),
        ));
    }
    Ok(())
}

/// Returns the first live shell operator in a stage, if any.
///
/// Single-quoted and backslash-escaped text is literal. Outside quotes
/// command separators, background jobs, redirections and substitutions
/// are all live. Inside double quotes only substitutions are.
fn shell_operator(stage: &str) -> Option<&'static str> {
    let mut scanner = Scanner::new(stage);
    let mut after_escape = false;
    let mut live_dollar = false;

    while let Some((_, ch, class)) = scanner.next() {
        let bare = class == CharClass::Bare;
        let double_quoted =
            class == CharClass::Quoted && !after_escape && scanner.state() == QuoteState::Double;
        after_escape = class == CharClass::Syntax && ch == '\\';

        let operator = match ch {
            '(' if live_dollar => Some("$("),
            '`' if bare || double_quoted => Some("`"),
            ';' if bare => Some(";"),
            '&' if bare => Some("&"),
            '>' if bare => Some(">"),
            '<' if bare => Some("<"),
            '\n' if bare => Some("newline"),
            _ => None,
        };
        if operator.is_some() {
            return operator;
        }
        live_dollar = ch == '$' && (bare || double_quoted);
    }
    None
}

fn reject(stage: &str, reason: impl Into<String>) -> EngineError {
    let err = EngineError::rejected(stage, reason);
    warn!(command = %stage, error = %err, "Security violation: command blocked");
    err
}

/// Returns `false` for `kubectl exec ... -- <shell>` without `-c` and
/// without explicit interactive flags.
fn is_safe_exec(tokens: &[Token]) -> bool {
    if !tokens.iter().skip(1).any(|t| t.value == "exec") {
        return true;
    }

    let separator = tokens.iter().position(|t| t.value == "--");
    let (before, after) = match separator {
        Some(idx) => (&tokens[..idx], &tokens[idx + 1..]),
        None => return true,
    };

    if before
        .iter()
        .any(|t| matches!(t.value.as_str(), "--help" | "-h"))
    {
        return true;
    }

    let Some(program) = after.first() else {
        return true;
    };
    let base = program.value.rsplit('/').next().unwrap_or(&program.value);
    if !SHELLS.contains(&base) {
        return true;
    }

    let runs_script = after.iter().skip(1).any(|t| t.value == "-c");
    let interactive = before
        .iter()
        .any(|t| INTERACTIVE_FLAGS.contains(&t.value.as_str()));

    runs_script || interactive
}
