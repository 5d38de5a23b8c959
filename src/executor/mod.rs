//! Pipe-aware command execution.
//!
//! [`Executor`] runs one command string end to end:
//!
//! 1. Split on unquoted `|` into stages ([`split_pipeline`])
//! 2. Validate the stages against the security policy
//! 3. Inject `--context`/`--namespace` into the first stage
//! 4. Launch: single stages run directly from their argv, pipelines run
//!    through the platform shell so the OS wires the stages together
//! 5. Wait for exit, timeout or cancellation, whichever comes first
//! 6. Normalize everything into an [`ExecutionResult`]
//!
//! Every call owns its own process handle; nothing is shared between
//! concurrent invocations except the read-only configuration.
//!
//! # Examples
//!
//! ```no_run
//! use kubepipe::executor::Executor;
//! use kubepipe::types::{EngineConfig, ExecutionContext};
//!
//! # async fn example() {
//! let executor = Executor::new(EngineConfig::default());
//! let ctx = ExecutionContext::new("demo");
//! let result = executor.execute("kubectl get pods | grep Running", &ctx).await;
//! assert_eq!(result.command, "kubectl get pods --namespace demo | grep Running");
//! # }
//! ```

pub mod outcome;
pub(crate) mod process;

pub use outcome::{is_auth_error, to_result, ProcessOutcome, ResultAggregator, Termination};

use futures::future::join_all;
use std::io;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::inject::inject_pipeline;
use crate::pipeline::{is_pipeline, join_stages, split_pipeline, tokenize};
use crate::security::{CommandValidator, SecurityMode, SecurityRules};
use crate::shell::ShellConfig;
use crate::tools::{CliTool, CommandHelp};
use crate::types::{EngineConfig, ExecutionContext, ExecutionResult, NOT_LAUNCHED};
use process::{exit_code, ProcessHandle};

/// Timeout for `<tool> version` installation checks.
const CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for `<tool> --help` invocations.
const HELP_TIMEOUT: Duration = Duration::from_secs(30);

/// How a prepared command is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchMode {
    /// Run the program directly with these arguments (argv\[0\] first).
    Direct(Vec<String>),
    /// Hand the whole command line to the platform shell.
    Shell,
}

/// A command after splitting, validation and injection, ready to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCommand {
    /// The reassembled command line that will run.
    pub command_line: String,
    /// Stages after injection, in order.
    pub stages: Vec<String>,
    /// How the command will be started.
    pub launch: LaunchMode,
    /// Tool invoked by the first stage, if it is a supported one.
    pub tool: Option<CliTool>,
}

impl PreparedCommand {
    /// Returns `true` if the command has more than one stage.
    #[must_use]
    pub fn is_pipeline(&self) -> bool {
        self.stages.len() > 1
    }
}

/// What ended the wait on a running process.
enum Event {
    Exited(io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

/// Runs command strings as external processes.
#[derive(Debug)]
pub struct Executor {
    config: EngineConfig,
    validator: CommandValidator,
    aggregator: ResultAggregator,
    limiter: Option<Arc<Semaphore>>,
    shell: ShellConfig,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Executor {
    /// Creates an executor from `config`.
    ///
    /// Security rules are read from `config.security_config` when set;
    /// a missing or broken file falls back to the built-in rules.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let rules = SecurityRules::load_or_default(config.security_config.as_deref());
        let validator = CommandValidator::new(config.security_mode).with_rules(rules);
        let aggregator = ResultAggregator::new(config.max_output_size);
        let limiter = config
            .max_concurrent
            .filter(|limit| *limit > 0)
            .map(|limit| Arc::new(Semaphore::new(limit)));

        Self {
            config,
            validator,
            aggregator,
            limiter,
            shell: ShellConfig::default(),
        }
    }

    /// Replaces the command validator.
    #[must_use]
    pub fn with_validator(mut self, validator: CommandValidator) -> Self {
        self.validator = validator;
        self
    }

    /// The configuration this executor was built from.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The default per-call context derived from the configuration.
    #[must_use]
    pub fn context(&self) -> ExecutionContext {
        self.config.context()
    }

    /// Splits, validates and injects `command` without running it.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Degenerate`] if there are no stages
    /// - [`EngineError::Rejected`] if the security policy refuses a stage
    /// - [`EngineError::Unparseable`] if a single-stage command has no valid argv
    pub fn prepare(&self, command: &str, ctx: &ExecutionContext) -> EngineResult<PreparedCommand> {
        prepare_with(&self.validator, command, ctx)
    }

    /// Runs `command` under `ctx` and reports how it went.
    ///
    /// Never fails: parse errors, rejections, launch failures and timeouts
    /// are all reported through the returned [`ExecutionResult`].
    pub async fn execute(&self, command: &str, ctx: &ExecutionContext) -> ExecutionResult {
        self.execute_with_cancel(command, ctx, &CancellationToken::new())
            .await
    }

    /// Like [`execute`](Self::execute), but kills the process group as soon
    /// as `cancel` fires.
    pub async fn execute_with_cancel(
        &self,
        command: &str,
        ctx: &ExecutionContext,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        let span = info_span!("execute", id = %Uuid::new_v4());
        self.run(&self.validator, command, ctx, cancel)
            .instrument(span)
            .await
    }

    /// Runs several commands concurrently.
    ///
    /// Results come back in input order. With `max_concurrent` set, at most
    /// that many processes are alive at once.
    pub async fn execute_batch<I>(&self, commands: I) -> Vec<ExecutionResult>
    where
        I: IntoIterator<Item = (String, ExecutionContext)>,
    {
        let runs = commands
            .into_iter()
            .map(|(command, ctx)| async move { self.execute(&command, &ctx).await });
        join_all(runs).await
    }

    /// Returns `true` if `tool` answers its version check with exit code 0.
    pub async fn is_installed(&self, tool: CliTool) -> bool {
        let ctx = ExecutionContext::new("").with_timeout(CHECK_TIMEOUT);
        let result = self.execute(tool.check_command(), &ctx).await;
        debug!(tool = %tool, installed = result.success, "Checked tool installation");
        result.success
    }

    /// Retrieves `<tool> [subcommand] --help`.
    ///
    /// Help invocations bypass the dangerous-prefix rules (so `kubectl
    /// delete --help` works) but may not contain a pipeline.
    pub async fn command_help(&self, tool: CliTool, subcommand: Option<&str>) -> CommandHelp {
        let command = tool.help_command(subcommand);
        let result = if is_pipeline(&command) {
            let error = EngineError::rejected(
                command.as_str(),
                "Help subcommands may not contain a pipe",
            );
            self.not_started(&command, error, Instant::now())
        } else {
            let ctx = ExecutionContext::new("").with_timeout(HELP_TIMEOUT);
            let validator = CommandValidator::new(SecurityMode::Permissive);
            self.run(&validator, &command, &ctx, &CancellationToken::new())
                .instrument(info_span!("command_help", tool = %tool))
                .await
        };

        CommandHelp {
            help_text: result.output().to_string(),
            success: result.success,
            outcome: result.outcome,
        }
    }

    async fn run(
        &self,
        validator: &CommandValidator,
        command: &str,
        ctx: &ExecutionContext,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        let started = Instant::now();

        let prepared = match prepare_with(validator, command, ctx) {
            Ok(prepared) => prepared,
            Err(error) => return self.not_started(command, error, started),
        };

        let _permit = match &self.limiter {
            Some(limiter) => {
                let permit = tokio::select! {
                    biased;
                    () = cancel.cancelled() => None,
                    permit = limiter.acquire() => permit.ok(),
                };
                match permit {
                    Some(permit) => Some(permit),
                    None => {
                        return self.not_started(command, EngineError::cancelled(command), started)
                    }
                }
            }
            None => None,
        };

        if cancel.is_cancelled() {
            return self.not_started(command, EngineError::cancelled(command), started);
        }

        let mut handle = match ProcessHandle::spawn(self.build_command(&prepared)) {
            Ok(handle) => handle,
            Err(source) => {
                warn!(command = %prepared.command_line, error = %source, "Failed to launch command");
                let error = EngineError::launch(prepared.command_line.as_str(), source);
                return self.not_started(command, error, started);
            }
        };
        debug!(
            command = %prepared.command_line,
            pipeline = prepared.is_pipeline(),
            timeout_ms = ctx.timeout_ms(),
            "Command launched"
        );

        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => Event::Cancelled,
            status = handle.wait() => Event::Exited(status),
            () = tokio::time::sleep(ctx.timeout) => Event::TimedOut,
        };
        let duration = started.elapsed();

        let outcome = match event {
            Event::Exited(Ok(status)) => {
                let (stdout, stderr) = handle.collect_output().await;
                ProcessOutcome::Exited {
                    command: prepared.command_line,
                    tool: prepared.tool,
                    return_code: exit_code(&status),
                    stdout,
                    stderr,
                    duration,
                }
            }
            Event::Exited(Err(e)) => {
                warn!(command = %prepared.command_line, error = %e, "Failed to wait for process");
                let status = handle.terminate().await;
                let (stdout, mut stderr) = handle.collect_output().await;
                stderr.extend_from_slice(e.to_string().as_bytes());
                ProcessOutcome::Exited {
                    command: prepared.command_line,
                    tool: prepared.tool,
                    return_code: status.as_ref().map_or(NOT_LAUNCHED, exit_code),
                    stdout,
                    stderr,
                    duration,
                }
            }
            Event::TimedOut => {
                warn!(
                    command = %prepared.command_line,
                    timeout_ms = ctx.timeout_ms(),
                    "Command timed out; killing process group"
                );
                let reason = Termination::TimedOut { after: ctx.timeout };
                terminate(handle, prepared.command_line, reason, duration).await
            }
            Event::Cancelled => {
                warn!(command = %prepared.command_line, "Command cancelled; killing process group");
                terminate(handle, prepared.command_line, Termination::Cancelled, duration).await
            }
        };

        self.aggregator.to_result(outcome)
    }

    fn build_command(&self, prepared: &PreparedCommand) -> Command {
        let mut cmd = match &prepared.launch {
            LaunchMode::Direct(argv) => match argv.split_first() {
                Some((program, args)) => {
                    let mut cmd = Command::new(program);
                    cmd.args(args);
                    cmd
                }
                None => self.shell.build_command(&prepared.command_line),
            },
            LaunchMode::Shell => self.shell.build_command(&prepared.command_line),
        };
        cmd.envs(&self.config.env);
        cmd
    }

    /// Result for an invocation that never started a process. The result
    /// names the raw input; the error text names the offending piece.
    fn not_started(&self, command: &str, error: EngineError, started: Instant) -> ExecutionResult {
        if !error.is_security_related() {
            debug!(error = %error, "Command not launched");
        }
        let mut result = self.aggregator.to_result(ProcessOutcome::NotStarted {
            error,
            duration: started.elapsed(),
        });
        result.command = command.to_string();
        result
    }
}

async fn terminate(
    mut handle: ProcessHandle,
    command: String,
    reason: Termination,
    duration: Duration,
) -> ProcessOutcome {
    let status = handle.terminate().await;
    let (stdout, stderr) = handle.collect_output().await;
    ProcessOutcome::Terminated {
        command,
        reason,
        return_code: status.as_ref().map(exit_code),
        stdout,
        stderr,
        duration,
    }
}

fn prepare_with(
    validator: &CommandValidator,
    command: &str,
    ctx: &ExecutionContext,
) -> EngineResult<PreparedCommand> {
    let stages = split_pipeline(command);
    if stages.is_empty() {
        return Err(EngineError::degenerate(command));
    }

    validator.validate(&stages)?;

    let stages = inject_pipeline(&stages, ctx);
    let command_line = join_stages(&stages);
    let tool = stages
        .first()
        .and_then(|stage| tokenize(stage).into_iter().next())
        .and_then(|token| CliTool::from_program(&token.value));

    let launch = if stages.len() == 1 {
        let argv = shlex::split(&command_line)
            .filter(|argv| !argv.is_empty())
            .ok_or_else(|| EngineError::unparseable(command_line.as_str()))?;
        LaunchMode::Direct(argv)
    } else {
        LaunchMode::Shell
    };

    debug!(
        command = %command,
        prepared = %command_line,
        stages = stages.len(),
        "Prepared command"
    );

    Ok(PreparedCommand {
        command_line,
        stages,
        launch,
        tool,
    })
}
