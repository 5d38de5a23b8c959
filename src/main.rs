//! Kubepipe - run Kubernetes CLI pipelines with namespace injection

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kubepipe::security::SecurityMode;
use kubepipe::tools::CliTool;
use kubepipe::types::EngineConfig;
use kubepipe::Executor;

#[derive(Parser, Debug)]
#[command(name = "kubepipe")]
#[command(about = "Kubepipe - pipe-aware command runner for kubectl, istioctl, helm and argocd")]
#[command(version)]
struct Args {
    /// Namespace injected into the first stage (or set K8S_NAMESPACE)
    #[arg(short, long, global = true)]
    namespace: Option<String>,

    /// Kube context injected into the first stage (or set K8S_CONTEXT)
    #[arg(long, global = true)]
    context: Option<String>,

    /// Command timeout, e.g. "30s" or "2m" (or set K8S_MCP_TIMEOUT in seconds)
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Skip command validation
    #[arg(long, global = true)]
    permissive: bool,

    /// Truncate stdout after this many characters (0 disables truncation)
    #[arg(long, global = true)]
    max_output: Option<usize>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a command or pipeline and print the result as JSON
    Run {
        /// The command line, e.g. "kubectl get pods | grep Running"
        #[arg(value_name = "COMMAND", num_args = 1.., required = true)]
        command: Vec<String>,
    },
    /// Print help for a tool or one of its subcommands
    Help {
        /// kubectl, istioctl, helm or argocd
        tool: CliTool,
        /// Subcommand to describe
        subcommand: Option<String>,
    },
    /// Check whether a tool is installed
    Check {
        /// kubectl, istioctl, helm or argocd
        tool: CliTool,
    },
    /// Print the command that would run, after validation and injection
    Plan {
        /// The command line to prepare
        #[arg(value_name = "COMMAND", num_args = 1.., required = true)]
        command: Vec<String>,
    },
}

impl Args {
    fn config(&self) -> Result<EngineConfig> {
        let mut config = EngineConfig::from_env().context("Invalid environment configuration")?;

        if let Some(namespace) = &self.namespace {
            config.namespace = namespace.clone();
        }
        if let Some(context) = &self.context {
            config.kube_context = Some(context.clone()).filter(|c| !c.is_empty());
        }
        if let Some(timeout) = self.timeout {
            config.default_timeout = timeout;
        }
        if let Some(max_output) = self.max_output {
            config.max_output_size = (max_output > 0).then_some(max_output);
        }
        if self.permissive {
            config.security_mode = SecurityMode::Permissive;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = args.config()?;
    let ctx = config.context();
    let executor = Executor::new(config);

    match args.command {
        Command::Run { command } => {
            let command = command.join(" ");

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted; cancelling command");
                    on_interrupt.cancel();
                }
            });

            let result = executor.execute_with_cancel(&command, &ctx, &cancel).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.success {
                std::process::exit(1);
            }
        }
        Command::Help { tool, subcommand } => {
            let help = executor.command_help(tool, subcommand.as_deref()).await;
            println!("{}", help.help_text);
            if !help.success {
                std::process::exit(1);
            }
        }
        Command::Check { tool } => {
            let installed = executor.is_installed(tool).await;
            println!(
                "{}",
                serde_json::json!({ "tool": tool, "installed": installed })
            );
            if !installed {
                std::process::exit(1);
            }
        }
        Command::Plan { command } => {
            let command = command.join(" ");
            let prepared = executor
                .prepare(&command, &ctx)
                .with_context(|| format!("Cannot run {:?}", command))?;
            println!("{}", prepared.command_line);
        }
    }

    Ok(())
}
