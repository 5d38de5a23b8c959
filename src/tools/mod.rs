//! Supported Kubernetes CLI tools.
//!
//! Each tool knows how to check that it is installed and how to ask it for
//! help. Authentication hints for failed commands also live here because
//! they are tool-specific.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::Outcome;

/// A Kubernetes CLI tool the engine knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CliTool {
    /// `kubectl`
    Kubectl,
    /// `istioctl`
    Istioctl,
    /// `helm`
    Helm,
    /// `argocd`
    Argocd,
}

impl CliTool {
    /// All supported tools, in display order.
    pub const ALL: [CliTool; 4] = [Self::Kubectl, Self::Istioctl, Self::Helm, Self::Argocd];

    /// Executable name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kubectl => "kubectl",
            Self::Istioctl => "istioctl",
            Self::Helm => "helm",
            Self::Argocd => "argocd",
        }
    }

    /// Looks up a tool by its executable name.
    #[must_use]
    pub fn from_program(program: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == program)
    }

    /// Command that exits 0 when the tool is installed, without needing a cluster.
    #[must_use]
    pub fn check_command(&self) -> &'static str {
        match self {
            Self::Kubectl => "kubectl version --client",
            Self::Istioctl => "istioctl version --remote=false",
            Self::Helm => "helm version",
            Self::Argocd => "argocd version --client",
        }
    }

    /// Flag that prints usage.
    #[must_use]
    pub fn help_flag(&self) -> &'static str {
        "--help"
    }

    /// Builds the help invocation for the tool or one of its subcommands.
    #[must_use]
    pub fn help_command(&self, subcommand: Option<&str>) -> String {
        match subcommand.map(str::trim).filter(|s| !s.is_empty()) {
            Some(sub) => format!("{} {} {}", self.as_str(), sub, self.help_flag()),
            None => format!("{} {}", self.as_str(), self.help_flag()),
        }
    }

    /// Advice appended to authentication failures.
    #[must_use]
    pub fn auth_hint(&self) -> &'static str {
        match self {
            Self::Kubectl => "Please check your kubeconfig.",
            Self::Istioctl => "Please check your Istio configuration.",
            Self::Helm => "Please check your Helm repository configuration.",
            Self::Argocd => "Please check your ArgoCD login status.",
        }
    }

    /// Returns `true` if `--namespace`/`--context` injection applies to this tool.
    #[must_use]
    pub fn is_context_aware(&self) -> bool {
        matches!(self, Self::Kubectl | Self::Istioctl)
    }
}

impl fmt::Display for CliTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CliTool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_program(&s.to_ascii_lowercase()).ok_or_else(|| {
            format!(
                "unsupported CLI tool '{}' (expected one of: {})",
                s,
                supported_tool_names()
            )
        })
    }
}

/// Comma-separated list of supported executables.
#[must_use]
pub fn supported_tool_names() -> String {
    CliTool::ALL
        .iter()
        .map(CliTool::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Help text retrieved from a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandHelp {
    /// Help output, or the error text if the help command failed.
    pub help_text: String,
    /// Whether the help command succeeded.
    pub success: bool,
    /// How the help command ended.
    pub outcome: Outcome,
}
