//! Namespace and kube-context injection.
//!
//! Only the first stage of a pipeline talks to the cluster; later stages
//! filter its text output. [`inject_pipeline`] therefore rewrites stage one
//! and passes every other stage through byte-for-byte.
//!
//! Whether a stage gets `--namespace` is decided by a static table of verbs
//! per tool ([`rule_for_verb`]) plus a list of cluster-scoped resource
//! kinds. Flags are appended to the stage text, or placed before a `--`
//! separator so they never leak into a container command.
//!
//! # Examples
//!
//! ```
//! use kubepipe::inject::inject_context;
//! use kubepipe::types::ExecutionContext;
//!
//! let ctx = ExecutionContext::new("demo");
//! assert_eq!(inject_context("kubectl get pods", &ctx), "kubectl get pods --namespace demo");
//! assert_eq!(inject_context("kubectl get nodes", &ctx), "kubectl get nodes");
//! assert_eq!(inject_context("grep Running", &ctx), "grep Running");
//! ```

use std::borrow::Cow;
use tracing::{debug, warn};

use crate::pipeline::{tokenize, Token};
use crate::tools::CliTool;
use crate::types::ExecutionContext;

/// What a verb means for namespace injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InjectionRule {
    /// Operates on namespaced objects; gets `--namespace` unless the
    /// target resource is cluster-scoped.
    Namespaced,
    /// Never scoped to a namespace.
    ClusterScoped,
}

/// Verb table for `kubectl`.
pub const KUBECTL_VERBS: &[(&str, InjectionRule)] = &[
    ("get", InjectionRule::Namespaced),
    ("describe", InjectionRule::Namespaced),
    ("delete", InjectionRule::Namespaced),
    ("edit", InjectionRule::Namespaced),
    ("label", InjectionRule::Namespaced),
    ("annotate", InjectionRule::Namespaced),
    ("patch", InjectionRule::Namespaced),
    ("apply", InjectionRule::Namespaced),
    ("logs", InjectionRule::Namespaced),
    ("exec", InjectionRule::Namespaced),
    ("rollout", InjectionRule::Namespaced),
    ("scale", InjectionRule::Namespaced),
    ("autoscale", InjectionRule::Namespaced),
    ("expose", InjectionRule::Namespaced),
    ("api-resources", InjectionRule::ClusterScoped),
    ("api-versions", InjectionRule::ClusterScoped),
    ("cluster-info", InjectionRule::ClusterScoped),
    ("config", InjectionRule::ClusterScoped),
    ("version", InjectionRule::ClusterScoped),
    ("completion", InjectionRule::ClusterScoped),
    ("plugin", InjectionRule::ClusterScoped),
];

/// Verb table for `istioctl`.
pub const ISTIOCTL_VERBS: &[(&str, InjectionRule)] = &[
    ("analyze", InjectionRule::Namespaced),
    ("version", InjectionRule::ClusterScoped),
    ("completion", InjectionRule::ClusterScoped),
];

/// Resource kinds that never live in a namespace.
pub const CLUSTER_SCOPED_RESOURCES: &[&str] = &[
    "nodes",
    "node",
    "no",
    "namespaces",
    "namespace",
    "ns",
    "pv",
    "persistentvolumes",
    "persistentvolume",
    "storageclasses",
    "storageclass",
    "sc",
    "clusterroles",
    "clusterrole",
    "clusterrolebindings",
    "clusterrolebinding",
    "apiservices",
    "apiservice",
    "certificatesigningrequests",
    "certificatesigningrequest",
    "csr",
];

/// Global flags whose value is a separate word (`--context prod`).
const VALUE_FLAGS: &[&str] = &[
    "-n",
    "--namespace",
    "--context",
    "--kubeconfig",
    "--cluster",
    "--user",
    "-s",
    "--server",
    "--token",
    "--as",
    "-o",
    "--output",
    "-l",
    "--selector",
    "-c",
    "--container",
    "-f",
    "--filename",
];

/// Looks up how `verb` is treated for `tool`.
///
/// Returns `None` for tools without context support and for verbs not in
/// the table.
#[must_use]
pub fn rule_for_verb(tool: CliTool, verb: &str) -> Option<InjectionRule> {
    let table = match tool {
        CliTool::Kubectl => KUBECTL_VERBS,
        CliTool::Istioctl => ISTIOCTL_VERBS,
        CliTool::Helm | CliTool::Argocd => return None,
    };
    table
        .iter()
        .find(|(name, _)| *name == verb)
        .map(|(_, rule)| *rule)
}

/// Returns `true` if `resource` names a cluster-scoped kind.
///
/// Accepts `kind/name` and comma-separated lists; any cluster-scoped entry
/// counts.
#[must_use]
pub fn is_cluster_scoped_resource(resource: &str) -> bool {
    resource.split(',').any(|part| {
        let kind = part.split('/').next().unwrap_or(part);
        let kind = kind.split('.').next().unwrap_or(kind);
        CLUSTER_SCOPED_RESOURCES.contains(&kind.to_ascii_lowercase().as_str())
    })
}

/// What a stage already says about its own scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageScope {
    /// Tool the stage invokes.
    pub tool: CliTool,
    /// Rule of the first recognised verb, if any.
    pub rule: Option<InjectionRule>,
    /// The verb's target resource is cluster-scoped.
    pub cluster_resource: bool,
    /// `-n`/`--namespace` is present.
    pub has_namespace: bool,
    /// `--context` is present.
    pub has_context: bool,
    /// `-A`/`--all-namespaces` is present.
    pub all_namespaces: bool,
    /// Byte offset of an unquoted `--` separator.
    pub separator: Option<usize>,
}

impl StageScope {
    /// Inspects a single stage. Returns `None` unless it runs a
    /// context-aware tool.
    #[must_use]
    pub fn analyze(stage: &str) -> Option<Self> {
        let tokens = tokenize(stage);
        let tool = tokens
            .first()
            .and_then(|t| CliTool::from_program(&t.value))
            .filter(CliTool::is_context_aware)?;

        let mut scope = Self {
            tool,
            rule: None,
            cluster_resource: false,
            has_namespace: false,
            has_context: false,
            all_namespaces: false,
            separator: None,
        };

        let mut awaiting_resource = false;
        let mut skip_value = false;
        for token in &tokens[1..] {
            if skip_value {
                skip_value = false;
                continue;
            }
            if token.value == "--" {
                scope.separator = Some(token.start);
                break;
            }
            if token.is_flag() {
                scope.observe_flag(token);
                skip_value = VALUE_FLAGS.contains(&token.value.as_str());
                continue;
            }
            if awaiting_resource {
                scope.cluster_resource = is_cluster_scoped_resource(&token.value);
                awaiting_resource = false;
            } else if scope.rule.is_none() {
                scope.rule = rule_for_verb(tool, &token.value);
                awaiting_resource = scope.rule == Some(InjectionRule::Namespaced);
            }
        }

        Some(scope)
    }

    fn observe_flag(&mut self, token: &Token) {
        let flag = token.value.as_str();
        if flag.starts_with("--namespace") || (flag.starts_with("-n") && !flag.starts_with("--"))
        {
            self.has_namespace = true;
        } else if flag.starts_with("--context") {
            self.has_context = true;
        } else if flag == "-A" || flag.starts_with("--all-namespaces") {
            self.all_namespaces = true;
        }
    }

    /// Returns `true` if `--namespace` should be added.
    #[must_use]
    pub fn needs_namespace(&self) -> bool {
        self.rule == Some(InjectionRule::Namespaced)
            && !self.cluster_resource
            && !self.has_namespace
            && !self.all_namespaces
    }
}

/// Adds `--context`/`--namespace` to a single stage when appropriate.
///
/// Stages that do not run `kubectl`/`istioctl`, that already carry the
/// flags, or whose verb is not namespaced are returned unchanged. Applying
/// the function twice gives the same result as applying it once.
#[must_use]
pub fn inject_context(stage: &str, ctx: &ExecutionContext) -> String {
    let Some(scope) = StageScope::analyze(stage) else {
        return stage.to_string();
    };

    let mut flags: Vec<(&str, &str)> = Vec::new();
    if let Some(context) = ctx.kube_context.as_deref().filter(|c| !c.is_empty()) {
        if !scope.has_context {
            flags.push(("--context", context));
        }
    }
    if !ctx.namespace.is_empty() && scope.needs_namespace() {
        flags.push(("--namespace", ctx.namespace.as_str()));
    }

    if flags.is_empty() {
        return stage.to_string();
    }

    let mut rendered = Vec::with_capacity(flags.len() * 2);
    for (flag, value) in flags {
        let Some(value) = quote(value) else {
            warn!(value = %value, "Cannot quote injected value; leaving stage unchanged");
            return stage.to_string();
        };
        rendered.push(flag.to_string());
        rendered.push(value.into_owned());
    }
    let rendered = rendered.join(" ");

    let injected = match scope.separator {
        Some(offset) => format!(
            "{} {} {}",
            stage[..offset].trim_end(),
            rendered,
            &stage[offset..]
        ),
        None => format!("{} {}", stage, rendered),
    };
    debug!(stage = %stage, injected = %injected, "Injected execution context");
    injected
}

/// Injects context into the first stage and passes the rest through.
#[must_use]
pub fn inject_pipeline<S: AsRef<str>>(stages: &[S], ctx: &ExecutionContext) -> Vec<String> {
    stages
        .iter()
        .enumerate()
        .map(|(idx, stage)| {
            let stage = stage.as_ref();
            if idx == 0 {
                inject_context(stage, ctx)
            } else {
                stage.to_string()
            }
        })
        .collect()
}

fn quote(value: &str) -> Option<Cow<'_, str>> {
    shlex::try_quote(value).ok()
}
