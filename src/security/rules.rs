//! Built-in and file-based validation rules.
//!
//! The defaults below can be replaced per tool from a YAML file:
//!
//! ```yaml
//! dangerous_commands:
//!   kubectl: ["kubectl delete", "kubectl drain"]
//! safe_patterns:
//!   kubectl: ["kubectl delete pod"]
//! regex_rules:
//!   kubectl:
//!     - pattern: "--force"
//!       description: "No forced operations"
//!       error_message: "Forced operations are not allowed"
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::types::ConfigError;

/// Unix utilities allowed after the first pipeline stage.
pub const ALLOWED_PIPE_COMMANDS: &[&str] = &[
    // Text processing
    "grep", "egrep", "fgrep", "sed", "awk", "cut", "sort", "uniq", "wc", "head", "tail", "tr",
    "column", "nl", "fold", "paste", "rev",
    // Structured data
    "jq", "yq", "base64",
    // Read-only information
    "cat", "echo", "date", "less", "more",
];

/// Command prefixes that are refused unless a safe pattern matches.
static DEFAULT_DANGEROUS: Lazy<BTreeMap<String, Vec<String>>> = Lazy::new(|| {
    table(&[
        (
            "kubectl",
            &[
                "kubectl delete",
                "kubectl drain",
                "kubectl replace --force",
                "kubectl exec",
                "kubectl port-forward",
                "kubectl cp",
            ],
        ),
        (
            "istioctl",
            &[
                "istioctl experimental",
                "istioctl proxy-config",
                "istioctl dashboard",
            ],
        ),
        (
            "helm",
            &["helm delete", "helm uninstall", "helm rollback", "helm upgrade"],
        ),
        (
            "argocd",
            &[
                "argocd app delete",
                "argocd cluster rm",
                "argocd repo rm",
                "argocd app set",
            ],
        ),
    ])
});

/// Command prefixes that override a dangerous match.
static DEFAULT_SAFE: Lazy<BTreeMap<String, Vec<String>>> = Lazy::new(|| {
    table(&[
        (
            "kubectl",
            &[
                "kubectl delete pod",
                "kubectl delete deployment",
                "kubectl delete service",
                "kubectl delete configmap",
                "kubectl delete secret",
                "kubectl exec --help",
                "kubectl exec -it",
                "kubectl exec pod",
                "kubectl exec deployment",
                "kubectl port-forward --help",
                "kubectl cp --help",
            ],
        ),
        (
            "istioctl",
            &[
                "istioctl experimental -h",
                "istioctl experimental --help",
                "istioctl proxy-config --help",
                "istioctl dashboard --help",
            ],
        ),
        (
            "helm",
            &[
                "helm delete --help",
                "helm uninstall --help",
                "helm rollback --help",
                "helm upgrade --help",
            ],
        ),
        (
            "argocd",
            &[
                "argocd app delete --help",
                "argocd cluster rm --help",
                "argocd repo rm --help",
                "argocd app set --help",
            ],
        ),
    ])
});

fn table(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    entries
        .iter()
        .map(|(tool, prefixes)| {
            (
                (*tool).to_string(),
                prefixes.iter().map(|p| (*p).to_string()).collect(),
            )
        })
        .collect()
}

/// A compiled regex restriction.
#[derive(Debug, Clone)]
pub struct RegexRule {
    /// Compiled pattern.
    pub pattern: Regex,
    /// Human-readable description.
    pub description: String,
    /// Message reported when the rule matches.
    pub error_message: String,
}

/// Validation tables, keyed by tool name.
#[derive(Debug, Clone)]
pub struct SecurityRules {
    /// Prefixes refused unless a safe pattern also matches.
    pub dangerous_commands: BTreeMap<String, Vec<String>>,
    /// Prefixes that are always allowed.
    pub safe_patterns: BTreeMap<String, Vec<String>>,
    /// Regex restrictions checked before prefixes.
    pub regex_rules: BTreeMap<String, Vec<RegexRule>>,
}

impl Default for SecurityRules {
    fn default() -> Self {
        Self {
            dangerous_commands: DEFAULT_DANGEROUS.clone(),
            safe_patterns: DEFAULT_SAFE.clone(),
            regex_rules: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RulesFile {
    #[serde(default)]
    dangerous_commands: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    safe_patterns: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    regex_rules: BTreeMap<String, Vec<RegexRuleFile>>,
}

#[derive(Debug, Deserialize)]
struct RegexRuleFile {
    pattern: String,
    #[serde(default)]
    description: String,
    error_message: Option<String>,
}

impl SecurityRules {
    /// Parses rules from YAML, layered over the defaults.
    ///
    /// A tool listed in the file replaces that tool's default list; tools
    /// not mentioned keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid YAML or a regex that does not compile.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let file: Option<RulesFile> = serde_yaml::from_str(yaml)?;
        let file = file.unwrap_or_default();
        let mut rules = Self::default();

        rules.dangerous_commands.extend(file.dangerous_commands);
        rules.safe_patterns.extend(file.safe_patterns);

        for (tool, entries) in file.regex_rules {
            let mut compiled = Vec::with_capacity(entries.len());
            for entry in entries {
                let pattern = Regex::new(&entry.pattern).map_err(|source| ConfigError::Regex {
                    pattern: entry.pattern.clone(),
                    source,
                })?;
                let error_message = entry.error_message.unwrap_or_else(|| {
                    format!("Command matches restricted pattern: {}", entry.pattern)
                });
                compiled.push(RegexRule {
                    pattern,
                    description: entry.description,
                    error_message,
                });
            }
            rules.regex_rules.insert(tool, compiled);
        }

        Ok(rules)
    }

    /// Reads rules from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rules = Self::from_yaml(&yaml)?;
        info!(path = %path.display(), "Loaded security configuration");
        Ok(rules)
    }

    /// Reads rules from `path` if given, falling back to the defaults on
    /// any error.
    #[must_use]
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match Self::load(path) {
            Ok(rules) => rules,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Error loading security configuration; using defaults"
                );
                Self::default()
            }
        }
    }

    /// Dangerous prefixes configured for `tool`.
    #[must_use]
    pub fn dangerous_for(&self, tool: &str) -> &[String] {
        self.dangerous_commands
            .get(tool)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Safe prefixes configured for `tool`.
    #[must_use]
    pub fn safe_for(&self, tool: &str) -> &[String] {
        self.safe_patterns
            .get(tool)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Regex rules configured for `tool`.
    #[must_use]
    pub fn regex_for(&self, tool: &str) -> &[RegexRule] {
        self.regex_rules
            .get(tool)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
