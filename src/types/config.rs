//! Configuration types for kubepipe.
//!
//! [`EngineConfig`] holds everything an [`Executor`](crate::executor::Executor)
//! needs beyond the per-call context: default scope and timeout, output
//! limits, security mode, and the environment handed to child processes.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::context::{ExecutionContext, DEFAULT_NAMESPACE, DEFAULT_TIMEOUT};
use crate::security::SecurityMode;

/// Default cap on captured stdout, in characters.
pub const DEFAULT_MAX_OUTPUT: usize = 100_000;

/// Environment variable names read by [`EngineConfig::from_env`].
pub mod env {
    /// Timeout in seconds.
    pub const TIMEOUT: &str = "K8S_MCP_TIMEOUT";
    /// Maximum stdout size in characters.
    pub const MAX_OUTPUT: &str = "K8S_MCP_MAX_OUTPUT";
    /// Namespace to inject.
    pub const NAMESPACE: &str = "K8S_NAMESPACE";
    /// Kube context to inject.
    pub const CONTEXT: &str = "K8S_CONTEXT";
    /// `strict` or `permissive`.
    pub const SECURITY_MODE: &str = "K8S_MCP_SECURITY_MODE";
    /// Path to a YAML security rules file.
    pub const SECURITY_CONFIG: &str = "K8S_MCP_SECURITY_CONFIG";
    /// Maximum number of concurrently running processes.
    pub const MAX_CONCURRENT: &str = "K8S_MCP_MAX_CONCURRENT";
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        /// Variable name.
        name: String,
        /// Raw value.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A security rules file could not be read.
    #[error("IO error reading {path}: {source}")]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A security rules file was not valid YAML.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A regex rule did not compile.
    #[error("invalid regex rule {pattern:?}: {source}")]
    Regex {
        /// The offending pattern.
        pattern: String,
        /// Compilation error.
        #[source]
        source: regex::Error,
    },
}

/// Engine-wide configuration.
///
/// # Examples
///
/// ```
/// use kubepipe::types::EngineConfig;
/// use std::time::Duration;
///
/// let config = EngineConfig::default().with_namespace("demo");
/// let ctx = config.context();
/// assert_eq!(ctx.namespace, "demo");
/// assert_eq!(ctx.timeout, Duration::from_secs(300));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Timeout used by [`EngineConfig::context`].
    pub default_timeout: Duration,
    /// Stdout longer than this many characters is truncated. `None` disables it.
    pub max_output_size: Option<usize>,
    /// Namespace used by [`EngineConfig::context`].
    pub namespace: String,
    /// Kube context used by [`EngineConfig::context`].
    pub kube_context: Option<String>,
    /// Whether commands are validated before launch.
    pub security_mode: SecurityMode,
    /// YAML file overriding the built-in security rules.
    pub security_config: Option<PathBuf>,
    /// Cap on concurrently running processes. `None` means unbounded.
    pub max_concurrent: Option<usize>,
    /// Variables layered over the inherited environment of every child.
    pub env: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
            max_output_size: Some(DEFAULT_MAX_OUTPUT),
            namespace: DEFAULT_NAMESPACE.to_string(),
            kube_context: None,
            security_mode: SecurityMode::default(),
            security_config: None,
            max_concurrent: None,
            env: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from the process environment.
    ///
    /// Unset variables keep their defaults. When no security config path is
    /// given, `security.yaml` in the user config directory is used if present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a numeric or mode variable
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::from_lookup(|name| std::env::var(name).ok())?;
        if config.security_config.is_none() {
            config.security_config = crate::util::default_security_config()
                .filter(|path| path.is_file());
        }
        Ok(config)
    }

    /// Builds configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for unparseable values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(env::TIMEOUT) {
            config.default_timeout = Duration::from_secs(parse_number(env::TIMEOUT, &raw)?);
        }
        if let Some(raw) = lookup(env::MAX_OUTPUT) {
            config.max_output_size = Some(parse_number(env::MAX_OUTPUT, &raw)?);
        }
        if let Some(namespace) = lookup(env::NAMESPACE) {
            config.namespace = namespace;
        }
        if let Some(context) = lookup(env::CONTEXT).filter(|c| !c.is_empty()) {
            config.kube_context = Some(context);
        }
        if let Some(raw) = lookup(env::SECURITY_MODE) {
            config.security_mode =
                raw.parse()
                    .map_err(|reason: String| ConfigError::InvalidValue {
                        name: env::SECURITY_MODE.to_string(),
                        value: raw.clone(),
                        reason,
                    })?;
        }
        if let Some(path) = lookup(env::SECURITY_CONFIG).filter(|p| !p.is_empty()) {
            config.security_config = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup(env::MAX_CONCURRENT) {
            let limit: usize = parse_number(env::MAX_CONCURRENT, &raw)?;
            config.max_concurrent = (limit > 0).then_some(limit);
        }

        Ok(config)
    }

    /// Returns a copy with a different default namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Returns a copy with a different security mode.
    #[must_use]
    pub fn with_security_mode(mut self, mode: SecurityMode) -> Self {
        self.security_mode = mode;
        self
    }

    /// Returns a copy that sets `key=value` in every child environment.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Builds the default per-call context from this configuration.
    #[must_use]
    pub fn context(&self) -> ExecutionContext {
        ExecutionContext {
            namespace: self.namespace.clone(),
            kube_context: self.kube_context.clone(),
            timeout: self.default_timeout,
        }
    }
}

fn parse_number<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            name: name.to_string(),
            value: raw.to_string(),
            reason: e.to_string(),
        })
}
