//! Per-invocation execution context.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default namespace injected when none is configured.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Default command timeout (five minutes).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Immutable scope and limits for a single `execute` call.
///
/// The engine only reads the context; every call gets its own copy, so
/// concurrent invocations never observe each other's namespace.
///
/// # Examples
///
/// ```
/// use kubepipe::types::ExecutionContext;
/// use std::time::Duration;
///
/// let ctx = ExecutionContext::new("demo").with_timeout(Duration::from_secs(10));
/// assert_eq!(ctx.namespace, "demo");
/// assert_eq!(ctx.timeout_ms(), 10_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    /// Namespace injected as `--namespace`. Empty disables namespace injection.
    pub namespace: String,
    /// Kube context injected as `--context` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_context: Option<String>,
    /// Maximum wall-clock time for the launched process.
    #[serde(rename = "timeoutMs", with = "duration_ms")]
    pub timeout: Duration,
}

impl ExecutionContext {
    /// Creates a context for `namespace` with the default timeout.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            kube_context: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Returns a copy scoped to a different namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Returns a copy that also injects `--context`.
    #[must_use]
    pub fn with_kube_context(mut self, kube_context: impl Into<String>) -> Self {
        self.kube_context = Some(kube_context.into());
        self
    }

    /// Returns a copy with a different timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Timeout in whole milliseconds.
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
