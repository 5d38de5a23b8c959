//! Kubepipe - pipe-aware command execution for Kubernetes CLI tools
//!
//! Takes a shell-style command string such as
//! `kubectl get pods | grep Running | head -5`, splits it on unquoted pipes,
//! injects the target namespace and kube context into the stage that talks
//! to the cluster, runs the result as a process tree under a timeout, and
//! returns a structured result that never panics or throws.

pub mod error;
pub mod executor;
pub mod inject;
pub mod pipeline;
pub mod security;
pub mod shell;
pub mod tools;
pub mod types;
pub mod util;

// Re-export core types for convenient access
pub use error::{EngineError, EngineResult};
pub use executor::Executor;
pub use types::{EngineConfig, ExecutionContext, ExecutionResult, Outcome};
