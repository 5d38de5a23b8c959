//! Core types for kubepipe.
//!
//! This module contains the values that cross the engine boundary:
//! the per-call [`ExecutionContext`], the [`ExecutionResult`] every call
//! returns, and the [`EngineConfig`] used to build an executor.

pub mod config;
pub mod context;
pub mod result;

pub use config::{ConfigError, EngineConfig};
pub use context::ExecutionContext;
pub use result::{ExecutionResult, Outcome, NOT_LAUNCHED};
