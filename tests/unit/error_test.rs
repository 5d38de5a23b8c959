//! Tests for the engine error taxonomy.
//!
//! These tests verify Display text, outcome mapping and the `Error` trait
//! implementation of `EngineError`.

use kubepipe::error::{EngineError, EngineResult};
use kubepipe::types::Outcome;
use std::error::Error as _;
use std::io;

// ============== Construction Tests ==============

#[test]
fn test_degenerate_message_explains_nothing_ran() {
    let err = EngineError::degenerate("");
    assert!(err.to_string().starts_with("parse:"));
    assert!(err.to_string().contains("nothing was executed"));
}

#[test]
fn test_rejected_message_has_reason() {
    let err = EngineError::rejected("kubectl drain node-1", "restricted");
    assert_eq!(
        err.to_string(),
        "security: command 'kubectl drain node-1' rejected: restricted"
    );
}

#[test]
fn test_timeout_message_has_duration() {
    let err = EngineError::timeout("kubectl get pods", 30000);
    assert!(err.to_string().contains("timed out after 30000 ms"));
}

// ============== Category Tests ==============

#[test]
fn test_only_launch_errors_have_a_source() {
    let launch = EngineError::launch("kubectl", io::Error::from(io::ErrorKind::PermissionDenied));
    assert!(launch.source().is_some());
    assert!(EngineError::unparseable("'").source().is_none());
}

#[test]
fn test_pre_launch_outcomes() {
    for (err, outcome) in [
        (EngineError::degenerate("|"), Outcome::Degenerate),
        (EngineError::rejected("x", "y"), Outcome::Rejected),
        (EngineError::unparseable("'"), Outcome::LaunchFailed),
        (EngineError::launch("x", io::Error::from(io::ErrorKind::NotFound)), Outcome::LaunchFailed),
    ] {
        assert_eq!(err.outcome(), outcome, "{err}");
    }
    assert_eq!(EngineError::timeout("x", 1).outcome(), Outcome::TimedOut);
}

// ============== Result Alias Tests ==============

#[test]
fn test_result_alias_propagates() {
    fn inner() -> EngineResult<u8> {
        Err(EngineError::cancelled("kubectl get pods -w"))
    }
    fn outer() -> EngineResult<u8> {
        let value = inner()?;
        Ok(value + 1)
    }

    let err = outer().unwrap_err();
    assert_eq!(err.outcome(), Outcome::Cancelled);
    assert_eq!(err.command(), "kubectl get pods -w");
}
