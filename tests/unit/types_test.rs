//! Tests for the context and result data model.

use kubepipe::types::{ExecutionContext, ExecutionResult, Outcome, NOT_LAUNCHED};
use pretty_assertions::assert_eq;
use std::time::Duration;

#[test]
fn test_context_defaults() {
    let ctx = ExecutionContext::default();
    assert_eq!(ctx.namespace, "default");
    assert_eq!(ctx.timeout, Duration::from_secs(300));
    assert!(ctx.kube_context.is_none());
}

#[test]
fn test_context_json_uses_timeout_ms() {
    let ctx = ExecutionContext::new("demo").with_timeout(Duration::from_millis(1500));
    let json = serde_json::to_value(&ctx).unwrap();
    assert_eq!(json, serde_json::json!({ "namespace": "demo", "timeoutMs": 1500 }));

    let back: ExecutionContext =
        serde_json::from_str(r#"{"namespace":"ops","kubeContext":"prod","timeoutMs":10}"#).unwrap();
    assert_eq!(back.kube_context.as_deref(), Some("prod"));
    assert_eq!(back.timeout, Duration::from_millis(10));
}

#[test]
fn test_context_copies_are_independent() {
    let base = ExecutionContext::new("alpha");
    let other = base.clone().with_namespace("beta");
    assert_eq!(base.namespace, "alpha");
    assert_eq!(other.namespace, "beta");
}

#[test]
fn test_not_launched_result_shape() {
    let result = ExecutionResult::not_launched("kubectl drain x", Outcome::Rejected, "refused");
    assert!(!result.success);
    assert!(!result.timed_out);
    assert_eq!(result.return_code, NOT_LAUNCHED);
    assert_eq!(result.stdout, "");
    assert_eq!(result.output(), "refused");
}

#[test]
fn test_result_json_field_names() {
    let mut result = ExecutionResult::not_launched("kubectl get pods", Outcome::TimedOut, "");
    result.timed_out = true;
    result.hint = Some("retry later".to_string());

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["timedOut"], true);
    assert_eq!(json["outcome"], "timed_out");
    assert_eq!(json["hint"], "retry later");

    let back: ExecutionResult = serde_json::from_value(json).unwrap();
    assert_eq!(back, result);
}
