//! Tests for pre-launch command validation.

use kubepipe::error::EngineError;
use kubepipe::security::{CommandValidator, SecurityMode, SecurityRules, ALLOWED_PIPE_COMMANDS};

fn strict() -> CommandValidator {
    CommandValidator::new(SecurityMode::Strict)
}

fn rejection(stages: &[&str]) -> String {
    match strict().validate(stages) {
        Err(EngineError::Rejected { reason, .. }) => reason,
        other => panic!("expected {stages:?} to be rejected, got {other:?}"),
    }
}

#[test]
fn test_read_only_pipelines_pass() {
    let v = strict();
    for stages in [
        vec!["kubectl get pods"],
        vec!["kubectl get pods -o json", "jq -r '.items[].metadata.name'", "sort", "uniq -c"],
        vec!["istioctl analyze"],
        vec!["helm list -A", "grep deployed"],
        vec!["argocd app list", "awk '{print $1}'"],
    ] {
        assert!(v.validate(&stages).is_ok(), "{stages:?}");
    }
}

#[test]
fn test_first_stage_must_be_a_supported_tool() {
    assert!(rejection(&["curl http://example.com"]).contains("kubectl, istioctl, helm, argocd"));
    assert!(rejection(&["grep x", "kubectl get pods"]).contains("supported CLI tool"));
}

#[test]
fn test_pipe_stage_allowlist() {
    assert!(ALLOWED_PIPE_COMMANDS.contains(&"grep"));
    assert!(!ALLOWED_PIPE_COMMANDS.contains(&"rm"));
    assert!(rejection(&["kubectl get pods", "sort", "rm -rf /"]).contains("'rm' at position 2"));
    assert!(rejection(&["kubectl get pods", "kubectl delete -f -"]).contains("'kubectl' at position 1"));
}

#[test]
fn test_command_runners_and_file_writers_are_not_pipe_stages() {
    for program in ["xargs", "tee", "sh", "env"] {
        assert!(!ALLOWED_PIPE_COMMANDS.contains(&program), "{program}");
    }
    assert!(rejection(&["kubectl get pods", "xargs touch /tmp/x"]).contains("'xargs' at position 1"));
    assert!(rejection(&["kubectl get pods", "tee /tmp/pods.txt"]).contains("'tee' at position 1"));
}

#[test]
fn test_shell_operators_are_rejected() {
    for (stages, operator) in [
        (vec!["kubectl get pods", "grep Running; touch /tmp/x"], "';'"),
        (vec!["kubectl get pods && touch /tmp/x"], "'&'"),
        (vec!["kubectl get pods", "grep web & touch /tmp/x"], "'&'"),
        (vec!["kubectl get pods $(touch /tmp/x)", "cat"], "'$('"),
        (vec!["kubectl get pods `touch /tmp/x`"], "'`'"),
        (vec!["kubectl get pods", "cat > /tmp/x"], "'>'"),
        (vec!["kubectl apply -f - < /tmp/x"], "'<'"),
        (vec!["kubectl get pods", r#"grep "$(touch /tmp/x)""#], "'$('"),
    ] {
        let reason = rejection(&stages);
        assert!(reason.contains(operator), "{stages:?}: {reason}");
        assert!(reason.contains("Only '|' may join commands"));
    }
}

#[test]
fn test_quoted_operators_pass() {
    let v = strict();
    for stages in [
        vec!["kubectl get pods", "grep ';'"],
        vec!["kubectl get pods", "awk '$3 > 1 && $4 < 5 {print $(1)}'"],
        vec!["kubectl get pods -o json", r#"jq -r '.items[] | select(.status.phase != "Running") | .metadata.name'"#],
        vec!["kubectl get pods", r#"grep "a&b>c""#],
    ] {
        assert!(v.validate(&stages).is_ok(), "{stages:?}");
    }
}

#[test]
fn test_dangerous_prefixes() {
    assert!(rejection(&["kubectl delete namespace prod"]).contains("kubectl delete"));
    assert!(rejection(&["helm rollback web 1"]).contains("helm rollback"));
    assert!(rejection(&["argocd app delete web"]).contains("argocd app delete"));
    assert!(strict().validate(&["kubectl delete pod web-0"]).is_ok());
    assert!(strict().validate(&["argocd app delete --help"]).is_ok());
}

#[test]
fn test_exec_bare_shell_is_rejected() {
    assert!(rejection(&["kubectl exec web-0 -- bash"]).contains("Interactive shells"));
    assert!(strict().validate(&["kubectl exec -it web-0 -- bash"]).is_ok());
    assert!(strict().validate(&["kubectl exec pod -- sh -c 'ls /'"]).is_ok());
}

#[test]
fn test_file_rules_override_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("security.yaml");
    std::fs::write(
        &path,
        r#"
dangerous_commands:
  kubectl:
    - "kubectl scale"
safe_patterns:
  kubectl: []
regex_rules:
  helm:
    - pattern: "--set\\s+.*password"
      description: "No inline passwords"
      error_message: "Pass secrets with a values file"
"#,
    )
    .unwrap();

    let rules = SecurityRules::load(&path).unwrap();
    let v = strict().with_rules(rules);

    assert!(v.validate(&["kubectl scale deploy web --replicas=0"]).is_err());
    assert!(v.validate(&["kubectl drain node-1"]).is_ok());
    match v.validate(&["helm install web ./chart --set db.password=x"]) {
        Err(EngineError::Rejected { reason, .. }) => {
            assert_eq!(reason, "Pass secrets with a values file");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_permissive_allows_anything() {
    let v = CommandValidator::new(SecurityMode::Permissive);
    assert!(v.validate(&["rm -rf /", "sh"]).is_ok());
}
