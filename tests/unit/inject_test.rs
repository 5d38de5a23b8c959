//! Tests for namespace and kube-context injection.

use kubepipe::inject::{
    inject_context, inject_pipeline, is_cluster_scoped_resource, rule_for_verb, InjectionRule,
    StageScope,
};
use kubepipe::tools::CliTool;
use kubepipe::types::ExecutionContext;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn demo() -> ExecutionContext {
    ExecutionContext::new("demo")
}

#[test]
fn test_only_first_stage_is_rewritten() {
    let stages = inject_pipeline(&["kubectl get pods", "grep kubectl get pods", "wc -l"], &demo());
    assert_eq!(
        stages,
        vec!["kubectl get pods --namespace demo", "grep kubectl get pods", "wc -l"]
    );
}

#[test]
fn test_existing_scope_flags_are_respected() {
    for stage in [
        "kubectl get pods -n prod",
        "kubectl get pods -nprod",
        "kubectl get pods --namespace prod",
        "kubectl get pods --namespace=prod",
        "kubectl get pods -A",
        "kubectl get pods --all-namespaces",
    ] {
        assert_eq!(inject_context(stage, &demo()), stage);
    }
}

#[test]
fn test_cluster_scoped_verbs_and_resources() {
    assert_eq!(inject_context("kubectl version --client", &demo()), "kubectl version --client");
    assert_eq!(inject_context("kubectl api-resources", &demo()), "kubectl api-resources");
    assert_eq!(inject_context("kubectl describe node/worker-1", &demo()), "kubectl describe node/worker-1");
    assert_eq!(inject_context("kubectl get ns", &demo()), "kubectl get ns");
    assert_eq!(rule_for_verb(CliTool::Kubectl, "config"), Some(InjectionRule::ClusterScoped));
    assert!(is_cluster_scoped_resource("storageclasses.storage.k8s.io"));
    assert!(!is_cluster_scoped_resource("deployments"));
}

#[test]
fn test_flags_go_before_double_dash() {
    assert_eq!(
        inject_context("kubectl exec web-0 -- ls /tmp", &demo()),
        "kubectl exec web-0 --namespace demo -- ls /tmp"
    );
}

#[test]
fn test_context_is_injected_with_namespace() {
    let ctx = demo().with_kube_context("kind-dev");
    assert_eq!(
        inject_context("kubectl get pods", &ctx),
        "kubectl get pods --context kind-dev --namespace demo"
    );
    assert_eq!(
        inject_context("kubectl get nodes", &ctx),
        "kubectl get nodes --context kind-dev"
    );
    assert_eq!(
        inject_context("kubectl get pods --context other", &ctx),
        "kubectl get pods --context other --namespace demo"
    );
}

#[test]
fn test_non_context_tools_untouched() {
    assert_eq!(inject_context("helm list", &demo()), "helm list");
    assert_eq!(inject_context("argocd app list", &demo()), "argocd app list");
}

#[test]
fn test_istioctl_analyze_is_namespaced() {
    assert_eq!(
        inject_context("istioctl analyze", &demo()),
        "istioctl analyze --namespace demo"
    );
}

#[test]
fn test_empty_namespace_disables_namespace_injection() {
    assert_eq!(
        inject_context("kubectl get pods", &ExecutionContext::new("")),
        "kubectl get pods"
    );
}

#[test]
fn test_stage_scope_skips_flag_values() {
    let scope = StageScope::analyze("kubectl --context prod get pods").unwrap();
    assert_eq!(scope.rule, Some(InjectionRule::Namespaced));
    assert!(scope.has_context);
    assert!(scope.needs_namespace());
    assert!(StageScope::analyze("helm list").is_none());
}

proptest! {
    #[test]
    fn prop_injection_is_idempotent(
        namespace in "[a-z][a-z0-9-]{0,12}",
        command in prop::sample::select(vec![
            "kubectl get pods",
            "kubectl get nodes",
            "kubectl logs web-0 -c app",
            "kubectl exec web-0 -- ls",
            "kubectl -n other get svc",
            "istioctl analyze",
            "kubectl version --client",
        ]),
    ) {
        let ctx = ExecutionContext::new(namespace).with_kube_context("ctx");
        let once = inject_context(command, &ctx);
        prop_assert_eq!(inject_context(&once, &ctx), once);
    }

    #[test]
    fn prop_later_stages_are_byte_identical(filter in "[a-z -]{1,24}", namespace in "[a-z]{1,8}") {
        let stages = vec!["kubectl get pods".to_string(), filter.clone()];
        let injected = inject_pipeline(&stages, &ExecutionContext::new(namespace));
        prop_assert_eq!(&injected[1], &filter);
    }
}
