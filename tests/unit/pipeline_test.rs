//! Tests for pipe detection and splitting.

use kubepipe::pipeline::{is_pipeline, join_stages, split_pipeline, tokenize};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

// ============================================================================
// Edge cases
// ============================================================================

#[test]
fn test_detection_table() {
    let cases = [
        ("kubectl get pods", false),
        ("kubectl get pods | grep Running", true),
        ("kubectl get pods -l 'a|b'", false),
        ("kubectl get pods -l \"a|b\"", false),
        ("echo a\\|b", false),
        ("|", true),
        ("", false),
        ("kubectl get pods -l 'unterminated | grep x", false),
    ];
    for (input, expected) in cases {
        assert_eq!(is_pipeline(input), expected, "{input:?}");
    }
}

#[test]
fn test_split_preserves_stage_order() {
    assert_eq!(
        split_pipeline("kubectl get pods | grep Running | head -5"),
        vec!["kubectl get pods", "grep Running", "head -5"]
    );
}

#[test]
fn test_split_keeps_quoted_pipes_inside_stage() {
    assert_eq!(
        split_pipeline("kubectl get pods -o jsonpath='{.items[*].metadata.name}' | tr ' ' '|'"),
        vec![
            "kubectl get pods -o jsonpath='{.items[*].metadata.name}'",
            "tr ' ' '|'"
        ]
    );
}

#[test]
fn test_split_drops_empty_stages() {
    assert!(split_pipeline("").is_empty());
    assert!(split_pipeline("   ").is_empty());
    assert!(split_pipeline("|").is_empty());
    assert!(split_pipeline(" | | ").is_empty());
    assert_eq!(split_pipeline("kubectl get pods |"), vec!["kubectl get pods"]);
    assert_eq!(split_pipeline("| grep x"), vec!["grep x"]);
    assert_eq!(split_pipeline("a || b"), vec!["a", "b"]);
}

#[test]
fn test_escaped_double_quote_does_not_toggle() {
    assert_eq!(
        split_pipeline(r#"echo "say \"hi\" | now" | wc -c"#),
        vec![r#"echo "say \"hi\" | now""#, "wc -c"]
    );
}

#[test]
fn test_tokenize_reports_unquoted_values() {
    let words: Vec<_> = tokenize("kubectl get pods -l 'app=web tier' --namespace=demo")
        .into_iter()
        .map(|t| t.value)
        .collect();
    assert_eq!(
        words,
        vec!["kubectl", "get", "pods", "-l", "app=web tier", "--namespace=demo"]
    );
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_split_of_join_is_identity(stages in prop::collection::vec("[a-z0-9=.-]{1,8}( [a-z0-9=.-]{1,8}){0,3}", 1..6)) {
        let joined = join_stages(&stages);
        prop_assert_eq!(split_pipeline(&joined), stages);
    }

    #[test]
    fn prop_quoted_pipes_never_split(inner in "[a-z |]{0,16}") {
        let command = format!("kubectl get pods -l '{}'", inner);
        prop_assert!(!is_pipeline(&command));
        prop_assert_eq!(split_pipeline(&command).len(), 1);
    }

    #[test]
    fn prop_stages_are_trimmed_and_non_empty(input in "[a-z '|\"]{0,32}") {
        for stage in split_pipeline(&input) {
            prop_assert!(!stage.is_empty());
            prop_assert_eq!(stage.trim(), stage.as_str());
        }
    }
}
