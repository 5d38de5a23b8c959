//! Pipeline detection, splitting and reassembly.
//!
//! A command string is a sequence of stages separated by unquoted `|`.
//! These functions are pure and never fail: malformed input degrades to
//! fewer (possibly zero) stages, and callers decide what an empty pipeline
//! means.
//!
//! # Examples
//!
//! ```
//! use kubepipe::pipeline::{is_pipeline, join_stages, split_pipeline};
//!
//! let command = "kubectl get pods | grep Running | head -5";
//! assert!(is_pipeline(command));
//!
//! let stages = split_pipeline(command);
//! assert_eq!(stages, vec!["kubectl get pods", "grep Running", "head -5"]);
//! assert_eq!(join_stages(&stages), command);
//! ```

pub mod lexer;

pub use lexer::{tokenize, CharClass, QuoteState, Scanner, Token};

/// Separator used when rebuilding a pipeline from its stages.
pub const STAGE_SEPARATOR: &str = " | ";

/// Returns `true` if `command` contains at least one unquoted `|`.
///
/// This is a syntactic check only: `"|"` is reported as a pipeline even
/// though it has no usable stages.
#[must_use]
pub fn is_pipeline(command: &str) -> bool {
    pipe_offsets(command).next().is_some()
}

/// Splits `command` on unquoted `|` into trimmed, non-empty stages.
///
/// Stage order is preserved. Empty stages (from `""`, `"|"`, `"cmd |"`,
/// `"| cmd"` or `"a || b"`) are dropped.
#[must_use]
pub fn split_pipeline(command: &str) -> Vec<String> {
    let mut stages = Vec::new();
    let mut start = 0;

    for offset in pipe_offsets(command) {
        push_stage(&mut stages, &command[start..offset]);
        start = offset + 1;
    }
    push_stage(&mut stages, &command[start..]);

    stages
}

/// Rebuilds a pipeline string from its stages.
#[must_use]
pub fn join_stages<S: AsRef<str>>(stages: &[S]) -> String {
    stages
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(STAGE_SEPARATOR)
}

/// Byte offsets of every unquoted `|` in `command`.
fn pipe_offsets(command: &str) -> impl Iterator<Item = usize> + '_ {
    Scanner::new(command)
        .filter(|(_, ch, class)| *ch == '|' && *class == CharClass::Bare)
        .map(|(idx, _, _)| idx)
}

fn push_stage(stages: &mut Vec<String>, raw: &str) {
    let stage = raw.trim();
    if !stage.is_empty() {
        stages.push(stage.to_string());
    }
}
