//! Config file locations and string helpers shared by the engine.

use directories::ProjectDirs;
use std::path::PathBuf;

/// Per-user config directory for kubepipe (`~/.config/kubepipe` on Linux).
pub fn get_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("dev", "kubepipe", "kubepipe").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Location of the user-level security rules file.
pub fn default_security_config() -> Option<PathBuf> {
    get_config_dir().map(|d| d.join("security.yaml"))
}

/// Truncates `s` to at most `max_chars` characters.
///
/// Returns the (possibly shortened) string and whether anything was cut.
/// Cuts on a character boundary, never inside a UTF-8 sequence.
pub fn truncate_chars(s: &str, max_chars: usize) -> (&str, bool) {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => (&s[..idx], true),
        None => (s, false),
    }
}

/// Collapses runs of whitespace into single spaces and trims the ends.
pub fn squash_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
