//! Relative path normalization
//!
//! Inventory keys are forward-slash strings relative to a tree root, so that a
//! template fetched on one platform compares against an installation on another.

use std::path::Path;

/// Convert any path to a forward-slash string.
pub fn to_slash(path: impl AsRef<Path>) -> String {
    path.as_ref().to_string_lossy().replace('\\', "/")
}

/// Normalize a relative path string.
///
/// Backslashes become forward slashes, `.` and empty components are dropped,
/// and `..` pops the previous component (never escaping above the root).
pub fn normalize_relative(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for component in path.split(['/', '\\']) {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Final component of a normalized relative path.
pub fn file_name(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

/// Parent directory of a normalized relative path, `None` at the root.
pub fn parent_dir(path: &str) -> Option<&str> {
    path.trim_end_matches('/').rfind('/').map(|idx| &path[..idx])
}

/// Lowercased extension of the final component, if any.
///
/// Dotfiles such as `.gitkeep` have no extension.
pub fn extension(path: &str) -> Option<String> {
    let name = file_name(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(idx) => Some(name[idx + 1..].to_ascii_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_backslashes_and_dots() {
        assert_eq!(normalize_relative(r"a\b\.\c"), "a/b/c");
        assert_eq!(normalize_relative("./a//b/"), "a/b");
        assert_eq!(normalize_relative("a/../../b"), "b");
    }

    #[test]
    fn file_name_and_parent() {
        assert_eq!(file_name("workers/dev/worker.yaml"), "worker.yaml");
        assert_eq!(parent_dir("workers/dev/worker.yaml"), Some("workers/dev"));
        assert_eq!(parent_dir("agents.md"), None);
    }

    #[test]
    fn extension_ignores_dotfiles() {
        assert_eq!(extension("a/b/README.MD").as_deref(), Some("md"));
        assert_eq!(extension("a/.gitkeep"), None);
        assert_eq!(extension("Makefile"), None);
    }
}
