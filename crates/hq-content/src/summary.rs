//! Advisory change descriptions for modified text files.
//!
//! Summaries are informational. Nothing downstream branches on them.

use std::collections::BTreeSet;
use std::fmt;

use similar::{ChangeTag, TextDiff};

use crate::section::headings;
use crate::yaml_block::top_level_blocks;

/// What changed between two versions of a text file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSummary {
    /// Markdown: headings present only in one version
    Headings {
        added: Vec<String>,
        removed: Vec<String>,
    },
    /// YAML: top-level keys present only in one version
    Keys {
        added: Vec<String>,
        removed: Vec<String>,
    },
    /// Anything else, or structured files whose structure did not change
    Lines { added: usize, removed: usize },
}

impl fmt::Display for TextSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (noun, added, removed) = match self {
            Self::Lines { added, removed } => {
                return write!(f, "+{added} -{removed} lines");
            }
            Self::Headings { added, removed } => ("sections", added, removed),
            Self::Keys { added, removed } => ("keys", added, removed),
        };
        let mut parts = Vec::new();
        if !added.is_empty() {
            parts.push(format!("{noun} added: {}", added.join(", ")));
        }
        if !removed.is_empty() {
            parts.push(format!("{noun} removed: {}", removed.join(", ")));
        }
        f.write_str(&parts.join("; "))
    }
}

fn set_difference(old: &BTreeSet<String>, new: &BTreeSet<String>) -> (Vec<String>, Vec<String>) {
    (
        new.difference(old).cloned().collect(),
        old.difference(new).cloned().collect(),
    )
}

fn line_counts(old: &str, new: &str) -> TextSummary {
    let diff = TextDiff::from_lines(old, new);
    let (mut added, mut removed) = (0, 0);
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => added += 1,
            ChangeTag::Delete => removed += 1,
            ChangeTag::Equal => {}
        }
    }
    TextSummary::Lines { added, removed }
}

/// Summarize the change from `old` (local) to `new` (template).
///
/// `extension` is the lowercased file extension without the dot. When a
/// structured comparison finds no structural change, line counts are reported.
pub fn summarize_text(extension: Option<&str>, old: &str, new: &str) -> TextSummary {
    let structured = match extension {
        Some("md" | "markdown") => {
            let titles = |s: &str| -> BTreeSet<String> {
                headings(s).into_iter().map(|h| h.title).collect()
            };
            let (added, removed) = set_difference(&titles(old), &titles(new));
            Some(TextSummary::Headings { added, removed })
        }
        Some("yaml" | "yml") => {
            let keys = |s: &str| -> BTreeSet<String> {
                top_level_blocks(s).into_iter().map(|b| b.key).collect()
            };
            let (added, removed) = set_difference(&keys(old), &keys(new));
            Some(TextSummary::Keys { added, removed })
        }
        _ => None,
    };

    match structured {
        Some(TextSummary::Headings { added, removed } | TextSummary::Keys { added, removed })
            if added.is_empty() && removed.is_empty() =>
        {
            line_counts(old, new)
        }
        Some(summary) => summary,
        None => line_counts(old, new),
    }
}
