//! Template vs. installation classification
//!
//! Every path of either tree lands in exactly one of six buckets. A detected
//! rename removes its two halves from NEW and LOCAL_ONLY and records them once,
//! as a pair, in RENAMED.

mod engine;
mod summary;

use std::fmt;

use hq_content::MergeStrategy;
use serde::Serialize;

use crate::registry::Impact;

pub use engine::{DiffEngine, RENAME_MIN_SIZE, entries_are_identical, is_likely_rename};
pub use summary::summarize_change;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiffCategory {
    New,
    Modified,
    Deleted,
    Unchanged,
    LocalOnly,
    Renamed,
}

impl DiffCategory {
    pub const ALL: [DiffCategory; 6] = [
        Self::New,
        Self::Modified,
        Self::Deleted,
        Self::Unchanged,
        Self::LocalOnly,
        Self::Renamed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Modified => "MODIFIED",
            Self::Deleted => "DELETED",
            Self::Unchanged => "UNCHANGED",
            Self::LocalOnly => "LOCAL_ONLY",
            Self::Renamed => "RENAMED",
        }
    }
}

impl fmt::Display for DiffCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified path, or one path pair for renames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffEntry {
    /// The template path (the new path for renames)
    pub path: String,
    pub category: DiffCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_summary: Option<String>,
    /// A registry rule matches this path
    pub is_special: bool,
    pub merge_strategy: MergeStrategy,
    pub impact: Impact,
    pub description: String,
}

/// The six buckets plus anything the engine could not decide.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub new: Vec<DiffEntry>,
    pub modified: Vec<DiffEntry>,
    pub deleted: Vec<DiffEntry>,
    pub unchanged: Vec<DiffEntry>,
    pub local_only: Vec<DiffEntry>,
    pub renamed: Vec<DiffEntry>,
    pub warnings: Vec<String>,
}

impl DiffResult {
    pub fn bucket(&self, category: DiffCategory) -> &[DiffEntry] {
        match category {
            DiffCategory::New => &self.new,
            DiffCategory::Modified => &self.modified,
            DiffCategory::Deleted => &self.deleted,
            DiffCategory::Unchanged => &self.unchanged,
            DiffCategory::LocalOnly => &self.local_only,
            DiffCategory::Renamed => &self.renamed,
        }
    }

    fn bucket_mut(&mut self, category: DiffCategory) -> &mut Vec<DiffEntry> {
        match category {
            DiffCategory::New => &mut self.new,
            DiffCategory::Modified => &mut self.modified,
            DiffCategory::Deleted => &mut self.deleted,
            DiffCategory::Unchanged => &mut self.unchanged,
            DiffCategory::LocalOnly => &mut self.local_only,
            DiffCategory::Renamed => &mut self.renamed,
        }
    }

    /// Every entry, bucket by bucket.
    pub fn entries(&self) -> impl Iterator<Item = &DiffEntry> {
        DiffCategory::ALL
            .into_iter()
            .flat_map(move |c| self.bucket(c).iter())
    }

    pub fn count(&self, category: DiffCategory) -> usize {
        self.bucket(category).len()
    }

    /// Nothing to add, update, move, or remove.
    pub fn is_up_to_date(&self) -> bool {
        self.new.is_empty()
            && self.modified.is_empty()
            && self.deleted.is_empty()
            && self.renamed.is_empty()
    }
}
