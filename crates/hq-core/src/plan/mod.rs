//! Migration plan
//!
//! Turns a [`DiffResult`] into an ordered list of reviewable actions with a
//! purpose for each path and warnings for globally significant files.

mod render;

use std::collections::BTreeSet;
use std::fmt;

use hq_content::MergeStrategy;
use hq_fs::path::{extension, file_name, parent_dir};
use hq_fs::{HqPath, Inventory};
use serde::Serialize;

use crate::diff::{DiffCategory, DiffEntry, DiffResult};
use crate::registry::{Impact, StrategyRegistry};

pub use render::render_plan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanAction {
    Add,
    Update,
    Remove,
    Move,
    /// Unchanged or local-only; nothing happens
    Keep,
}

impl PlanAction {
    pub fn for_category(category: DiffCategory) -> Self {
        match category {
            DiffCategory::New => Self::Add,
            DiffCategory::Modified => Self::Update,
            DiffCategory::Deleted => Self::Remove,
            DiffCategory::Renamed => Self::Move,
            DiffCategory::Unchanged | DiffCategory::LocalOnly => Self::Keep,
        }
    }
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "ADD",
            Self::Update => "UPDATE",
            Self::Remove => "REMOVE",
            Self::Move => "MOVE",
            Self::Keep => "KEEP",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanEntry {
    pub path: String,
    pub action: PlanAction,
    pub category: DiffCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    /// What the file is for
    pub rationale: String,
    pub strategy: MergeStrategy,
    pub impact: Impact,
    pub high_impact: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub new: usize,
    pub modified: usize,
    pub deleted: usize,
    pub renamed: usize,
    pub unchanged: usize,
    pub local_only: usize,
    /// NEW + MODIFIED
    pub total_changes: usize,
    /// MODIFIED entries with a non-default strategy
    pub special_files_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub from_version: Option<String>,
    pub to_version: Option<String>,
    pub entries: Vec<PlanEntry>,
    pub summary: PlanSummary,
    pub directories_to_create: Vec<String>,
    pub warnings: Vec<String>,
}

impl Plan {
    pub fn entries_for(&self, action: PlanAction) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(move |e| e.action == action)
    }

    pub fn high_impact(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(|e| e.high_impact)
    }

    pub fn has_changes(&self) -> bool {
        self.entries.iter().any(|e| e.action != PlanAction::Keep)
    }
}

/// Purpose of a path, from its shape.
pub fn infer_purpose(path: &str) -> &'static str {
    let name = file_name(path);
    let parent = parent_dir(path).unwrap_or("");
    if path == HqPath::VersionMarker.as_str() {
        return "Version marker";
    }
    if path == HqPath::CoreInstructions.as_str() {
        return "Core instructions";
    }
    if path == HqPath::UserProfile.as_str() {
        return "User profile";
    }
    if path == HqPath::WorkerRegistry.as_str() {
        return "Worker registry";
    }
    if name == HqPath::Gitkeep.as_str() {
        return "Directory placeholder";
    }
    if path.starts_with("workers/") && name == "worker.yaml" {
        return "Worker definition";
    }
    if path.starts_with(".claude/skills/") {
        return "Skill";
    }
    if parent == HqPath::CommandsDir.as_str() {
        return "Slash command";
    }
    if path.starts_with("knowledge/") {
        return "Knowledge content";
    }
    match extension(path).as_deref() {
        Some("md") => "Documentation",
        Some("yaml" | "yml" | "toml" | "json") => "Configuration",
        Some("sh" | "py" | "js" | "ts") => "Script",
        _ => "Template file",
    }
}

/// Warning for paths whose change affects every session.
pub fn high_impact_warning(path: &str) -> Option<&'static str> {
    let name = file_name(path);
    if path == HqPath::CoreInstructions.as_str() {
        Some("Core instructions change for every session; learned rules are carried over")
    } else if path == HqPath::UserProfile.as_str() {
        Some("User profile is never overwritten; review template changes by hand")
    } else if path.starts_with("workers/") && name == "worker.yaml" {
        Some("Worker behavior changes; custom instructions are kept")
    } else if parent_dir(path) == Some(HqPath::CommandsDir.as_str()) && name.ends_with(".md") {
        Some("Command behavior changes; local rules are kept")
    } else {
        None
    }
}

/// Builds a [`Plan`] from a [`DiffResult`].
pub struct PlanBuilder<'a> {
    registry: &'a StrategyRegistry,
    local: Option<&'a Inventory>,
    from_version: Option<String>,
    to_version: Option<String>,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(registry: &'a StrategyRegistry) -> Self {
        Self {
            registry,
            local: None,
            from_version: None,
            to_version: None,
        }
    }

    /// Local tree, used to find directories that NEW files need created.
    pub fn local(mut self, local: &'a Inventory) -> Self {
        self.local = Some(local);
        self
    }

    pub fn versions(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.from_version = Some(from.into());
        self.to_version = Some(to.into());
        self
    }

    fn plan_entry(&self, diff: &DiffEntry) -> PlanEntry {
        let action = PlanAction::for_category(diff.category);
        let rule = self.registry.lookup(&diff.path);
        let warning = match action {
            PlanAction::Keep => None,
            _ => high_impact_warning(&diff.path),
        };
        PlanEntry {
            path: diff.path.clone(),
            action,
            category: diff.category,
            old_path: diff.old_path.clone(),
            rationale: infer_purpose(&diff.path).to_string(),
            strategy: rule.map(|r| r.strategy.clone()).unwrap_or_default(),
            impact: rule.map_or(diff.impact, |r| r.impact),
            high_impact: warning.is_some(),
            warning: warning.map(str::to_string),
            diff_summary: diff.diff_summary.clone(),
        }
    }

    pub fn build(&self, diff: &DiffResult) -> Plan {
        let to_entries = |bucket: &[DiffEntry]| -> Vec<PlanEntry> {
            bucket.iter().map(|d| self.plan_entry(d)).collect()
        };

        let mut modified = to_entries(&diff.modified);
        modified.sort_by(|a, b| a.impact.cmp(&b.impact).then_with(|| a.path.cmp(&b.path)));

        let mut new = to_entries(&diff.new);
        new.sort_by(|a, b| {
            let pa = parent_dir(&a.path).unwrap_or("");
            let pb = parent_dir(&b.path).unwrap_or("");
            pa.cmp(pb).then_with(|| a.path.cmp(&b.path))
        });

        let mut entries = modified;
        entries.extend(new);
        for bucket in [&diff.deleted, &diff.renamed, &diff.unchanged, &diff.local_only] {
            let mut sorted = to_entries(bucket);
            sorted.sort_by(|a, b| a.path.cmp(&b.path));
            entries.extend(sorted);
        }

        let summary = PlanSummary {
            new: diff.new.len(),
            modified: diff.modified.len(),
            deleted: diff.deleted.len(),
            renamed: diff.renamed.len(),
            unchanged: diff.unchanged.len(),
            local_only: diff.local_only.len(),
            total_changes: diff.new.len() + diff.modified.len(),
            special_files_count: diff
                .modified
                .iter()
                .filter(|e| !self.registry.strategy_for(&e.path).is_default())
                .count(),
        };

        Plan {
            from_version: self.from_version.clone(),
            to_version: self.to_version.clone(),
            directories_to_create: self.directories_to_create(diff),
            warnings: diff.warnings.clone(),
            entries,
            summary,
        }
    }

    fn directories_to_create(&self, diff: &DiffResult) -> Vec<String> {
        let existing: BTreeSet<&str> = self
            .local
            .map(|inv| {
                inv.entries
                    .keys()
                    .flat_map(|p| ancestors(p).chain(std::iter::once(p.as_str())))
                    .collect()
            })
            .unwrap_or_default();

        diff.new
            .iter()
            .chain(&diff.renamed)
            .flat_map(|e| ancestors(&e.path))
            .filter(|dir| !existing.contains(dir))
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Every proper ancestor directory of a relative path, deepest first.
fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(parent_dir(path), |p| parent_dir(*p))
}
