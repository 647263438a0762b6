use std::collections::{BTreeMap, HashSet};

use hq_fs::{EntryKind, FileEntry, Inventory};

use super::summary::summarize_change;
use super::{DiffCategory, DiffEntry, DiffResult};
use crate::registry::{Impact, StrategyRegistry};

/// Files smaller than this never count as renames.
pub const RENAME_MIN_SIZE: u64 = 50;

/// Whether two entries for the same path carry the same content.
pub fn entries_are_identical(a: &FileEntry, b: &FileEntry) -> bool {
    if a.kind != b.kind {
        return false;
    }
    match a.kind {
        EntryKind::Symlink => return a.symlink_target == b.symlink_target,
        EntryKind::Directory => return true,
        EntryKind::File => {}
    }
    if a.is_gitkeep && b.is_gitkeep {
        return true;
    }
    if a.is_binary || b.is_binary {
        return a.size == b.size && a.hash == b.hash;
    }
    a.hash == b.hash
}

/// Whether a NEW template file and a LOCAL_ONLY file are one file moved.
///
/// Content hash, extension, and the size floor decide. Path similarity is not
/// required, so identical boilerplate at unrelated paths pairs up too.
pub fn is_likely_rename(new: &FileEntry, local: &FileEntry) -> bool {
    let (Some(a), Some(b)) = (&new.hash, &local.hash) else {
        return false;
    };
    a == b
        && new.size >= RENAME_MIN_SIZE
        && !new.is_gitkeep
        && !local.is_gitkeep
        && new.extension() == local.extension()
}

/// Classifies a template inventory against a local one.
#[derive(Debug, Clone)]
pub struct DiffEngine {
    registry: StrategyRegistry,
    baseline: Option<Inventory>,
    summaries: bool,
}

impl DiffEngine {
    pub fn new(registry: StrategyRegistry) -> Self {
        Self {
            registry,
            baseline: None,
            summaries: true,
        }
    }

    /// Inventory of the template the installation was created from. Enables
    /// DELETED detection.
    pub fn with_baseline(mut self, baseline: Inventory) -> Self {
        self.baseline = Some(baseline);
        self
    }

    /// Skip reading file contents for MODIFIED summaries.
    pub fn without_summaries(mut self) -> Self {
        self.summaries = false;
        self
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    fn entry(&self, path: &str, category: DiffCategory, description: String) -> DiffEntry {
        let rule = self.registry.lookup(path);
        DiffEntry {
            path: path.to_string(),
            category,
            old_path: None,
            new_path: None,
            diff_summary: None,
            is_special: rule.is_some(),
            merge_strategy: rule.map(|r| r.strategy.clone()).unwrap_or_default(),
            impact: rule.map_or(Impact::Low, |r| r.impact),
            description,
        }
    }

    pub fn categorize(&self, template: &Inventory, local: &Inventory) -> DiffResult {
        let mut result = DiffResult::default();

        // Pass 1: template paths.
        for (path, t) in &template.entries {
            match local.get(path) {
                None => result
                    .new
                    .push(self.entry(path, DiffCategory::New, "Added in template".into())),
                Some(l) if entries_are_identical(t, l) => result.unchanged.push(self.entry(
                    path,
                    DiffCategory::Unchanged,
                    "Identical to template".into(),
                )),
                Some(l) => {
                    let mut entry =
                        self.entry(path, DiffCategory::Modified, describe_modified(t, l));
                    if self.summaries {
                        entry.diff_summary = summarize_change(template, local, t, l);
                    }
                    result.modified.push(entry);
                }
            }
        }

        // Pass 2: local-only paths.
        for path in local.entries.keys() {
            if !template.contains(path) {
                result.local_only.push(self.entry(
                    path,
                    DiffCategory::LocalOnly,
                    "Not part of template".into(),
                ));
            }
        }

        // Pass 3: renames among NEW x LOCAL_ONLY.
        self.detect_renames(template, local, &mut result);

        // Pass 4: deletions against the baseline.
        match &self.baseline {
            Some(baseline) => self.detect_deletions(template, baseline, &mut result),
            None => result.warnings.push(
                "No baseline template available; files removed upstream are reported as LOCAL_ONLY"
                    .into(),
            ),
        }

        tracing::info!(
            new = result.new.len(),
            modified = result.modified.len(),
            unchanged = result.unchanged.len(),
            local_only = result.local_only.len(),
            renamed = result.renamed.len(),
            deleted = result.deleted.len(),
            "Categorized tree"
        );
        result
    }

    fn detect_renames(&self, template: &Inventory, local: &Inventory, result: &mut DiffResult) {
        let by_hash = |entries: &[DiffEntry], inventory: &'_ Inventory| {
            let mut map: BTreeMap<String, String> = BTreeMap::new();
            for entry in entries {
                if let Some(fe) = inventory.get(&entry.path)
                    && let Some(hash) = &fe.hash
                {
                    map.entry(hash.clone()).or_insert_with(|| entry.path.clone());
                }
            }
            map
        };
        let new_by_hash = by_hash(&result.new, template);
        let local_by_hash = by_hash(&result.local_only, local);

        let mut moved_new: HashSet<String> = HashSet::new();
        let mut moved_local: HashSet<String> = HashSet::new();

        for (hash, new_path) in &new_by_hash {
            let Some(old_path) = local_by_hash.get(hash) else {
                continue;
            };
            let (Some(n), Some(l)) = (template.get(new_path), local.get(old_path)) else {
                continue;
            };
            if !is_likely_rename(n, l) {
                continue;
            }
            tracing::debug!("Rename detected: {} -> {}", old_path, new_path);
            let mut entry = self.entry(
                new_path,
                DiffCategory::Renamed,
                format!("Moved from {old_path}"),
            );
            entry.old_path = Some(old_path.clone());
            entry.new_path = Some(new_path.clone());
            result.renamed.push(entry);
            moved_new.insert(new_path.clone());
            moved_local.insert(old_path.clone());
        }

        result.new.retain(|e| !moved_new.contains(&e.path));
        result.local_only.retain(|e| !moved_local.contains(&e.path));
        result.renamed.sort_by(|a, b| a.path.cmp(&b.path));
    }

    fn detect_deletions(&self, template: &Inventory, baseline: &Inventory, result: &mut DiffResult) {
        let (deleted, kept): (Vec<DiffEntry>, Vec<DiffEntry>) =
            std::mem::take(result.bucket_mut(DiffCategory::LocalOnly))
                .into_iter()
                .partition(|e| baseline.contains(&e.path) && !template.contains(&e.path));
        result.local_only = kept;
        result.deleted = deleted
            .into_iter()
            .map(|mut e| {
                e.category = DiffCategory::Deleted;
                e.description = "Removed from template".into();
                e
            })
            .collect();
    }
}

fn describe_modified(template: &FileEntry, local: &FileEntry) -> String {
    if template.kind != local.kind {
        return format!("Type changed: {:?} -> {:?}", local.kind, template.kind);
    }
    match template.kind {
        EntryKind::Symlink => "Symlink target changed".into(),
        _ if template.is_binary || local.is_binary => "Binary content changed".into(),
        _ => "Content differs from template".into(),
    }
}
