//! End-to-end scenarios across hq-fs, hq-content and hq-core
//!
//! Each test builds real trees on disk and drives the public API the way the
//! CLI does: inventory -> diff -> plan -> backup -> apply -> restore.

use std::fs;

use hq_content::{MergeEngine, MergeStrategy};
use hq_core::backup::{VerificationStatus, load_manifest, parse_manifest};
use hq_core::{
    AssumeYes, BackupManager, DetectionMethod, DiffCategory, DiffEngine, DirectoryTemplate,
    MigrateConfig, Migrator, Outcome, Phase, PlanBuilder, StrategyRegistry, VersionOracle,
    render_plan,
};
use hq_fs::{DiskFs, IgnoreSet, TreeInventory};
use hq_test_utils::TestTree;
use hq_test_utils::sample::{self, installation_v1, template_v2};
use pretty_assertions::assert_eq;

fn paths(diff: &hq_core::DiffResult, category: DiffCategory) -> Vec<&str> {
    diff.bucket(category).iter().map(|e| e.path.as_str()).collect()
}

#[test]
fn four_way_classification() {
    let template = TestTree::new()
        .file("A.md", "same\n")
        .file("B.md", "brand new\n")
        .file("C.md", "template version\n");
    let local = TestTree::new()
        .file("A.md", "same\n")
        .file("C.md", "old version\n")
        .file("D.md", "mine\n");

    let diff = DiffEngine::new(StrategyRegistry::builtin().unwrap())
        .categorize(&template.inventory(), &local.inventory());

    assert_eq!(paths(&diff, DiffCategory::New), vec!["B.md"]);
    assert_eq!(paths(&diff, DiffCategory::Modified), vec!["C.md"]);
    assert_eq!(paths(&diff, DiffCategory::Unchanged), vec!["A.md"]);
    assert_eq!(paths(&diff, DiffCategory::LocalOnly), vec!["D.md"]);
    assert!(paths(&diff, DiffCategory::Deleted).is_empty());
    assert!(paths(&diff, DiffCategory::Renamed).is_empty());
    assert_eq!(
        diff.bucket(DiffCategory::Modified)[0].diff_summary.as_deref(),
        Some("+1 -1 lines")
    );
}

#[test]
fn core_instructions_keep_learned_rules() {
    let outcome = MergeEngine::new().merge(
        &MergeStrategy::SectionMerge {
            sections: vec!["Learned Rules".into()],
        },
        sample::TEMPLATE_CLAUDE,
        sample::LOCAL_CLAUDE,
    );

    assert!(outcome.success);
    assert!(outcome.merged.contains("You are running HQ v2"));
    for rule in sample::LOCAL_RULES {
        assert!(outcome.merged.contains(rule), "missing {rule:?}");
    }
}

#[test]
fn version_inferred_without_marker() {
    let local = installation_v1();
    fs::remove_file(local.join(".hq-version")).unwrap();

    let report = VersionOracle::new(&DiskFs::new(local.root())).detect();

    assert_eq!(report.method, DetectionMethod::Inference);
    assert_eq!(report.version_string(), "1.1.0");
    assert_eq!(
        report.clues.first().map(String::as_str),
        Some("private knowledge directory present (>= 1.1.0)")
    );
}

#[test]
fn plan_document_from_disk_trees() {
    let local = installation_v1();
    let template = template_v2();
    let registry = StrategyRegistry::builtin().unwrap();
    let local_inv = TreeInventory::walk(local.root(), &IgnoreSet::standard()).unwrap();
    let template_inv = TreeInventory::walk(template.root(), &IgnoreSet::standard()).unwrap();

    let diff = DiffEngine::new(registry.clone()).categorize(&template_inv, &local_inv);
    let plan = PlanBuilder::new(&registry)
        .local(&local_inv)
        .versions("1.0.0", "2.0.0")
        .build(&diff);
    let doc = render_plan(&plan);

    let order = [
        "## Summary",
        "## High-Impact Changes",
        "## Files to Update",
        "## Files to Add",
        "## Files to Remove",
        "## Structural Changes",
        "## Directories to Create",
        "## Warnings",
    ];
    let positions: Vec<usize> = order
        .iter()
        .map(|h| doc.find(h).unwrap_or_else(|| panic!("missing {h}\n{doc}")))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{doc}");
    assert!(doc.contains("`workers/reviewer/`"));
    assert!(doc.contains("`.claude/CLAUDE.md` (Core instructions) [section_merge, HIGH]"));
}

#[test]
fn manifest_on_disk_round_trips() {
    let local = installation_v1();
    let manager = BackupManager::with_platform_copier(local.root(), local.join(".hq-backup"));

    let backup = manager.snapshot("1.0.0").unwrap();

    let json = fs::read_to_string(backup.dir.join("backup-manifest.json")).unwrap();
    assert_eq!(parse_manifest(&json).unwrap(), backup.manifest);
    assert_eq!(load_manifest(&backup.dir).unwrap(), backup.manifest);
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["fileCount"], 10);
    assert_eq!(value["excludedDirs"], serde_json::json!([".git", "node_modules", ".hq-backup"]));
}

#[cfg(unix)]
#[test]
fn symlinks_survive_backup_and_restore() {
    let local = installation_v1()
        .file("shared/skills/deploy.md", "# Deploy\n")
        .symlink(".claude/skills", "../shared/skills");
    let manager = BackupManager::with_platform_copier(local.root(), local.join(".hq-backup"));

    let backup = manager.snapshot("1.2.0").unwrap();
    assert_eq!(backup.manifest.symlink_count, 1);
    assert_eq!(backup.verification.status, VerificationStatus::Verified);
    let mirrored = fs::symlink_metadata(backup.dir.join(".claude/skills")).unwrap();
    assert!(mirrored.file_type().is_symlink());

    fs::remove_file(local.join(".claude/skills")).unwrap();
    let report = manager.restore(&backup.dir).unwrap();

    assert!(report.failures.is_empty(), "{:?}", report.failures);
    let restored = fs::read_link(local.join(".claude/skills")).unwrap();
    assert_eq!(restored, std::path::Path::new("../shared/skills"));
}

#[test]
fn full_migration_runs_every_phase() {
    let local = installation_v1();
    let template = template_v2();
    let migrator = Migrator::new(local.root(), MigrateConfig::default()).unwrap();

    let report = migrator
        .run(&DirectoryTemplate::new(template.root()), &AssumeYes)
        .unwrap();

    assert_eq!(report.outcome, Outcome::Completed);
    assert_eq!(
        report.phases_completed,
        vec![
            Phase::Detect,
            Phase::Inventory,
            Phase::Diff,
            Phase::Plan,
            Phase::Confirm,
            Phase::Backup,
            Phase::Apply,
            Phase::Verify,
        ]
    );
    assert_eq!(migrator.backups().list_backups().unwrap().len(), 1);

    let again = migrator
        .dry_run(true)
        .run(&DirectoryTemplate::new(template.root()), &AssumeYes)
        .unwrap();
    assert_eq!(again.from_version, "2.0.0");
    assert_eq!(again.plan.unwrap().summary.new, 0);
}
