//! Phase-ordered migration of an installation to a template.
//!
//! Phases run strictly in order and each completes before the next starts:
//! Detect, Inventory, Diff, Plan, Confirm, Backup, Apply, Verify. Nothing in
//! the installation is written before the backup has been taken and verified.

mod provider;
mod runner;

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::plan::{Plan, PlanAction};

pub use provider::{DirectoryTemplate, FetchedTemplate, TemplateProvider};
pub use runner::Migrator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Detect,
    Inventory,
    Diff,
    Plan,
    Confirm,
    Backup,
    Apply,
    Verify,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Detect => "detect",
            Self::Inventory => "inventory",
            Self::Diff => "diff",
            Self::Plan => "plan",
            Self::Confirm => "confirm",
            Self::Backup => "backup",
            Self::Apply => "apply",
            Self::Verify => "verify",
        })
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    /// Stopped after planning on request
    DryRun,
    /// Confirmation refused; nothing written
    Declined,
    /// Template and installation already agree
    UpToDate,
    /// Stopped before any write to the installation
    Aborted { phase: Phase, reason: String },
    /// Too many failures while applying; later phases did not run
    CriticalFailure { phase: Phase, reason: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed | Self::DryRun | Self::UpToDate)
    }
}

/// Approval between planning and backup.
pub trait Confirm {
    fn confirm(&self, plan: &Plan) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&Plan) -> bool,
{
    fn confirm(&self, plan: &Plan) -> bool {
        self(plan)
    }
}

/// Approves every plan.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _plan: &Plan) -> bool {
        true
    }
}

/// One path the apply phase changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedChange {
    pub path: String,
    pub action: PlanAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
}

/// A path left untouched, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathIssue {
    pub path: String,
    pub reason: String,
}

impl PathIssue {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for PathIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub from_version: String,
    pub to_version: String,
    pub template: String,
    pub phases_completed: Vec<Phase>,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,
    pub applied: Vec<AppliedChange>,
    /// Deliberately left alone (binary special files, local content kept)
    pub skipped: Vec<PathIssue>,
    pub failed: Vec<PathIssue>,
    pub warnings: Vec<String>,
}

impl MigrationReport {
    fn new(template: String) -> Self {
        Self {
            from_version: "unknown".into(),
            to_version: "unknown".into(),
            template,
            phases_completed: Vec::new(),
            outcome: Outcome::Completed,
            plan: None,
            backup_dir: None,
            applied: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn complete(&mut self, phase: Phase) {
        tracing::info!("Phase {} complete", phase);
        self.phases_completed.push(phase);
    }

    fn finish(mut self, outcome: Outcome) -> Self {
        match &outcome {
            Outcome::Aborted { phase, reason } => {
                tracing::warn!("Migration aborted during {}: {}", phase, reason)
            }
            Outcome::CriticalFailure { phase, reason } => {
                tracing::error!("Migration halted during {}: {}", phase, reason)
            }
            _ => {}
        }
        self.outcome = outcome;
        self
    }

    pub fn has_completed(&self, phase: Phase) -> bool {
        self.phases_completed.contains(&phase)
    }
}
