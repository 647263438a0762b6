//! Core migration engine for HQ installations
//!
//! This crate decides what changes between an installation and a newer
//! template, and carries the change out safely:
//!
//! - [`version`]: which version is installed
//! - [`registry`]: which paths need a non-overwrite merge strategy
//! - [`diff`]: six-way classification of template vs. installation
//! - [`plan`]: ordered, reviewable actions and their markdown rendering
//! - [`backup`]: snapshots with manifests, verification and restore
//! - [`migrate`]: the phase runner tying it together
//!
//! # Example
//!
//! ```rust,no_run
//! use hq_core::{AssumeYes, DirectoryTemplate, MigrateConfig, Migrator};
//!
//! let root = std::path::Path::new("/home/me/hq");
//! let config = MigrateConfig::load(root)?;
//! let report = Migrator::new(root, config)?
//!     .dry_run(true)
//!     .run(&DirectoryTemplate::new("/tmp/hq-template"), &AssumeYes)?;
//! println!("{:?}", report.outcome);
//! # Ok::<(), hq_core::Error>(())
//! ```

pub mod backup;
pub mod config;
pub mod diff;
pub mod error;
pub mod migrate;
pub mod plan;
pub mod registry;
pub mod version;

pub use backup::{Backup, BackupInfo, BackupManager, BackupManifest, RestoreReport, Verification};
pub use config::MigrateConfig;
pub use diff::{DiffCategory, DiffEngine, DiffEntry, DiffResult};
pub use error::{Error, Result};
pub use migrate::{
    AssumeYes, Confirm, DirectoryTemplate, FetchedTemplate, MigrationReport, Migrator, Outcome,
    Phase, TemplateProvider,
};
pub use plan::{Plan, PlanAction, PlanBuilder, PlanEntry, render_plan};
pub use registry::{Impact, StrategyRegistry, StrategyRule};
pub use version::{DetectionMethod, VersionOracle, VersionReport};
