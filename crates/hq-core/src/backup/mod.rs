//! Installation backups
//!
//! A backup is a timestamp-named directory under the backup root holding a
//! mirror of the installation, a `backup-manifest.json` sidecar, and two areas
//! filled during a migration: `modified/` (originals of merged files) and
//! `removed/` (archived deletions).

mod copier;
mod manager;
pub mod manifest;

pub use copier::{CopyStats, PosixCopier, TreeCopier, WindowsCopier, platform_copier};
pub use manager::{Backup, BackupInfo, BackupManager, RestoreReport, load_manifest};
pub use manifest::{
    BackupManifest, ManifestValidation, Platform, RestoreStatus, RestoreVerification, Verification,
    VerificationStatus, parse_manifest, validate_manifest, verify_backup, verify_restore,
};
