//! Backup manifest
//!
//! JSON sidecar written once at the end of a snapshot. Validation works on the
//! raw JSON value so a missing field or an unknown platform is reported as a
//! list of problems instead of a deserialization failure. Unknown extra fields
//! are ignored.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Manifest schema version.
pub const MANIFEST_VERSION: &str = "1.0";

/// The only symlink policy snapshots use.
pub const SYMLINK_HANDLING: &str = "preserved-as-symlinks";

/// Directories never copied into a backup.
pub const EXCLUDED_DIRS: &[&str] = &[".git", "node_modules", ".hq-backup"];

/// Minimum snapshot verification tolerance, in files.
pub const BACKUP_TOLERANCE: usize = 2;

/// Snapshot tolerance as a fraction of the expected count, when larger.
pub const BACKUP_TOLERANCE_RATIO: f64 = 0.03;

/// Restore verification tolerance, in files.
pub const RESTORE_TOLERANCE: usize = 5;

const REQUIRED_FIELDS: &[&str] = &[
    "version",
    "timestamp",
    "hqVersion",
    "hqPath",
    "fileCount",
    "symlinkCount",
    "totalSizeBytes",
    "totalSizeHuman",
    "excludedDirs",
    "platform",
    "backupMethod",
    "symlinkHandling",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Darwin,
    Linux,
    Win32,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Self::Darwin, Self::Linux, Self::Win32];

    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::Darwin
        } else if cfg!(windows) {
            Self::Win32
        } else {
            Self::Linux
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Darwin => "darwin",
            Self::Linux => "linux",
            Self::Win32 => "win32",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupManifest {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub hq_version: String,
    pub hq_path: String,
    pub file_count: usize,
    pub symlink_count: usize,
    pub total_size_bytes: u64,
    pub total_size_human: String,
    pub excluded_dirs: Vec<String>,
    pub platform: Platform,
    pub backup_method: String,
    pub symlink_handling: String,
}

/// What a snapshot copy produced; input to [`generate_manifest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestInput {
    pub timestamp: DateTime<Utc>,
    pub hq_version: String,
    pub hq_path: String,
    pub file_count: usize,
    pub symlink_count: usize,
    pub total_size_bytes: u64,
    pub excluded_dirs: Vec<String>,
    pub platform: Platform,
    pub backup_method: String,
}

pub fn generate_manifest(input: ManifestInput) -> BackupManifest {
    BackupManifest {
        version: MANIFEST_VERSION.to_string(),
        timestamp: input.timestamp,
        hq_version: input.hq_version,
        hq_path: input.hq_path,
        file_count: input.file_count,
        symlink_count: input.symlink_count,
        total_size_human: human_size(input.total_size_bytes),
        total_size_bytes: input.total_size_bytes,
        excluded_dirs: input.excluded_dirs,
        platform: input.platform,
        backup_method: input.backup_method,
        symlink_handling: SYMLINK_HANDLING.to_string(),
    }
}

/// `512 B`, `3 KB`, `1.5 MB`, `2.0 GB`.
pub fn human_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < MB {
        format!("{} KB", (b / KB).round() as u64)
    } else if b < GB {
        format!("{:.1} MB", b / MB)
    } else {
        format!("{:.1} GB", b / GB)
    }
}

/// Problems found in a manifest; empty when valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestValidation {
    pub errors: Vec<String>,
}

impl ManifestValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check a raw manifest value. Never fails; every problem becomes an entry.
pub fn validate_manifest(value: &Value) -> ManifestValidation {
    let mut errors = Vec::new();
    let Some(obj) = value.as_object() else {
        return ManifestValidation {
            errors: vec!["manifest is not a JSON object".into()],
        };
    };

    for field in REQUIRED_FIELDS {
        if obj.get(*field).is_none_or(Value::is_null) {
            errors.push(format!("missing required field `{field}`"));
        }
    }

    if let Some(count) = obj.get("fileCount") {
        match count.as_u64() {
            Some(0) => errors.push("fileCount is 0; an empty backup is suspicious".into()),
            Some(_) => {}
            None => errors.push("fileCount is not a non-negative integer".into()),
        }
    }
    if let Some(platform) = obj.get("platform").and_then(Value::as_str)
        && Platform::parse(platform).is_none()
    {
        errors.push(format!("unknown platform `{platform}`"));
    }
    if let Some(ts) = obj.get("timestamp").and_then(Value::as_str)
        && DateTime::parse_from_rfc3339(ts).is_err()
    {
        errors.push(format!("timestamp `{ts}` is not ISO-8601"));
    }

    if errors.is_empty()
        && let Err(e) = serde_json::from_value::<BackupManifest>(value.clone())
    {
        errors.push(format!("malformed field: {e}"));
    }

    ManifestValidation { errors }
}

/// Parse and validate manifest JSON.
pub fn parse_manifest(json: &str) -> Result<BackupManifest, ManifestValidation> {
    let value: Value = serde_json::from_str(json).map_err(|e| ManifestValidation {
        errors: vec![format!("invalid JSON: {e}")],
    })?;
    let validation = validate_manifest(&value);
    if !validation.is_valid() {
        return Err(validation);
    }
    serde_json::from_value(value).map_err(|e| ManifestValidation {
        errors: vec![e.to_string()],
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VerificationStatus {
    #[serde(rename = "VERIFIED")]
    Verified,
    #[serde(rename = "VERIFIED (within tolerance)")]
    WithinTolerance,
    #[serde(rename = "MISMATCH")]
    Mismatch,
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Verified => "VERIFIED",
            Self::WithinTolerance => "VERIFIED (within tolerance)",
            Self::Mismatch => "MISMATCH",
        })
    }
}

/// Expected vs. actual file counts of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub status: VerificationStatus,
    pub expected: usize,
    pub actual: usize,
    /// `actual - expected`
    pub difference: i64,
}

impl Verification {
    pub fn is_ok(&self) -> bool {
        self.status != VerificationStatus::Mismatch
    }
}

/// Allowed drift for a snapshot of `expected` files.
pub fn backup_tolerance(expected: usize) -> u64 {
    let relative = (expected as f64 * BACKUP_TOLERANCE_RATIO).ceil() as u64;
    relative.max(BACKUP_TOLERANCE as u64)
}

pub fn verify_backup(expected: usize, actual: usize) -> Verification {
    let difference = actual as i64 - expected as i64;
    let status = match difference.unsigned_abs() {
        0 => VerificationStatus::Verified,
        d if d <= backup_tolerance(expected) => VerificationStatus::WithinTolerance,
        _ => VerificationStatus::Mismatch,
    };
    Verification {
        status,
        expected,
        actual,
        difference,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RestoreStatus {
    Match,
    Mismatch,
}

impl fmt::Display for RestoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Match => "MATCH",
            Self::Mismatch => "MISMATCH",
        })
    }
}

/// Expected vs. actual file counts after a restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RestoreVerification {
    pub status: RestoreStatus,
    pub expected: usize,
    pub actual: usize,
    pub difference: i64,
}

pub fn verify_restore(expected: usize, actual: usize) -> RestoreVerification {
    let difference = actual as i64 - expected as i64;
    let status = if difference.unsigned_abs() <= RESTORE_TOLERANCE as u64 {
        RestoreStatus::Match
    } else {
        RestoreStatus::Mismatch
    };
    RestoreVerification {
        status,
        expected,
        actual,
        difference,
    }
}
