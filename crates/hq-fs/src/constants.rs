//! Well-known paths inside an HQ installation.

use std::path::Path;

/// Standard installation markers and paths, relative to the installation root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HqPath {
    /// Single-line semver marker
    VersionMarker,
    /// Release notes, newest `## vX.Y.Z` heading first
    Changelog,
    /// Core instructions file
    CoreInstructions,
    /// Worker registry list
    WorkerRegistry,
    /// Slash command definitions
    CommandsDir,
    /// The user profile; never overwritten
    UserProfile,
    /// Default backup root
    BackupDir,
    /// Manifest sidecar inside each backup
    BackupManifest,
    /// Subdirectory of a backup holding pre-merge originals
    ModifiedDir,
    /// Subdirectory of a backup holding archived deletions
    RemovedDir,
    /// Directory-existence placeholder file name
    Gitkeep,
    /// Optional tool configuration
    MigrateConfig,
}

impl HqPath {
    /// Get the string representation of the path.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VersionMarker => ".hq-version",
            Self::Changelog => "CHANGELOG.md",
            Self::CoreInstructions => ".claude/CLAUDE.md",
            Self::WorkerRegistry => "workers/registry.yaml",
            Self::CommandsDir => ".claude/commands",
            Self::UserProfile => "agents.md",
            Self::BackupDir => ".hq-backup",
            Self::BackupManifest => "backup-manifest.json",
            Self::ModifiedDir => "modified",
            Self::RemovedDir => "removed",
            Self::Gitkeep => ".gitkeep",
            Self::MigrateConfig => ".hq-migrate.toml",
        }
    }
}

impl AsRef<Path> for HqPath {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl AsRef<str> for HqPath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for HqPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
