//! Installed version detection
//!
//! The `.hq-version` marker is authoritative. Without a valid marker the
//! version is inferred: a `## vX.Y.Z` heading in the changelog wins outright,
//! otherwise every structural clue is evaluated and the highest version floor
//! among the matches is reported.

use std::cmp::Reverse;
use std::fmt;
use std::sync::OnceLock;

use hq_fs::{FileSystem, HqPath};
use regex::Regex;
use semver::Version;
use serde::{Serialize, Serializer};

/// How a version was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMethod {
    File,
    Inference,
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Inference => f.write_str("inference"),
        }
    }
}

/// Outcome of version detection. `version` is `None` when nothing matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionReport {
    #[serde(serialize_with = "serialize_version")]
    pub version: Option<Version>,
    pub method: DetectionMethod,
    pub clues: Vec<String>,
}

impl VersionReport {
    pub fn is_known(&self) -> bool {
        self.version.is_some()
    }

    /// The version, or `"unknown"`.
    pub fn version_string(&self) -> String {
        self.version
            .as_ref()
            .map_or_else(|| "unknown".to_string(), Version::to_string)
    }
}

fn serialize_version<S: Serializer>(version: &Option<Version>, s: S) -> Result<S::Ok, S::Error> {
    match version {
        Some(v) => s.collect_str(v),
        None => s.serialize_str("unknown"),
    }
}

const SEMVER_PATTERN: &str = r"\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?";

fn strict_semver() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!("^{SEMVER_PATTERN}$")).unwrap_or_else(|e| unreachable!("{e}"))
    })
}

fn changelog_heading() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?m)^##\s+v({SEMVER_PATTERN})\b"))
            .unwrap_or_else(|e| unreachable!("{e}"))
    })
}

/// Parse a marker value: surrounding whitespace ignored, no prefix characters,
/// `MAJOR.MINOR.PATCH[-prerelease]` only.
pub fn parse_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    if !strict_semver().is_match(trimmed) {
        return None;
    }
    Version::parse(trimmed).ok()
}

/// First `## vX.Y.Z` heading of a changelog.
pub fn changelog_version(changelog: &str) -> Option<Version> {
    changelog_heading()
        .captures(changelog)
        .and_then(|caps| caps.get(1))
        .and_then(|m| Version::parse(m.as_str()).ok())
}

#[derive(Debug, Clone, Copy)]
enum Evidence {
    Exists(&'static str),
    Dir(&'static str),
    Symlink(&'static str),
    /// The worker registry has a `field:` key on any line
    RegistryField(&'static str),
}

#[derive(Debug, Clone, Copy)]
struct Clue {
    description: &'static str,
    floor: (u64, u64, u64),
    evidence: Evidence,
}

const CLUES: &[Clue] = &[
    Clue {
        description: "workers directory present",
        floor: (0, 1, 0),
        evidence: Evidence::Dir("workers"),
    },
    Clue {
        description: "core instructions file present",
        floor: (0, 1, 0),
        evidence: Evidence::Exists(".claude/CLAUDE.md"),
    },
    Clue {
        description: "worker registry present",
        floor: (0, 2, 0),
        evidence: Evidence::Exists("workers/registry.yaml"),
    },
    Clue {
        description: "commands directory present",
        floor: (0, 3, 0),
        evidence: Evidence::Dir(".claude/commands"),
    },
    Clue {
        description: "knowledge directory present",
        floor: (0, 4, 0),
        evidence: Evidence::Dir("knowledge"),
    },
    Clue {
        description: "user profile present",
        floor: (0, 5, 0),
        evidence: Evidence::Exists("agents.md"),
    },
    Clue {
        description: "checkpoint command present",
        floor: (0, 6, 0),
        evidence: Evidence::Exists(".claude/commands/checkpoint.md"),
    },
    Clue {
        description: "registry declares a version field",
        floor: (0, 7, 0),
        evidence: Evidence::RegistryField("version"),
    },
    Clue {
        description: "handoff command present",
        floor: (0, 8, 0),
        evidence: Evidence::Exists(".claude/commands/handoff.md"),
    },
    Clue {
        description: "registry entries declare a team field",
        floor: (0, 9, 0),
        evidence: Evidence::RegistryField("team"),
    },
    Clue {
        description: "skills directory present",
        floor: (1, 0, 0),
        evidence: Evidence::Dir(".claude/skills"),
    },
    Clue {
        description: "private knowledge directory present",
        floor: (1, 1, 0),
        evidence: Evidence::Dir("knowledge/private"),
    },
    Clue {
        description: "skills directory is a symlink",
        floor: (1, 2, 0),
        evidence: Evidence::Symlink(".claude/skills"),
    },
    Clue {
        description: "shared worker library present",
        floor: (1, 3, 0),
        evidence: Evidence::Dir("workers/shared"),
    },
    Clue {
        description: "learn command present",
        floor: (1, 4, 0),
        evidence: Evidence::Exists(".claude/commands/learn.md"),
    },
];

fn registry_has_field(registry: &str, field: &str) -> bool {
    let key = format!("{field}:");
    registry.lines().any(|line| {
        let line = line.trim_start();
        let line = line.strip_prefix("- ").unwrap_or(line).trim_start();
        line.starts_with(&key)
    })
}

/// Detects the installed version through a [`FileSystem`] view.
pub struct VersionOracle<'a> {
    fs: &'a dyn FileSystem,
}

impl<'a> VersionOracle<'a> {
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self { fs }
    }

    pub fn detect(&self) -> VersionReport {
        if let Some(version) = self.from_marker() {
            tracing::debug!(%version, "Version from marker file");
            return VersionReport {
                version: Some(version),
                method: DetectionMethod::File,
                clues: Vec::new(),
            };
        }
        self.infer()
    }

    fn from_marker(&self) -> Option<Version> {
        let marker = HqPath::VersionMarker.as_str();
        if !self.fs.file_exists(marker) {
            return None;
        }
        let raw = self.fs.read_file(marker).ok()?;
        let parsed = parse_version(&raw);
        if parsed.is_none() {
            tracing::warn!("Ignoring malformed {}: {:?}", marker, raw.trim());
        }
        parsed
    }

    fn infer(&self) -> VersionReport {
        let changelog = HqPath::Changelog.as_str();
        if let Ok(text) = self.fs.read_file(changelog)
            && let Some(version) = changelog_version(&text)
        {
            return VersionReport {
                clues: vec![format!("{changelog} heading v{version}")],
                version: Some(version),
                method: DetectionMethod::Inference,
            };
        }

        let registry = self
            .fs
            .read_file(HqPath::WorkerRegistry.as_str())
            .unwrap_or_default();

        let mut matched: Vec<&Clue> = CLUES
            .iter()
            .filter(|clue| match clue.evidence {
                Evidence::Exists(path) => self.fs.file_exists(path),
                Evidence::Dir(path) => self.fs.is_dir(path),
                Evidence::Symlink(path) => self.fs.is_symlink(path),
                Evidence::RegistryField(field) => registry_has_field(&registry, field),
            })
            .collect();
        // Stable sort keeps table order among equal floors.
        matched.sort_by_key(|clue| Reverse(clue.floor));

        let version = matched
            .first()
            .map(|clue| Version::new(clue.floor.0, clue.floor.1, clue.floor.2));
        tracing::debug!(clues = matched.len(), "Inferred version from structure");

        VersionReport {
            version,
            method: DetectionMethod::Inference,
            clues: matched
                .iter()
                .map(|clue| {
                    let (major, minor, patch) = clue.floor;
                    format!("{} (>= {major}.{minor}.{patch})", clue.description)
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hq_fs::MemoryFs;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("1.2.3", Some("1.2.3"))]
    #[case("  1.2.3\n", Some("1.2.3"))]
    #[case("2.0.0-beta.1", Some("2.0.0-beta.1"))]
    #[case("v1.2.3", None)]
    #[case("1.2", None)]
    #[case("1.2.3+build", None)]
    #[case("1.2.3 extra", None)]
    #[case("", None)]
    fn marker_parsing(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(
            parse_version(raw).map(|v| v.to_string()),
            expected.map(str::to_string)
        );
    }

    proptest! {
        #[test]
        fn trailing_newline_is_ignored(major in 0u64..1000, minor in 0u64..1000, patch in 0u64..1000) {
            let s = format!("{major}.{minor}.{patch}");
            prop_assert_eq!(parse_version(&format!("{s}\n")), parse_version(&s));
            prop_assert!(parse_version(&s).is_some());
        }
    }

    #[test]
    fn marker_wins() {
        let fs = MemoryFs::new()
            .with_file(".hq-version", "3.1.0\n")
            .with_dir(".claude/skills");
        let report = VersionOracle::new(&fs).detect();
        assert_eq!(report.version_string(), "3.1.0");
        assert_eq!(report.method, DetectionMethod::File);
    }

    #[test]
    fn malformed_marker_falls_back_to_inference() {
        let fs = MemoryFs::new()
            .with_file(".hq-version", "v3.1\n")
            .with_dir("workers");
        let report = VersionOracle::new(&fs).detect();
        assert_eq!(report.version_string(), "0.1.0");
        assert_eq!(report.method, DetectionMethod::Inference);
    }

    #[test]
    fn changelog_short_circuits_structure() {
        let fs = MemoryFs::new()
            .with_file("CHANGELOG.md", "# Changes\n\n## v0.9.2\n\n## v0.9.1\n")
            .with_dir(".claude/skills");
        let report = VersionOracle::new(&fs).detect();
        assert_eq!(report.version_string(), "0.9.2");
        assert_eq!(report.clues, vec!["CHANGELOG.md heading v0.9.2"]);
    }

    #[test]
    fn highest_floor_wins_not_first_match() {
        let fs = MemoryFs::new()
            .with_dir("workers")
            .with_file("workers/registry.yaml", "version: 2\nworkers:\n  - id: a\n    team: core\n")
            .with_dir(".claude/skills");
        let report = VersionOracle::new(&fs).detect();
        assert_eq!(report.version_string(), "1.0.0");
        assert_eq!(report.clues[0], "skills directory present (>= 1.0.0)");
        assert_eq!(report.clues.len(), 5);
    }

    #[test]
    fn symlinked_skills_is_newest_layout() {
        let fs = MemoryFs::new()
            .with_dir("shared/skills")
            .with_symlink(".claude/skills", "../shared/skills");
        let report = VersionOracle::new(&fs).detect();
        assert_eq!(report.version_string(), "1.2.0");
    }

    #[test]
    fn empty_tree_is_unknown() {
        let report = VersionOracle::new(&MemoryFs::new()).detect();
        assert!(!report.is_known());
        assert_eq!(report.version_string(), "unknown");
        assert!(report.clues.is_empty());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["version"], "unknown");
        assert_eq!(json["method"], "inference");
    }
}
