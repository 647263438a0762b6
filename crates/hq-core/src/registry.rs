//! Merge-strategy registry
//!
//! An ordered list of (glob, strategy) rules. The first rule whose pattern
//! matches a path decides its strategy; unmatched paths are overwritten.

use std::fmt;

use globset::{GlobBuilder, GlobMatcher};
use hq_content::MergeStrategy;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How much attention a change deserves in review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Impact {
    High,
    Medium,
    Low,
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        })
    }
}

/// One registry rule.
#[derive(Debug, Clone)]
pub struct StrategyRule {
    pub pattern: String,
    pub strategy: MergeStrategy,
    pub description: String,
    pub impact: Impact,
    matcher: GlobMatcher,
}

impl StrategyRule {
    /// Compile a rule. `*` stays within one path component; `**` crosses them.
    pub fn new(
        pattern: &str,
        strategy: MergeStrategy,
        description: &str,
        impact: Impact,
    ) -> Result<Self> {
        let matcher = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| Error::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?
            .compile_matcher();
        Ok(Self {
            pattern: pattern.to_string(),
            strategy,
            description: description.to_string(),
            impact,
            matcher,
        })
    }

    pub fn is_match(&self, relative_path: &str) -> bool {
        self.matcher.is_match(relative_path)
    }
}

/// Ordered strategy lookup.
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    rules: Vec<StrategyRule>,
}

impl StrategyRegistry {
    pub fn new(rules: Vec<StrategyRule>) -> Self {
        Self { rules }
    }

    /// The rules every installation uses.
    pub fn builtin() -> Result<Self> {
        let rules = vec![
            StrategyRule::new(
                ".claude/CLAUDE.md",
                MergeStrategy::SectionMerge {
                    sections: vec!["Learned Rules".into()],
                },
                "Core instructions; learned rules are carried over",
                Impact::High,
            )?,
            StrategyRule::new(
                "agents.md",
                MergeStrategy::NeverOverwrite,
                "User profile; never modified",
                Impact::High,
            )?,
            StrategyRule::new(
                "workers/registry.yaml",
                MergeStrategy::AdditiveMerge {
                    list_key: "workers".into(),
                    id_field: "id".into(),
                },
                "Worker registry; new workers are appended",
                Impact::Medium,
            )?,
            StrategyRule::new(
                "workers/**/worker.yaml",
                MergeStrategy::YamlMerge {
                    fields: vec!["instructions".into()],
                },
                "Worker definition; custom instructions are kept",
                Impact::High,
            )?,
            StrategyRule::new(
                ".claude/commands/*.md",
                MergeStrategy::PreserveRulesSection {
                    section: "Rules".into(),
                },
                "Command; local rules are merged with template rules",
                Impact::Medium,
            )?,
            StrategyRule::new(
                "knowledge/private/**",
                MergeStrategy::NeverOverwrite,
                "Private knowledge; never modified",
                Impact::Medium,
            )?,
        ];
        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[StrategyRule] {
        &self.rules
    }

    /// First rule matching `relative_path`.
    pub fn lookup(&self, relative_path: &str) -> Option<&StrategyRule> {
        self.rules.iter().find(|rule| rule.is_match(relative_path))
    }

    /// Strategy for a path, `Overwrite` when no rule matches.
    pub fn strategy_for(&self, relative_path: &str) -> MergeStrategy {
        self.lookup(relative_path)
            .map(|rule| rule.strategy.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(".claude/CLAUDE.md", "section_merge")]
    #[case("agents.md", "never_overwrite")]
    #[case("docs/agents.md", "overwrite")]
    #[case("workers/registry.yaml", "additive_merge")]
    #[case("workers/dev/worker.yaml", "yaml_merge")]
    #[case("workers/team/dev/worker.yaml", "yaml_merge")]
    #[case(".claude/commands/ship.md", "preserve_rules_section")]
    #[case(".claude/commands/nested/ship.md", "overwrite")]
    #[case("knowledge/private/notes/a.md", "never_overwrite")]
    #[case("knowledge/public/a.md", "overwrite")]
    fn builtin_lookup(#[case] path: &str, #[case] strategy: &str) {
        let registry = StrategyRegistry::builtin().unwrap();
        assert_eq!(registry.strategy_for(path).name(), strategy);
    }

    #[test]
    fn first_match_wins() {
        let registry = StrategyRegistry::new(vec![
            StrategyRule::new("a/*.md", MergeStrategy::NeverOverwrite, "", Impact::Low).unwrap(),
            StrategyRule::new("a/**", MergeStrategy::Overwrite, "", Impact::Low).unwrap(),
        ]);
        assert_eq!(registry.strategy_for("a/x.md"), MergeStrategy::NeverOverwrite);
        assert_eq!(registry.strategy_for("a/b/x.md"), MergeStrategy::Overwrite);
    }

    #[test]
    fn bad_pattern_is_reported() {
        let err = StrategyRule::new("a/[", MergeStrategy::Overwrite, "", Impact::Low).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }

    #[test]
    fn impact_orders_high_first() {
        let mut impacts = vec![Impact::Low, Impact::High, Impact::Medium];
        impacts.sort();
        assert_eq!(impacts, vec![Impact::High, Impact::Medium, Impact::Low]);
    }
}
