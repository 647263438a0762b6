//! Merge engine
//!
//! Produces the new content of a modified file from the template version and
//! the local version. Each strategy that splices user text into template text
//! re-checks afterwards that the user text is present verbatim. When that check
//! fails, the outcome carries the local content unchanged with `success = false`
//! so the caller leaves the file alone.

use serde::{Deserialize, Serialize};

use crate::entries::{parse_entry_list, reindent};
use crate::lines::{
    end_of_content, ensure_trailing_newline, line_ending, lines, missing_lines, non_blank_lines,
};
use crate::section::{SectionSpan, find_section, headings, parse_heading};
use crate::yaml_block::top_level_blocks;

/// How many leading non-blank lines of a preserved YAML block must survive.
pub const YAML_VERIFY_LINES: usize = 5;

/// Merge behavior for one path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Take the template verbatim
    #[default]
    Overwrite,
    /// Carry named local sections into the template
    SectionMerge { sections: Vec<String> },
    /// Carry named top-level keys, and keys unknown to the template, into the template
    YamlMerge { fields: Vec<String> },
    /// Keep the local file untouched
    NeverOverwrite,
    /// Union the local and template rule lists of one section
    PreserveRulesSection { section: String },
    /// Append template list items whose identity is missing locally
    AdditiveMerge { list_key: String, id_field: String },
}

impl MergeStrategy {
    /// Stable tag used in plans and reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Overwrite => "overwrite",
            Self::SectionMerge { .. } => "section_merge",
            Self::YamlMerge { .. } => "yaml_merge",
            Self::NeverOverwrite => "never_overwrite",
            Self::PreserveRulesSection { .. } => "preserve_rules_section",
            Self::AdditiveMerge { .. } => "additive_merge",
        }
    }

    /// True for [`MergeStrategy::Overwrite`], the strategy of every unregistered path.
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Overwrite)
    }
}

impl std::fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub merged: String,
    /// False when the strategy gave up and `merged` is the local content
    pub success: bool,
    /// Whether protected user content is proven present in `merged`
    pub rules_preserved: bool,
    pub warnings: Vec<String>,
}

impl MergeOutcome {
    fn merged(merged: String) -> Self {
        Self {
            merged,
            success: true,
            rules_preserved: true,
            warnings: Vec::new(),
        }
    }

    fn kept_local(local: &str, reason: impl Into<String>) -> Self {
        Self {
            merged: local.to_string(),
            success: false,
            rules_preserved: false,
            warnings: vec![reason.into()],
        }
    }

    fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }
}

/// Dispatches a [`MergeStrategy`] over template and local content.
#[derive(Debug, Default, Clone, Copy)]
pub struct MergeEngine;

impl MergeEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn merge(&self, strategy: &MergeStrategy, template: &str, local: &str) -> MergeOutcome {
        let outcome = match strategy {
            MergeStrategy::Overwrite => MergeOutcome::merged(template.to_string()),
            MergeStrategy::SectionMerge { sections } => section_merge(template, local, sections),
            MergeStrategy::YamlMerge { fields } => yaml_merge(template, local, fields),
            MergeStrategy::NeverOverwrite => never_overwrite(template, local),
            MergeStrategy::PreserveRulesSection { section } => {
                preserve_rules_section(template, local, section)
            }
            MergeStrategy::AdditiveMerge { list_key, id_field } => {
                additive_merge(template, local, list_key, id_field)
            }
        };
        if !outcome.success {
            tracing::warn!(
                strategy = strategy.name(),
                "Merge fell back to local content: {}",
                outcome.warnings.join("; ")
            );
        }
        outcome
    }
}

/// Replace the section at `span` of `base` with `block`.
///
/// The blank lines that separated the replaced section from what follows are
/// kept; when there were none, the block's own trailing blank lines are used.
fn splice_section(base: &str, span: SectionSpan, block: &str) -> String {
    let eol = line_ending(base);
    let content_end = end_of_content(base, span.start, span.end);
    let block_end = end_of_content(block, 0, block.len());
    let gap = if content_end < span.end {
        &base[content_end..span.end]
    } else {
        &block[block_end..]
    };

    let mut out = String::with_capacity(base.len() + block.len());
    out.push_str(&base[..span.start]);
    out.push_str(&block[..block_end]);
    if !gap.is_empty() || span.end < base.len() {
        ensure_trailing_newline(&mut out, eol);
    }
    out.push_str(gap);
    out.push_str(&base[span.end..]);
    out
}

/// Append `block` to `base` as a new paragraph.
fn append_block(base: &str, block: &str) -> String {
    let eol = line_ending(base);
    let mut out = base.to_string();
    ensure_trailing_newline(&mut out, eol);
    if !out.is_empty() && !out.ends_with(&format!("{eol}{eol}")) {
        out.push_str(eol);
    }
    out.push_str(block);
    out
}

fn section_merge(template: &str, local: &str, sections: &[String]) -> MergeOutcome {
    let mut merged = template.to_string();
    let mut preserved: Vec<&str> = Vec::new();

    for name in sections {
        let Some(local_span) = find_section(local, name) else {
            continue;
        };
        let block = local_span.slice(local);
        merged = match find_section(&merged, name) {
            Some(span) => splice_section(&merged, span, block),
            None => append_block(&merged, block),
        };
        preserved.push(block);
    }

    for block in preserved {
        let missing = missing_lines(block, &merged, None);
        if !missing.is_empty() {
            return MergeOutcome::kept_local(
                local,
                format!("section merge would drop {} local line(s)", missing.len()),
            );
        }
    }
    MergeOutcome::merged(merged)
}

/// Normalized identity of a rule line: bullet and case stripped, whitespace collapsed.
fn rule_key(line: &str) -> Option<String> {
    let trimmed = line.trim();
    let body = if let Some(rest) = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
        .or_else(|| trimmed.strip_prefix("+ "))
    {
        rest
    } else {
        let digits = trimmed.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return None;
        }
        trimmed[digits..]
            .strip_prefix(". ")
            .or_else(|| trimmed[digits..].strip_prefix(") "))?
    };
    let key = body
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches('.')
        .to_lowercase();
    (!key.is_empty()).then_some(key)
}

/// Byte offset just past the last list item of a section's own rule list,
/// ignoring anything under a nested subheading.
fn rule_list_end(block: &str) -> usize {
    let body = lines(block);
    let own_end = body
        .iter()
        .skip(1)
        .find(|l| parse_heading(l.text).is_some())
        .map_or(block.len(), |l| l.start);
    body.iter()
        .skip(1)
        .take_while(|l| l.start < own_end)
        .filter(|l| rule_key(l.text).is_some())
        .last()
        .map(|l| l.end())
        .unwrap_or_else(|| end_of_content(block, 0, own_end))
}

fn preserve_rules_section(template: &str, local: &str, section: &str) -> MergeOutcome {
    let Some(local_span) = find_section(local, section) else {
        return MergeOutcome::merged(template.to_string());
    };
    let local_block = local_span.slice(local);

    let Some(template_span) = find_section(template, section) else {
        let merged = append_block(template, local_block);
        return verify_rules(local, local_block, &[], merged);
    };
    let template_block = template_span.slice(template);

    let mut seen: std::collections::HashSet<String> =
        non_blank_lines(local_block).filter_map(rule_key).collect();
    let additions: Vec<&str> = non_blank_lines(template_block)
        .filter(|line| rule_key(line).is_some_and(|k| seen.insert(k)))
        .collect();

    let union = if additions.is_empty() {
        local_block.to_string()
    } else {
        let eol = line_ending(local_block);
        let cut = rule_list_end(local_block);
        let mut union = local_block[..cut].to_string();
        ensure_trailing_newline(&mut union, eol);
        for line in &additions {
            union.push_str(line);
            union.push_str(eol);
        }
        union.push_str(&local_block[cut..]);
        union
    };

    let merged = splice_section(template, template_span, &union);
    verify_rules(local, local_block, &additions, merged)
}

fn verify_rules(local: &str, local_block: &str, additions: &[&str], merged: String) -> MergeOutcome {
    let missing = missing_lines(local_block, &merged, None);
    if !missing.is_empty() {
        return MergeOutcome::kept_local(
            local,
            format!("rules merge would drop {} local line(s)", missing.len()),
        );
    }
    if let Some(dropped) = additions.iter().find(|line| !merged.contains(*line)) {
        return MergeOutcome::kept_local(local, format!("template rule lost: {dropped}"));
    }
    MergeOutcome::merged(merged)
}

fn yaml_merge(template: &str, local: &str, fields: &[String]) -> MergeOutcome {
    let local_blocks = top_level_blocks(local);
    let template_blocks = top_level_blocks(template);

    let preserved: Vec<(&str, &str)> = fields
        .iter()
        .filter_map(|field| {
            local_blocks
                .iter()
                .find(|b| &b.key == field)
                .map(|b| (b.key.as_str(), b.slice(local)))
        })
        .collect();
    let custom: Vec<&str> = local_blocks
        .iter()
        .filter(|b| !fields.contains(&b.key))
        .filter(|b| !template_blocks.iter().any(|t| t.key == b.key))
        .map(|b| b.slice(local))
        .collect();

    // Rebuild the template, replacing preserved blocks in place.
    let mut merged = String::with_capacity(template.len() + local.len());
    let mut cursor = 0;
    for block in &template_blocks {
        if let Some((_, text)) = preserved.iter().find(|(k, _)| *k == block.key) {
            merged.push_str(&template[cursor..block.start]);
            merged.push_str(text);
            ensure_trailing_newline(&mut merged, line_ending(template));
            cursor = block.end;
        }
    }
    merged.push_str(&template[cursor..]);

    let eol = line_ending(template);
    let appended = preserved
        .iter()
        .filter(|(k, _)| !template_blocks.iter().any(|t| t.key == *k))
        .map(|(_, text)| *text)
        .chain(custom.iter().copied());
    for text in appended {
        ensure_trailing_newline(&mut merged, eol);
        merged.push_str(text);
    }
    ensure_trailing_newline(&mut merged, eol);

    for (key, text) in &preserved {
        let missing = missing_lines(text, &merged, Some(YAML_VERIFY_LINES));
        if !missing.is_empty() {
            return MergeOutcome::kept_local(local, format!("yaml merge would alter `{key}`"));
        }
    }
    for text in &custom {
        if !missing_lines(text, &merged, None).is_empty() {
            return MergeOutcome::kept_local(local, "yaml merge would drop a custom key");
        }
    }

    let local_parses = serde_yaml::from_str::<serde_yaml::Value>(local).is_ok();
    if local_parses && serde_yaml::from_str::<serde_yaml::Value>(&merged).is_err() {
        return MergeOutcome::kept_local(local, "yaml merge produced invalid YAML");
    }

    MergeOutcome::merged(merged)
}

fn never_overwrite(template: &str, local: &str) -> MergeOutcome {
    let local_titles: Vec<String> = headings(local)
        .into_iter()
        .map(|h| h.title.to_lowercase())
        .collect();
    let warnings = headings(template)
        .into_iter()
        .filter(|h| !local_titles.contains(&h.title.to_lowercase()))
        .map(|h| format!("template has section `{}` not present locally", h.title))
        .collect();
    MergeOutcome::merged(local.to_string()).with_warnings(warnings)
}

fn additive_merge(template: &str, local: &str, list_key: &str, id_field: &str) -> MergeOutcome {
    let local_list = match parse_entry_list(local, list_key, id_field) {
        Ok(list) => list,
        Err(e) => return MergeOutcome::kept_local(local, e.to_string()),
    };
    let template_list = match parse_entry_list(template, list_key, id_field) {
        Ok(list) => list,
        Err(_) => return MergeOutcome::merged(local.to_string()),
    };

    let local_ids: std::collections::HashSet<&str> = local_list.ids().collect();
    let mut warnings = Vec::new();
    let mut additions = String::new();
    let eol = line_ending(local);
    for entry in &template_list.entries {
        match entry.id.as_deref() {
            Some(id) if local_ids.contains(id) => {}
            Some(_) => {
                let text = entry.slice(template);
                let cut = end_of_content(text, 0, text.len());
                let mut item = reindent(&text[..cut], template_list.indent, local_list.indent);
                ensure_trailing_newline(&mut item, eol);
                additions.push_str(&item);
            }
            None => warnings.push(format!(
                "template `{list_key}` item without `{id_field}` skipped"
            )),
        }
    }

    let local_header = local_list.header(local);
    let template_header = template_list.header(template);
    let header = if local_header.trim_end() == template_header.trim_end() {
        local_header
    } else {
        template_header
    };

    let insert_at = local_list.insertion_point(local);
    let mut merged = String::with_capacity(local.len() + additions.len());
    merged.push_str(header);
    ensure_trailing_newline(&mut merged, eol);
    merged.push_str(&local[local_list.header_end..insert_at]);
    if !additions.is_empty() {
        ensure_trailing_newline(&mut merged, eol);
        merged.push_str(&additions);
    }
    merged.push_str(&local[insert_at..]);

    for entry in &local_list.entries {
        if !missing_lines(entry.slice(local), &merged, None).is_empty() {
            return MergeOutcome::kept_local(local, "additive merge would alter a local entry");
        }
    }

    MergeOutcome::merged(merged).with_warnings(warnings)
}
