//! Registry list entries
//!
//! Parses documents shaped like
//!
//! ```yaml
//! version: 2
//! workers:
//!   - id: dev
//!     path: workers/dev
//!   - id: qa
//! ```
//!
//! into a header (everything before the list key), the list head (key line
//! plus any comments before the first item), one slice per item, and a
//! trailer. Each item is identified by the value of an identity field.

use crate::error::{Error, Result};
use crate::lines::{Line, end_of_content, lines};
use crate::yaml_block::find_block;

/// One list item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub id: Option<String>,
    pub start: usize,
    pub end: usize,
}

impl ListEntry {
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// A parsed registry document. All ranges index the parsed source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryList {
    /// End of the header; the list key line starts here
    pub header_end: usize,
    /// Start of the first item (or end of the list block when empty)
    pub items_start: usize,
    /// End of the list block; the trailer starts here
    pub block_end: usize,
    /// Indentation of the `-` markers
    pub indent: usize,
    pub entries: Vec<ListEntry>,
}

impl EntryList {
    pub fn header<'a>(&self, source: &'a str) -> &'a str {
        &source[..self.header_end]
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|e| e.id.as_deref())
    }

    /// Offset just after the last non-blank line of the last item.
    pub fn insertion_point(&self, source: &str) -> usize {
        match self.entries.last() {
            Some(last) => end_of_content(source, last.start, last.end),
            None => end_of_content(source, self.header_end, self.items_start),
        }
    }
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn is_item_line(line: &Line<'_>, indent: usize) -> bool {
    let text = line.content();
    indent_of(text) == indent && {
        let rest = &text[indent..];
        rest == "-" || rest.starts_with("- ")
    }
}

/// Read `field: value` from an item's lines.
fn entry_id(item: &str, indent: usize, id_field: &str) -> Option<String> {
    let prefix = format!("{id_field}:");
    for (n, line) in lines(item).iter().enumerate() {
        let text = line.content();
        let body = if n == 0 {
            text.get(indent + 1..)?.trim_start()
        } else {
            text.trim_start()
        };
        if let Some(value) = body.strip_prefix(&prefix) {
            let value = value.split(" #").next().unwrap_or(value).trim();
            let value = value.trim_matches(|c| c == '"' || c == '\'');
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Parse the list stored under the top-level `list_key`.
pub fn parse_entry_list(source: &str, list_key: &str, id_field: &str) -> Result<EntryList> {
    let block = find_block(source, list_key).ok_or_else(|| Error::ListNotFound {
        key: list_key.to_string(),
    })?;
    if block.inline_value {
        return Err(Error::InlineList {
            key: list_key.to_string(),
        });
    }

    let block_lines: Vec<Line<'_>> = lines(source)
        .into_iter()
        .filter(|l| l.start > block.start && l.start < block.end)
        .collect();

    let indent = block_lines
        .iter()
        .find(|l| {
            let trimmed = l.content().trim_start();
            trimmed == "-" || trimmed.starts_with("- ")
        })
        .map(|l| indent_of(l.content()));

    let Some(indent) = indent else {
        return Ok(EntryList {
            header_end: block.start,
            items_start: block.end,
            block_end: block.end,
            indent: 2,
            entries: Vec::new(),
        });
    };

    let starts: Vec<usize> = block_lines
        .iter()
        .filter(|l| is_item_line(l, indent))
        .map(|l| l.start)
        .collect();

    let entries = starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(block.end);
            ListEntry {
                id: entry_id(&source[start..end], indent, id_field),
                start,
                end,
            }
        })
        .collect();

    Ok(EntryList {
        header_end: block.start,
        items_start: starts[0],
        block_end: block.end,
        indent,
        entries,
    })
}

/// Shift every line of an item from one marker indentation to another.
pub fn reindent(item: &str, from: usize, to: usize) -> String {
    if from == to {
        return item.to_string();
    }
    lines(item)
        .iter()
        .map(|line| {
            if line.is_blank() {
                return line.text.to_string();
            }
            let current = indent_of(line.text);
            let target = if to > from {
                current + (to - from)
            } else {
                current.saturating_sub(from - to)
            };
            format!("{}{}", " ".repeat(target), &line.text[current..])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const REGISTRY: &str = "\
# Worker registry
version: 2
workers:
  # core team
  - id: dev
    path: workers/dev

  - id: \"qa\"  # quoted
    path: workers/qa
settings:
  strict: true
";

    #[test]
    fn parses_items_header_and_trailer() {
        let list = parse_entry_list(REGISTRY, "workers", "id").unwrap();
        assert_eq!(list.header(REGISTRY), "# Worker registry\nversion: 2\n");
        assert_eq!(list.ids().collect::<Vec<_>>(), vec!["dev", "qa"]);
        assert_eq!(list.indent, 2);
        assert_eq!(
            list.entries[0].slice(REGISTRY),
            "  - id: dev\n    path: workers/dev\n\n"
        );
        assert_eq!(&REGISTRY[list.block_end..], "settings:\n  strict: true\n");
    }

    #[test]
    fn id_on_later_line() {
        let doc = "workers:\n- path: x\n  id: later\n";
        let list = parse_entry_list(doc, "workers", "id").unwrap();
        assert_eq!(list.entries[0].id.as_deref(), Some("later"));
        assert_eq!(list.indent, 0);
    }

    #[test]
    fn missing_and_inline_lists_are_errors() {
        assert!(matches!(
            parse_entry_list("a: 1\n", "workers", "id"),
            Err(Error::ListNotFound { .. })
        ));
        assert!(matches!(
            parse_entry_list("workers: []\n", "workers", "id"),
            Err(Error::InlineList { .. })
        ));
    }

    #[test]
    fn empty_list_has_no_entries() {
        let list = parse_entry_list("workers:\nother: 1\n", "workers", "id").unwrap();
        assert!(list.entries.is_empty());
    }

    #[test]
    fn insertion_point_skips_trailing_blank_lines() {
        let doc = "workers:\n  - id: a\n\n\nnext: 1\n";
        let list = parse_entry_list(doc, "workers", "id").unwrap();
        assert_eq!(list.insertion_point(doc), "workers:\n  - id: a\n".len());
    }

    #[test]
    fn reindent_shifts_lines() {
        assert_eq!(reindent("- id: a\n  x: 1\n", 0, 2), "  - id: a\n    x: 1\n");
        assert_eq!(reindent("  - id: a\n\n    x: 1\n", 2, 0), "- id: a\n\n  x: 1\n");
    }
}
