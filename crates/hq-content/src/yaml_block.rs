//! Top-level YAML key blocks
//!
//! A block starts at an unindented `key:` line and runs until the next
//! unindented key, a document marker (`---` / `...`), or the end of the text.
//! Indented continuation lines, block scalars, blank lines and comments inside
//! that range belong to the block.

use crate::lines::lines;

/// One top-level key and the byte range of its block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBlock {
    pub key: String,
    pub start: usize,
    pub end: usize,
    /// True when the value follows the colon on the key line (`key: value`).
    pub inline_value: bool,
}

impl KeyBlock {
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// Parse a top-level key line, returning the key and whether a value follows inline.
pub fn parse_key_line(line: &str) -> Option<(String, bool)> {
    let line = crate::lines::strip_eol(line);
    let first = line.chars().next()?;
    if first.is_whitespace() || matches!(first, '#' | '-' | '[' | '{' | '|' | '>') {
        return None;
    }
    let colon = find_key_colon(line)?;
    let key = line[..colon].trim().trim_matches(|c| c == '"' || c == '\'');
    if key.is_empty() {
        return None;
    }
    let rest = line[colon + 1..].trim();
    let inline = !rest.is_empty() && !rest.starts_with('#') && !is_block_indicator(rest);
    Some((key.to_string(), inline))
}

/// Position of the colon that ends a mapping key, skipping quoted keys.
fn find_key_colon(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut quote: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate() {
        match (quote, b) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') if i == 0 => quote = Some(b),
            (None, b':') if bytes.get(i + 1).is_none_or(|n| *n == b' ' || *n == b'\t') => {
                return Some(i);
            }
            _ => {}
        }
    }
    None
}

fn is_block_indicator(rest: &str) -> bool {
    let head = rest.split_whitespace().next().unwrap_or("");
    head.starts_with('|') || head.starts_with('>')
}

fn is_document_marker(line: &str) -> bool {
    let line = crate::lines::strip_eol(line);
    line == "---" || line == "..." || line.starts_with("--- ")
}

/// Every top-level key block, in document order.
pub fn top_level_blocks(source: &str) -> Vec<KeyBlock> {
    let mut blocks: Vec<KeyBlock> = Vec::new();
    let mut open: Option<KeyBlock> = None;

    for line in lines(source) {
        let boundary = is_document_marker(line.text);
        let key = if boundary { None } else { parse_key_line(line.text) };

        if boundary || key.is_some() {
            if let Some(mut block) = open.take() {
                block.end = line.start;
                blocks.push(block);
            }
        }
        if let Some((key, inline_value)) = key {
            open = Some(KeyBlock {
                key,
                start: line.start,
                end: source.len(),
                inline_value,
            });
        }
    }
    if let Some(block) = open {
        blocks.push(block);
    }
    blocks
}

/// The block for `key`, if present.
pub fn find_block(source: &str, key: &str) -> Option<KeyBlock> {
    top_level_blocks(source).into_iter().find(|b| b.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WORKER: &str = "\
id: dev
name: Developer
instructions: |
  Line one.

  # not a key, indented comment
  Line two.
# top comment
tools:
  - read
  - write
";

    #[test]
    fn splits_blocks_at_unindented_keys() {
        let blocks = top_level_blocks(WORKER);
        let keys: Vec<&str> = blocks.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["id", "name", "instructions", "tools"]);
        assert_eq!(
            blocks[2].slice(WORKER),
            "instructions: |\n  Line one.\n\n  # not a key, indented comment\n  Line two.\n# top comment\n"
        );
        assert!(!blocks[2].inline_value);
        assert!(blocks[0].inline_value);
        assert_eq!(blocks[3].end, WORKER.len());
    }

    #[test]
    fn quoted_keys_and_urls() {
        assert_eq!(
            parse_key_line("\"odd: key\": 1\n"),
            Some(("odd: key".to_string(), true))
        );
        assert_eq!(
            parse_key_line("url: https://example.com\n"),
            Some(("url".to_string(), true))
        );
        assert_eq!(parse_key_line("- item: x"), None);
        assert_eq!(parse_key_line("  nested: x"), None);
    }

    #[test]
    fn document_marker_closes_block() {
        let doc = "a: 1\n---\nb: 2\n";
        let blocks = top_level_blocks(doc);
        assert_eq!(blocks[0].slice(doc), "a: 1\n");
        assert_eq!(blocks[1].key, "b");
    }

    #[test]
    fn find_block_by_key() {
        assert!(find_block(WORKER, "tools").is_some());
        assert!(find_block(WORKER, "missing").is_none());
    }
}
