//! Line scanning helpers shared by the extractors.

/// A line of the source with its byte offset. `text` keeps its line ending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    pub start: usize,
    pub text: &'a str,
}

impl<'a> Line<'a> {
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }

    /// The line without its `\n` / `\r\n` terminator.
    pub fn content(&self) -> &'a str {
        strip_eol(self.text)
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Split into lines, keeping terminators and byte offsets.
pub fn lines(source: &str) -> Vec<Line<'_>> {
    let mut start = 0;
    source
        .split_inclusive('\n')
        .map(|text| {
            let line = Line { start, text };
            start += text.len();
            line
        })
        .collect()
}

/// Remove one trailing `\n` or `\r\n`.
pub fn strip_eol(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// The dominant line ending of a text (`\r\n` if any line uses it).
pub fn line_ending(source: &str) -> &'static str {
    if source.contains("\r\n") { "\r\n" } else { "\n" }
}

/// Append a terminator if the text does not already end with one.
pub fn ensure_trailing_newline(text: &mut String, eol: &str) {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push_str(eol);
    }
}

/// Non-blank lines of a text, without terminators.
pub fn non_blank_lines(source: &str) -> impl Iterator<Item = &str> {
    source
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .filter(|l| !l.trim().is_empty())
}

/// Lines of `block` (non-blank, at most `limit`) that do not occur verbatim in `merged`.
pub fn missing_lines<'a>(block: &'a str, merged: &str, limit: Option<usize>) -> Vec<&'a str> {
    let candidates = non_blank_lines(block);
    let candidates: Vec<&str> = match limit {
        Some(n) => candidates.take(n).collect(),
        None => candidates.collect(),
    };
    candidates
        .into_iter()
        .filter(|line| !merged.contains(line))
        .collect()
}

/// Byte offset just past the last non-blank line of `text[range]`.
pub fn end_of_content(source: &str, start: usize, end: usize) -> usize {
    lines(&source[start..end])
        .iter()
        .rev()
        .find(|l| !l.is_blank())
        .map(|l| start + l.end())
        .unwrap_or(start)
}
