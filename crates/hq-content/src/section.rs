//! Markdown section extraction
//!
//! A section starts at its ATX heading line and runs up to, not including, the
//! next heading of the same or a higher level (fewer `#`), or the end of the
//! text. Headings inside fenced code blocks do not count.

use crate::lines::{Line, lines};

/// An ATX heading found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// Number of leading `#` (1-6)
    pub level: usize,
    pub title: String,
    /// Byte offset of the heading line
    pub start: usize,
}

/// Byte range of a section, heading line included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSpan {
    pub start: usize,
    pub end: usize,
    pub level: usize,
}

impl SectionSpan {
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Searching,
    InSection { start: usize, level: usize },
    Done { start: usize, end: usize, level: usize },
}

/// Parse a heading line, returning `(level, title)`.
pub fn parse_heading(line: &str) -> Option<(usize, &str)> {
    let line = crate::lines::strip_eol(line);
    let level = line.bytes().take_while(|b| *b == b'#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &line[level..];
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }
    let title = rest.trim().trim_end_matches('#').trim_end();
    Some((level, title))
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

/// Visit every line with a flag telling whether it is a real heading.
fn scan<'a>(source: &'a str) -> impl Iterator<Item = (Line<'a>, Option<(usize, &'a str)>)> {
    let mut in_fence = false;
    lines(source).into_iter().map(move |line| {
        if is_fence(line.text) {
            in_fence = !in_fence;
            return (line, None);
        }
        if in_fence {
            (line, None)
        } else {
            (line, parse_heading(line.text))
        }
    })
}

/// All headings outside code fences, in document order.
pub fn headings(source: &str) -> Vec<Heading> {
    scan(source)
        .filter_map(|(line, heading)| {
            heading.map(|(level, title)| Heading {
                level,
                title: title.to_string(),
                start: line.start,
            })
        })
        .collect()
}

/// Locate the first section whose heading title equals `title`
/// (case-insensitive, surrounding whitespace ignored).
pub fn find_section(source: &str, title: &str) -> Option<SectionSpan> {
    let wanted = title.trim();
    let mut state = ScanState::Searching;

    for (line, heading) in scan(source) {
        state = match (state, heading) {
            (ScanState::Searching, Some((level, t))) if t.eq_ignore_ascii_case(wanted) => {
                ScanState::InSection {
                    start: line.start,
                    level,
                }
            }
            (ScanState::InSection { start, level }, Some((next, _))) if next <= level => {
                ScanState::Done {
                    start,
                    end: line.start,
                    level,
                }
            }
            (s, _) => s,
        };
        if matches!(state, ScanState::Done { .. }) {
            break;
        }
    }

    match state {
        ScanState::Searching => None,
        ScanState::InSection { start, level } => Some(SectionSpan {
            start,
            end: source.len(),
            level,
        }),
        ScanState::Done { start, end, level } => Some(SectionSpan { start, end, level }),
    }
}

/// The text of a section, heading included.
pub fn extract_section<'a>(source: &'a str, title: &str) -> Option<&'a str> {
    find_section(source, title).map(|span| span.slice(source))
}
