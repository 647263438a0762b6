//! Text-level operations for hq-migrate
//!
//! Everything here is a pure string transformation: no filesystem access.
//!
//! - [`section`]: heading-delimited Markdown sections
//! - [`yaml_block`]: top-level YAML key blocks, scanned line by line
//! - [`entries`]: list entries of a registry document, keyed by identity
//! - [`merge`]: the merge engine and its closed set of strategies
//! - [`summary`]: advisory change descriptions for modified files
//!
//! Extraction slices the original text, so blank lines, comments, and line
//! endings inside a captured range survive byte for byte.

pub mod entries;
pub mod error;
pub mod lines;
pub mod merge;
pub mod section;
pub mod summary;
pub mod yaml_block;

pub use entries::{EntryList, ListEntry, parse_entry_list};
pub use error::{Error, Result};
pub use merge::{MergeEngine, MergeOutcome, MergeStrategy};
pub use section::{Heading, SectionSpan, find_section, headings};
pub use summary::{TextSummary, summarize_text};
pub use yaml_block::{KeyBlock, top_level_blocks};
