//! Filesystem layer for hq-migrate
//!
//! Provides forward-slash path normalization, content checksums, atomic and
//! metadata-preserving I/O, a mockable read-only filesystem view, and the tree
//! inventory that feeds the diff engine.

pub mod checksum;
pub mod config;
pub mod constants;
pub mod error;
pub mod inventory;
pub mod io;
pub mod path;
pub mod view;

pub use config::ConfigStore;
pub use constants::HqPath;
pub use error::{Error, Result};
pub use inventory::{EntryKind, FileEntry, IgnoreSet, Inventory, TreeInventory};
pub use path::{normalize_relative, to_slash};
pub use view::{DiskFs, FileSystem, MemoryFs};
