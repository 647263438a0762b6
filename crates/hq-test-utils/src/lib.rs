//! Shared test utilities for the hq-migrate workspace.
//!
//! Dev-dependency only. Provides [`TestTree`], a temporary directory builder
//! for installation and template fixtures, and [`sample`] with a small but
//! realistic installation layout.

pub mod sample;
pub mod tree;

pub use tree::TestTree;
