//! Command implementations for hq-cli

pub mod backup;
pub mod detect;
pub mod migrate;
pub mod plan;

pub use backup::{run_backup, run_list_backups, run_restore, run_verify};
pub use detect::run_detect;
pub use migrate::run_migrate;
pub use plan::run_plan;
