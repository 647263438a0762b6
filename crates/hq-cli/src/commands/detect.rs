//! Detect command implementation

use colored::Colorize;
use hq_core::{DetectionMethod, VersionOracle};
use hq_fs::DiskFs;

use crate::context::Context;
use crate::error::Result;

/// Run the detect command
pub fn run_detect(ctx: &Context, json: bool) -> Result<()> {
    let report = VersionOracle::new(&DiskFs::new(&ctx.root)).detect();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}:    {}", "Path".dimmed(), ctx.root.display());
    let version = report.version_string();
    let version = if report.is_known() {
        version.green().bold()
    } else {
        version.yellow().bold()
    };
    println!("{}: {} ({})", "Version".dimmed(), version, report.method);

    if report.method == DetectionMethod::Inference {
        println!();
        if report.clues.is_empty() {
            println!("  {} no structural clues matched", "-".dimmed());
        }
        for clue in &report.clues {
            println!("  {} {}", "+".green(), clue);
        }
    }
    Ok(())
}
