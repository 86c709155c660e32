// src/commands/history.rs

//! List recorded apply runs.

use anyhow::{Context, Result};
use outfit::db;
use outfit::db::models::ApplyRun;
use tracing::info;

pub fn cmd_history(db_path: &str, limit: i64) -> Result<i32> {
    info!("Listing apply history...");

    let conn = db::open(db_path).context("Failed to open state database")?;
    let runs = ApplyRun::list_recent(&conn, limit)?;

    if runs.is_empty() {
        println!("No apply runs recorded.");
        println!("\nRuns are recorded automatically after each real apply.");
        return Ok(0);
    }

    println!("Apply history:");
    println!(
        "{:>4}  {:19}  {:>9}  {:>6}  {:>7}  SUMMARY",
        "ID", "STARTED", "SUCCEEDED", "FAILED", "SKIPPED"
    );
    println!("{}", "-".repeat(76));

    for run in &runs {
        // Truncate RFC 3339 timestamps to the date/time portion
        let started = if run.started_at.len() > 19 {
            &run.started_at[..19]
        } else {
            &run.started_at
        };
        let unrecoverable_marker = if run.unrecoverable > 0 { "!" } else { " " };

        println!(
            "{:>4}{} {:19}  {:>9}  {:>6}  {:>7}  {}",
            run.id.unwrap_or(0),
            unrecoverable_marker,
            started,
            run.succeeded,
            run.failed,
            run.skipped,
            run.summary
        );
    }

    println!();
    println!("! = contains unrecoverable failures");
    println!("Total: {} run(s)", runs.len());

    Ok(0)
}
