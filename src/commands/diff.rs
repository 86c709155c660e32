// src/commands/diff.rs

//! Show the reconciliation plan for a descriptor.

use anyhow::{Context, Result};
use outfit::db;
use tracing::info;

use super::{prepare, print_plan, print_warnings, selection_from_flags};

pub fn cmd_diff(
    descriptor_path: &str,
    db_path: &str,
    inventory: Option<&str>,
    packages_only: bool,
    prefs_only: bool,
) -> Result<i32> {
    info!("Computing diff against {}", descriptor_path);

    let conn = db::open(db_path).context("Failed to open state database")?;
    let selection = selection_from_flags(packages_only, prefs_only);
    let prepared = prepare(descriptor_path, &conn, inventory, selection, false)?;

    let Some(plan) = prepared.plan else {
        let reason = prepared.gate.reason.as_deref().unwrap_or("incompatible");
        eprintln!("Compatibility check failed: {}", reason);
        eprintln!("Re-run apply with --force to override.");
        return Ok(1);
    };

    print_warnings(&plan);

    if !prepared.descriptor.environment.is_empty() {
        println!(
            "Note: descriptor lists {} environment variable(s); these are advisory and never applied.",
            prepared.descriptor.environment.len()
        );
        println!();
    }

    if plan.is_in_sync() {
        println!("Machine is in sync with descriptor - no changes needed");
        return Ok(0);
    }

    println!("Changes needed to reach descriptor state:");
    println!();
    print_plan(&plan);

    Ok(0)
}
