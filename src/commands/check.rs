// src/commands/check.rs

//! Drift detection: does this machine match the descriptor?

use anyhow::{Context, Result};
use outfit::db;
use outfit::reconcile::Selection;
use tracing::info;

use super::prepare;

pub fn cmd_check(
    descriptor_path: &str,
    db_path: &str,
    inventory: Option<&str>,
    verbose: bool,
) -> Result<i32> {
    info!("Checking machine against {}", descriptor_path);

    let conn = db::open(db_path).context("Failed to open state database")?;
    let prepared = prepare(descriptor_path, &conn, inventory, Selection::all(), false)?;

    let Some(plan) = prepared.plan else {
        let reason = prepared.gate.reason.as_deref().unwrap_or("incompatible");
        eprintln!("Compatibility check failed: {}", reason);
        return Ok(1);
    };

    if plan.is_in_sync() {
        println!("OK: machine matches descriptor");
        return Ok(0);
    }

    let drift = plan.stats.total_changes();
    if verbose {
        println!("DRIFT: machine does not match descriptor");
        println!();
        for action in plan.actions.iter().filter(|a| a.is_dispatchable() || !a.is_package_action()) {
            println!("  {}", action.description());
        }
        println!();
        println!("Total: {} difference(s)", drift);
    } else {
        println!("DRIFT: {} difference(s) from descriptor", drift);
        println!("Run with --verbose for details, or 'outfit diff' for full output");
    }

    Ok(1)
}
