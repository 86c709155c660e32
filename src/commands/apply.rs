// src/commands/apply.rs

//! Apply a descriptor to this machine.

use anyhow::{Context, Result};
use fs2::FileExt;
use outfit::apply::{ApplyCoordinator, ApplyOptions, ApplyResult};
use outfit::db;
use outfit::db::models::{ApplyRun, PrefsStore};
use outfit::sandbox::ProcessSandbox;
use outfit::sources::SourceRegistry;
use std::fs::File;
use std::time::Duration;
use tracing::info;

use super::{prepare, print_plan, print_warnings, selection_from_flags};

#[allow(clippy::too_many_arguments)]
pub fn cmd_apply(
    descriptor_path: &str,
    db_path: &str,
    inventory: Option<&str>,
    dry_run: bool,
    force: bool,
    packages_only: bool,
    prefs_only: bool,
    timeout_secs: u64,
) -> Result<i32> {
    info!(
        "Applying {} (dry_run={}, force={})",
        descriptor_path, dry_run, force
    );

    let conn = db::open(db_path).context("Failed to open state database")?;

    // One real apply at a time; dry runs take no lock since they touch
    // nothing
    let _lock = if dry_run {
        None
    } else {
        Some(acquire_lock(db_path)?)
    };

    let selection = selection_from_flags(packages_only, prefs_only);
    let prepared = prepare(descriptor_path, &conn, inventory, selection, force)?;

    let Some(plan) = prepared.plan else {
        let reason = prepared.gate.reason.as_deref().unwrap_or("incompatible");
        eprintln!("Compatibility check failed: {}", reason);
        eprintln!("Re-run with --force to override.");
        return Ok(1);
    };

    print_warnings(&plan);

    if plan.is_in_sync() {
        println!("Machine is already in sync with descriptor - no changes needed");
        return Ok(0);
    }

    println!("Apply plan:");
    println!();
    print_plan(&plan);
    println!();

    let options = ApplyOptions {
        dry_run,
        selection,
        timeout: Duration::from_secs(timeout_secs),
    };

    let registry = SourceRegistry::builtin();
    let mut executor = ProcessSandbox::new();
    let mut prefs = PrefsStore::new(&conn);

    let result = ApplyCoordinator::new(&registry).apply(&plan, &options, &mut executor, &mut prefs);
    drop(prefs);

    report_result(&result);

    if dry_run {
        println!("[Dry run - no changes made]");
        return Ok(0);
    }

    let summary = format!(
        "{} install(s), {} upgrade(s), {} downgrade(s), {} preference change(s)",
        plan.stats.installs, plan.stats.upgrades, plan.stats.downgrades, plan.stats.preference_changes
    );
    ApplyRun::from_result(&result, summary)
        .insert(&conn)
        .context("Failed to record apply history")?;

    if result.is_success() { Ok(0) } else { Ok(2) }
}

fn acquire_lock(db_path: &str) -> Result<File> {
    let lock_path = format!("{}.lock", db_path);
    let file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .with_context(|| format!("Failed to open lock file {}", lock_path))?;
    file.try_lock_exclusive().map_err(|_| {
        anyhow::anyhow!("Another apply is already running (lock: {})", lock_path)
    })?;
    Ok(file)
}

fn report_result(result: &ApplyResult) {
    println!("Results:");
    for applied in &result.succeeded {
        let tag = if applied.simulated { "simulated" } else { "ok" };
        println!("  [{}] {}", tag, applied.action.description());
    }
    for failure in &result.failed {
        let tag = if failure.unrecoverable {
            "FAILED, UNRECOVERABLE"
        } else {
            "FAILED"
        };
        println!(
            "  [{}] {}: {} ({})",
            tag,
            failure.action.description(),
            failure.message,
            failure.kind
        );
    }
    if !result.skipped.is_empty() {
        println!("  {} action(s) skipped", result.skipped.len());
    }
    if result.cancelled {
        println!("  (apply was cancelled before completion)");
    }
    println!();

    if result.unrecoverable_count() > 0 {
        eprintln!(
            "WARNING: {} action(s) could not be rolled back; host state may be inconsistent",
            result.unrecoverable_count()
        );
    }
}
