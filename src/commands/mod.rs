// src/commands/mod.rs

//! Command implementations for the outfit CLI.
//!
//! Every command returns its process exit code: 0 for success or
//! no-changes-needed, 1 for a compatibility failure (or drift, for
//! `check`), 2 when one or more actions failed during apply.

mod apply;
mod capture;
mod check;
mod diff;
mod history;
mod init;

pub use apply::cmd_apply;
pub use capture::cmd_capture;
pub use check::cmd_check;
pub use diff::cmd_diff;
pub use history::cmd_history;
pub use init::cmd_init;

use anyhow::{Context, Result};
use outfit::descriptor::{parse_descriptor_file, MachineDescriptor};
use outfit::db::models::PrefsStore;
use outfit::gate::{self, CompatibilityResult};
use outfit::host::HostInfo;
use outfit::reconcile::{
    compute_diff, DiffOptions, ReconcileAction, ReconciliationPlan, Selection,
};
use outfit::snapshot::{load_snapshot, PackageSnapshot};
use outfit::sources::SourceRegistry;
use rusqlite::Connection;
use std::path::Path;

/// Everything diff/check/apply share: descriptor, host facts, gate
/// outcome, and the plan (absent when the gate rejected the descriptor)
pub(crate) struct Prepared {
    pub descriptor: MachineDescriptor,
    pub gate: CompatibilityResult,
    pub plan: Option<ReconciliationPlan>,
}

/// Load inputs, run the gate, and diff if the gate allows it
pub(crate) fn prepare(
    descriptor_path: &str,
    conn: &Connection,
    inventory: Option<&str>,
    selection: Selection,
    force: bool,
) -> Result<Prepared> {
    let descriptor_path = Path::new(descriptor_path);
    if !descriptor_path.exists() {
        anyhow::bail!(
            "Descriptor file not found: {}\nCreate one with 'outfit capture' first",
            descriptor_path.display()
        );
    }

    let descriptor = parse_descriptor_file(descriptor_path)
        .with_context(|| format!("Failed to load descriptor {}", descriptor_path.display()))?;

    let registry = SourceRegistry::builtin();
    let host = HostInfo::detect(&registry);
    let gate_result = gate::check(&descriptor, &host, force);

    if !gate_result.compatible {
        return Ok(Prepared {
            descriptor,
            gate: gate_result,
            plan: None,
        });
    }

    let desired = descriptor.desired_snapshot()?;
    let observed = load_observed(inventory)?;
    let prefs_observed = PrefsStore::new(conn)
        .get_all()
        .context("Failed to read preference store")?;

    let plan = compute_diff(
        &desired,
        &observed,
        &descriptor.preferences,
        &prefs_observed,
        &gate_result,
        &DiffOptions { selection },
    );

    Ok(Prepared {
        descriptor,
        gate: gate_result,
        plan: Some(plan),
    })
}

/// Observed package state: a saved inventory file, or empty when the
/// caller has nothing enumerated yet (a fresh machine)
pub(crate) fn load_observed(inventory: Option<&str>) -> Result<PackageSnapshot> {
    match inventory {
        Some(path) => load_snapshot(Path::new(path))
            .with_context(|| format!("Failed to load inventory {}", path)),
        None => Ok(PackageSnapshot::empty()),
    }
}

pub(crate) fn selection_from_flags(packages_only: bool, prefs_only: bool) -> Selection {
    if packages_only {
        Selection::packages_only()
    } else if prefs_only {
        Selection::preferences_only()
    } else {
        Selection::all()
    }
}

/// Print gate and diff warnings, prefixed the same way
pub(crate) fn print_warnings(plan: &ReconciliationPlan) {
    let warnings: Vec<&String> = plan.gate.warnings.iter().chain(plan.warnings.iter()).collect();
    if warnings.is_empty() {
        return;
    }
    println!("Warnings:");
    for warning in warnings {
        println!("  ! {}", warning);
    }
    println!();
}

/// Print a plan grouped by action type
pub(crate) fn print_plan(plan: &ReconciliationPlan) {
    let installs: Vec<_> = plan
        .actions
        .iter()
        .filter(|a| matches!(a, ReconcileAction::Install(_)))
        .collect();
    let upgrades: Vec<_> = plan
        .actions
        .iter()
        .filter(|a| matches!(a, ReconcileAction::Upgrade { .. }))
        .collect();
    let downgrades: Vec<_> = plan
        .actions
        .iter()
        .filter(|a| matches!(a, ReconcileAction::Downgrade { .. }))
        .collect();
    let prefs: Vec<_> = plan
        .actions
        .iter()
        .filter(|a| matches!(a, ReconcileAction::PreferenceChange { .. }))
        .collect();

    if !installs.is_empty() {
        println!("To install ({}):", installs.len());
        for action in &installs {
            println!("  + {}", action.description());
        }
        println!();
    }

    if !upgrades.is_empty() {
        println!("To upgrade ({}):", upgrades.len());
        for action in &upgrades {
            println!("  ^ {}", action.description());
        }
        println!();
    }

    if !downgrades.is_empty() {
        println!("To downgrade ({}):", downgrades.len());
        for action in &downgrades {
            println!("  v {}", action.description());
        }
        println!();
    }

    if !prefs.is_empty() {
        println!("Preference changes ({}):", prefs.len());
        for action in &prefs {
            println!("  * {}", action.description());
        }
        println!();
    }

    println!(
        "Summary: {} install(s), {} upgrade(s), {} downgrade(s), {} in sync, {} preference change(s)",
        plan.stats.installs,
        plan.stats.upgrades,
        plan.stats.downgrades,
        plan.stats.noops,
        plan.stats.preference_changes
    );
}
