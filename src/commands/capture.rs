// src/commands/capture.rs

//! Capture the current machine state into a descriptor file.

use anyhow::{Context, Result};
use chrono::Utc;
use outfit::db;
use outfit::db::models::PrefsStore;
use outfit::descriptor::MachineDescriptor;
use outfit::host::{self, HostInfo};
use outfit::sources::SourceRegistry;
use tracing::info;

use super::load_observed;

pub fn cmd_capture(
    output: &str,
    db_path: &str,
    inventory: Option<&str>,
    description: Option<&str>,
) -> Result<i32> {
    info!("Capturing machine state to {}", output);

    let conn = db::open(db_path).context("Failed to open state database")?;
    let observed = load_observed(inventory)?;
    let preferences = PrefsStore::new(&conn)
        .get_all()
        .context("Failed to read preference store")?;

    let registry = SourceRegistry::builtin();
    let host_info = HostInfo::detect(&registry);

    let mut descriptor = MachineDescriptor::new(host::tool_version_tag(), host_info.os_tag);
    descriptor.meta.created_at = Some(Utc::now());
    descriptor.packages = observed.records().to_vec();
    descriptor.preferences = preferences;

    // Header comment block, then the descriptor body
    let mut content = String::new();
    content.push_str("# Outfit machine descriptor\n");
    content.push_str("# Generated from current machine state\n");
    if let Some(desc) = description {
        content.push_str(&format!("# Description: {}\n", desc));
    }
    content.push_str(&format!(
        "# Generated at: {}\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    content.push_str("#\n");
    content.push_str("# Edit this file to define the desired machine state,\n");
    content.push_str("# then run 'outfit apply' on the target machine.\n");
    content.push('\n');
    content.push_str(&descriptor.to_toml()?);

    std::fs::write(output, &content)
        .with_context(|| format!("Failed to write descriptor to {}", output))?;

    println!("Descriptor written to: {}", output);
    println!();
    println!("Captured:");
    println!("  - {} package(s)", descriptor.packages.len());
    println!("  - {} preference(s)", descriptor.preferences.len());
    if inventory.is_none() {
        println!();
        println!("No inventory file given; the package list is empty.");
        println!("Pass --inventory <file> to capture installed packages.");
    }
    println!();
    println!("Preview changes on a target machine with:");
    println!("  outfit diff -m {}", output);

    Ok(0)
}
