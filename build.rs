// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: database path
fn db_path_arg() -> Arg {
    Arg::new("db_path")
        .short('d')
        .long("db-path")
        .value_name("PATH")
        .default_value("/var/lib/outfit/outfit.db")
        .help("Database path")
}

/// Common argument: descriptor file path
fn descriptor_arg() -> Arg {
    Arg::new("descriptor")
        .short('m')
        .long("descriptor")
        .default_value("/etc/outfit/machine.toml")
        .help("Machine descriptor file")
}

/// Common argument: inventory snapshot file
fn inventory_arg() -> Arg {
    Arg::new("inventory")
        .long("inventory")
        .help("Inventory snapshot file for the observed package state")
}

fn build_cli() -> Command {
    Command::new("outfit")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Outfit Contributors")
        .about("Capture a machine's state and reconcile other machines against it")
        .subcommand_required(false)
        .subcommand(
            Command::new("init")
                .about("Initialize the outfit state database")
                .arg(db_path_arg()),
        )
        .subcommand(
            Command::new("capture")
                .about("Capture this machine's state into a descriptor file")
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .default_value("/etc/outfit/machine.toml")
                        .help("Where to write the descriptor"),
                )
                .arg(db_path_arg())
                .arg(inventory_arg()),
        )
        .subcommand(
            Command::new("diff")
                .about("Show the changes needed to reach a descriptor's state")
                .arg(descriptor_arg())
                .arg(db_path_arg())
                .arg(inventory_arg())
                .arg(
                    Arg::new("packages_only")
                        .long("packages-only")
                        .action(clap::ArgAction::SetTrue)
                        .help("Only diff package state"),
                )
                .arg(
                    Arg::new("prefs_only")
                        .long("prefs-only")
                        .action(clap::ArgAction::SetTrue)
                        .help("Only diff preference state"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Check whether this machine matches a descriptor")
                .arg(descriptor_arg())
                .arg(db_path_arg())
                .arg(inventory_arg()),
        )
        .subcommand(
            Command::new("apply")
                .about("Apply a descriptor to this machine")
                .arg(descriptor_arg())
                .arg(db_path_arg())
                .arg(inventory_arg())
                .arg(
                    Arg::new("dry_run")
                        .long("dry-run")
                        .action(clap::ArgAction::SetTrue)
                        .help("Show what would be applied without making changes"),
                )
                .arg(
                    Arg::new("force")
                        .long("force")
                        .action(clap::ArgAction::SetTrue)
                        .help("Bypass the compatibility gate's version check"),
                ),
        )
        .subcommand(
            Command::new("history")
                .about("Show recorded apply runs")
                .arg(db_path_arg()),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "zsh", "fish", "powershell"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("outfit.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
        return;
    }
}
