// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};

fn main() {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Some(Commands::Init { db_path }) => commands::cmd_init(&db_path),

        Some(Commands::Capture {
            output,
            db_path,
            inventory,
            description,
        }) => commands::cmd_capture(
            &output,
            &db_path,
            inventory.as_deref(),
            description.as_deref(),
        ),

        Some(Commands::Diff {
            descriptor,
            db_path,
            inventory,
            packages_only,
            prefs_only,
        }) => commands::cmd_diff(
            &descriptor,
            &db_path,
            inventory.as_deref(),
            packages_only,
            prefs_only,
        ),

        Some(Commands::Check {
            descriptor,
            db_path,
            inventory,
            verbose,
        }) => commands::cmd_check(&descriptor, &db_path, inventory.as_deref(), verbose),

        Some(Commands::Apply {
            descriptor,
            db_path,
            inventory,
            dry_run,
            force,
            packages_only,
            prefs_only,
            timeout_secs,
        }) => commands::cmd_apply(
            &descriptor,
            &db_path,
            inventory.as_deref(),
            dry_run,
            force,
            packages_only,
            prefs_only,
            timeout_secs,
        ),

        Some(Commands::History { db_path, limit }) => commands::cmd_history(&db_path, limit),

        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "outfit", &mut std::io::stdout());
            Ok(0)
        }

        None => {
            println!("Outfit v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'outfit --help' for usage information");
            Ok(0)
        }
    }
}
