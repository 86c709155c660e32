// src/commands/init.rs

//! Database initialization command.

use anyhow::{Context, Result};
use tracing::info;

pub fn cmd_init(db_path: &str) -> Result<i32> {
    info!("Initializing outfit database at: {}", db_path);

    outfit::db::init(db_path)
        .with_context(|| format!("Failed to initialize database at {}", db_path))?;

    println!("Database initialized successfully at: {}", db_path);
    Ok(0)
}
