//! bazaar init - Create the listing database

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output;
use crate::error::Result;
use crate::storage::Database;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Delete an existing database and start empty
    #[arg(long, short)]
    pub force: bool,
}

pub fn run(ctx: &AppContext, args: &InitArgs) -> Result<()> {
    let path = &ctx.db_path;
    let existed = path.exists();

    if existed && args.force {
        remove_database(path)?;
    }

    let db = Database::open(path)?;
    let created = !existed || args.force;

    if ctx.json {
        return output::emit_json(&serde_json::json!({
            "status": "ok",
            "path": path.display().to_string(),
            "created": created,
            "schema_version": db.schema_version(),
        }));
    }

    if created {
        println!("{} Initialized database at {}", "✓".green().bold(), path.display());
    } else {
        println!("{} Already initialized at {}", "!".yellow(), path.display());
        println!("  Use --force to start over");
    }
    Ok(())
}

/// Remove the database file together with its WAL side files.
fn remove_database(path: &Path) -> Result<()> {
    for suffix in ["", "-wal", "-shm"] {
        let mut candidate = path.as_os_str().to_owned();
        candidate.push(suffix);
        let candidate = PathBuf::from(candidate);
        if candidate.exists() {
            fs::remove_file(&candidate)?;
        }
    }
    Ok(())
}
