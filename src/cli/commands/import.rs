//! bazaar import - Load categories and listings from a JSON catalog

use std::io::Read;
use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use tracing::info;

use crate::app::AppContext;
use crate::cli::output;
use crate::error::{BazaarError, Result};
use crate::storage::Catalog;

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Catalog file (`{"categories": [...], "listings": [...]}`), or `-` for stdin
    pub file: PathBuf,
}

pub fn run(ctx: &AppContext, args: &ImportArgs) -> Result<()> {
    let raw = if args.file.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&args.file)?
    };
    let catalog: Catalog = serde_json::from_str(&raw).map_err(|err| {
        BazaarError::InvalidRequest(format!("catalog {}: {err}", args.file.display()))
    })?;

    let db = ctx.open_database()?;
    let report = db.import_catalog(&catalog)?;
    info!(
        categories = report.categories,
        listings = report.listings,
        "catalog imported"
    );

    if ctx.json {
        return output::emit_json(&report);
    }
    println!(
        "{} Imported {} listings and {} categories",
        "✓".green().bold(),
        report.listings.to_string().bold(),
        report.categories
    );
    Ok(())
}
