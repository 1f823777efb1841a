//! Application context shared by CLI commands.

use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::Cli;
use crate::config::Config;
use crate::error::{BazaarError, Result};
use crate::search::{SearchCache, SearchService};
use crate::storage::Database;

/// Resolved configuration and paths for one CLI invocation.
#[derive(Debug, Clone)]
pub struct AppContext {
    /// Project root: relative database paths resolve against it.
    pub root: PathBuf,
    pub config: Config,
    pub db_path: PathBuf,
    pub json: bool,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let root = std::env::current_dir()?;
        let config = Config::load(cli.config.as_deref(), &root)?;
        let configured = cli.db.clone().unwrap_or_else(|| config.database.path.clone());
        let db_path = if configured.is_relative() {
            root.join(configured)
        } else {
            configured
        };
        Ok(Self {
            root,
            config,
            db_path,
            json: cli.json,
        })
    }

    /// Open the listing database, which must already exist.
    pub fn open_database(&self) -> Result<Database> {
        if !self.db_path.exists() {
            return Err(BazaarError::NotFound(format!(
                "database {} (run `bazaar init` first)",
                self.db_path.display()
            )));
        }
        Database::open(&self.db_path)
    }

    /// A search service with a fresh process-local token cache.
    pub fn search_service(&self) -> Result<SearchService> {
        let cache = Arc::new(SearchCache::new(&self.config.cache)?);
        Ok(SearchService::new(&self.config.search, cache))
    }
}
