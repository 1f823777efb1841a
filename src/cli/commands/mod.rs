//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - `run()` function to execute the command

use crate::app::AppContext;
use crate::cli::Commands;
use crate::error::Result;

pub mod config;
pub mod import;
pub mod init;
pub mod search;
pub mod serve;

/// Dispatch a command to its handler
pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Init(args) => init::run(ctx, args),
        Commands::Import(args) => import::run(ctx, args),
        Commands::Search(args) => search::run(ctx, args),
        Commands::Serve(args) => serve::run(ctx, args),
        Commands::Config(args) => config::run(ctx, args),
    }
}
