//! CLI module - Command-line interface definitions and handlers
//!
//! Uses clap v4 with derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod commands;
pub mod output;

/// Bazaar - listings marketplace search
#[derive(Parser, Debug)]
#[command(name = "bazaar")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Emit JSON on stdout and JSON logs on stderr
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: ~/.config/bazaar/config.toml, then .bazaar/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database path, overriding `database.path`
    #[arg(long, global = true, env = "BAZAAR_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the listing database
    Init(commands::init::InitArgs),

    /// Import categories and listings from a JSON catalog
    Import(commands::import::ImportArgs),

    /// Search listings
    Search(commands::search::SearchArgs),

    /// Serve newline-delimited JSON search requests on stdin
    Serve(commands::serve::ServeArgs),

    /// Show effective configuration
    Config(commands::config::ConfigArgs),
}
