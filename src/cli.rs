// src/cli.rs
//! CLI definitions for the APEX checker
//!
//! Only argument shapes live here; every semantic check (conflicting modes,
//! required paths, bitness token) happens in `CheckOptions::validate` so the
//! library reports it the same way.

use art_apex_check::CheckOptions;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "art-apex-check")]
#[command(author = "ART Contributors")]
#[command(version)]
#[command(about = "Check integrity of an ART APEX", long_about = None)]
pub struct Cli {
    /// APEX file input
    pub apex: PathBuf,

    /// Check as host APEX
    #[arg(long)]
    pub host: bool,

    /// Check as debug APEX
    #[arg(long)]
    pub debug: bool,

    /// List all files
    #[arg(long)]
    pub list: bool,

    /// Print directory tree
    #[arg(long)]
    pub tree: bool,

    /// Directory for temp files
    #[arg(long)]
    pub tmpdir: Option<PathBuf>,

    /// Path to debugfs
    #[arg(long)]
    pub debugfs: Option<PathBuf>,

    /// Bitness to check, 32|64|multilib|auto
    #[arg(long, default_value = "auto")]
    pub bitness: String,

    /// Rule set to use instead of the built-in one (TOML)
    #[arg(long)]
    pub rules: Option<PathBuf>,
}

impl From<Cli> for CheckOptions {
    fn from(cli: Cli) -> Self {
        Self {
            apex: cli.apex,
            host: cli.host,
            debug: cli.debug,
            list: cli.list,
            tree: cli.tree,
            bitness: cli.bitness,
            tmpdir: cli.tmpdir,
            debugfs: cli.debugfs,
            rules: cli.rules,
        }
    }
}
