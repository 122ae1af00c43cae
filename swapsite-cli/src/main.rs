//! swapsite: rebuild a static site on webhook delivery and swap it live.
//!
//! # Usage
//!
//! ```text
//! swapsite serve [--defaults <path>] [--settings <path>]
//! swapsite check-config [--defaults <path>] [--settings <path>]
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use commands::{check_config::CheckConfigArgs, serve::ServeArgs};
use swapsite_core::settings::{self, Settings, DEFAULT_SETTINGS_PATH, SETTINGS_PATH};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "swapsite",
    version,
    about = "Blue-green rebuild server for a git-backed static site",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the site once, then serve it and rebuild on webhook delivery.
    Serve(ServeArgs),

    /// Load, merge and validate settings, then print them with secrets masked.
    CheckConfig(CheckConfigArgs),
}

// ---------------------------------------------------------------------------
// Shared settings location
// ---------------------------------------------------------------------------

/// Where the defaults file and its optional overrides live.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Required base settings file.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_SETTINGS_PATH)]
    pub defaults: PathBuf,

    /// Optional overrides, merged over the defaults when present.
    #[arg(long, value_name = "PATH", default_value = SETTINGS_PATH)]
    pub settings: PathBuf,
}

impl ConfigArgs {
    pub fn load(&self) -> Result<Settings> {
        settings::load_at(&self.defaults, &self.settings).with_context(|| {
            format!(
                "failed to load settings from '{}' (overrides '{}')",
                self.defaults.display(),
                self.settings.display()
            )
        })
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => args.run(),
        Commands::CheckConfig(args) => args.run(),
    }
}
