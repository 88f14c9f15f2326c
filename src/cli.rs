//! Command-line argument definitions for the race processor

use crate::config::RaceConfig;
use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for the race classification processor
///
/// Fetches the stage list and per-stage classifications of a race and
/// writes per-rider series as canonical JSON and CSV tables.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tour-processor",
    version,
    about = "Flatten stage-race classifications into per-rider JSON and CSV time series"
)]
pub struct Args {
    /// Path to configuration file
    ///
    /// TOML file with any of the run settings; command-line flags override it.
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    pub config_file: Option<PathBuf>,

    /// Base URL of the race API
    #[arg(long = "base-url", value_name = "URL")]
    pub base_url: Option<String>,

    /// Race identifier in the API
    #[arg(long = "race-id", value_name = "ID")]
    pub race_id: Option<u32>,

    /// Directory for JSON snapshots and CSV tables
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output_dir: Option<PathBuf>,

    /// Build rider profiles from stage data instead of the roster
    #[arg(long = "no-roster")]
    pub no_roster: bool,

    /// Do not ask the API for the current stage
    ///
    /// Unfinished stages are then only detected through the stage id the
    /// API answers with.
    #[arg(long = "ignore-current-stage")]
    pub ignore_current_stage: bool,

    /// Skip the per-stage classification snapshots
    #[arg(long = "no-stage-snapshots")]
    pub no_stage_snapshots: bool,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors and critical messages. Overrides verbose settings.
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

impl Args {
    /// Determine the appropriate log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Check if we should show progress bars (not in quiet mode)
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }

    /// Apply command-line overrides on top of `base`
    pub fn into_config(self, base: RaceConfig) -> RaceConfig {
        let mut config = base;
        if let Some(url) = self.base_url {
            config = config.with_api_base_url(url);
        }
        if let Some(race_id) = self.race_id {
            config = config.with_race_id(race_id);
        }
        if let Some(output_dir) = self.output_dir {
            config = config.with_output_dir(output_dir);
        }
        if self.no_roster {
            config = config.without_roster();
        }
        if self.ignore_current_stage {
            config = config.without_current_stage();
        }
        if self.no_stage_snapshots {
            config = config.without_stage_snapshots();
        }
        config
    }
}
