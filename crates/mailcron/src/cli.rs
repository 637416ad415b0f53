//! Command line interface.
//!
//! `tick` is meant for a cron entry; `run` keeps ticking on the configured
//! interval. The remaining commands inspect or steer campaigns.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Mailcron: scheduled mailing campaigns.
#[derive(Debug, Parser)]
#[command(name = "mailcron", version, after_long_help = CRON_HELP)]
pub struct Cli {
    /// Configuration file (default: the platform config directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

const CRON_HELP: &str = r"Cron example (one tick every five minutes):
  */5 * * * * mailcron --config /etc/mailcron.toml tick

Daemon example:
  mailcron --config /etc/mailcron.toml run --interval 300";

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one tick: update statuses, then mail every due recipient.
    Tick,

    /// Tick on a fixed interval until interrupted.
    Run {
        /// Seconds between ticks (overrides `schedule.interval_secs`).
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Show campaign counts by status and the number of recipients.
    Status,

    /// List delivery attempts, newest first.
    Log {
        /// Only attempts for this campaign.
        #[arg(long)]
        campaign: Option<i64>,

        /// Maximum number of entries.
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },

    /// Mark a campaign finished. The next tick recomputes it from its window.
    Stop {
        /// Campaign id.
        id: i64,
    },

    /// Put a campaign back into the created state.
    Restart {
        /// Campaign id.
        id: i64,
    },
}
