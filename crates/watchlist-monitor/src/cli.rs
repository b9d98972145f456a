//! Command-line interface for the NSE watchlist.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `add` | Track a symbol against a target price |
//! | `remove` | Stop tracking a symbol |
//! | `list` | Show stored entries |
//! | `stats` | Count entries per watchlist |
//! | `analyze` | Print support and resistance levels |
//! | `refresh` | Evaluate the watchlists once |
//! | `watch` | Evaluate on a timer until Ctrl-C |
//! | `export` | Write a JSON or CSV backup |
//! | `import` | Load a JSON or CSV backup |
//! | `recent` | Show recently logged alerts |

use backup_codec::{BackupFormat, DEFAULT_PREFIX};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use watchlist_core::{parse_target_price, Direction, Symbol, MAX_LOOKBACK_HOURS};

#[derive(Debug, Parser)]
#[command(
    name = "watchlist",
    version,
    about = "Track NSE stocks against buy and sell targets"
)]
pub struct Cli {
    /// Overrides DATABASE_URL.
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add a symbol to the buy or sell watchlist.
    Add(AddArgs),

    /// Remove a symbol from a watchlist.
    Remove {
        symbol: Symbol,
        #[arg(long, short)]
        direction: Direction,
    },

    /// List stored entries.
    List {
        /// Only this watchlist (buy or sell).
        #[arg(long, short)]
        direction: Option<Direction>,
    },

    /// Show entry counts.
    Stats,

    /// Print support and resistance levels from recent daily bars.
    Analyze { symbol: Symbol },

    /// Fetch prices, classify, and send alerts once.
    Refresh {
        #[arg(long, short)]
        direction: Option<Direction>,
    },

    /// Refresh repeatedly until interrupted.
    Watch {
        /// Seconds between refreshes; defaults to REFRESH_INTERVAL_SECS.
        #[arg(long)]
        interval: Option<u64>,

        #[arg(long, short)]
        direction: Option<Direction>,
    },

    /// Export active entries to a backup file.
    Export(ExportArgs),

    /// Import entries from a backup file (format taken from the extension).
    Import { path: PathBuf },

    /// Show alerts logged in the last few hours.
    Recent {
        #[arg(
            long,
            default_value_t = 24,
            value_parser = clap::value_parser!(i64).range(1..=MAX_LOOKBACK_HOURS)
        )]
        hours: i64,
    },
}

#[derive(Debug, Args)]
pub struct AddArgs {
    pub symbol: Symbol,

    /// Target price; omitted means the nearest technical level.
    #[arg(long, short, value_parser = parse_target_price)]
    pub target: Option<Decimal>,

    #[arg(long, short)]
    pub direction: Direction,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// json or csv.
    #[arg(long, short, default_value = "json")]
    pub format: BackupFormat,

    /// Output path; defaults to a timestamped file in the working directory.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_PREFIX)]
    pub prefix: String,
}

impl Command {
    /// Watchlists a command applies to; `None` means both.
    pub fn directions(filter: Option<Direction>) -> Vec<Direction> {
        match filter {
            Some(direction) => vec![direction],
            None => Direction::ALL.to_vec(),
        }
    }
}
