use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use backup_codec::{backup_filename, export_store, import_document, BackupFormat};
use chrono::Local;
use clap::Parser;
use tokio::signal::unix::SignalKind;
use tokio::time::{self, MissedTickBehavior};
use watchlist_core::{Direction, NotificationLog, WatchlistRepository};
use watchlist_monitor::analysis::{analyze, suggest_target};
use watchlist_monitor::render::{
    render_cycle, render_entries, render_notifications, render_stats,
};
use watchlist_monitor::{run_cycle, MonitorConfig, MonitorContext};

mod cli;

use cli::{AddArgs, Cli, Command, ExportArgs};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        tracing::error!("PANIC: {info}");
    }));

    let cli = Cli::parse();

    let mut config = MonitorConfig::from_env()?;
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }

    let mut ctx = MonitorContext::connect(&config).await?;

    match cli.command {
        Command::Add(args) => add(&ctx, args).await?,
        Command::Remove { symbol, direction } => {
            ctx.repo.remove(&symbol, direction).await?;
            println!("Removed {} from {} watchlist", symbol, direction);
        }
        Command::List { direction } => {
            for direction in Command::directions(direction) {
                let entries = ctx.repo.list(direction).await?;
                print!("{}", render_entries(direction, &entries));
            }
        }
        Command::Stats => {
            let stats = ctx.repo.stats().await?;
            print!("{}", render_stats(&stats));
        }
        Command::Analyze { symbol } => {
            let report = analyze(ctx.prices.as_ref(), &symbol).await?;
            println!("{}", report);
        }
        Command::Refresh { direction } => {
            refresh(&mut ctx, &Command::directions(direction)).await?;
        }
        Command::Watch {
            interval,
            direction,
        } => {
            let every = interval
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.refresh_interval());
            watch(&mut ctx, every, &Command::directions(direction)).await?;
        }
        Command::Export(args) => export(&ctx, args).await?,
        Command::Import { path } => import(&ctx, &path).await?,
        Command::Recent { hours } => {
            let records = ctx.log.recent_notifications(hours).await?;
            print!("{}", render_notifications(&records, hours));
        }
    }

    Ok(())
}

async fn add(ctx: &MonitorContext, args: AddArgs) -> Result<()> {
    let target = match args.target {
        Some(target) => target,
        None => {
            let suggestion = suggest_target(ctx.prices.as_ref(), &args.symbol, args.direction)
                .await
                .with_context(|| format!("Could not load price history for {}", args.symbol))?;
            let Some(suggestion) = suggestion else {
                bail!(
                    "No technical level found for {}; pass --target",
                    args.symbol
                );
            };
            let Some(price) = suggestion.target_price() else {
                bail!("Technical level for {} is not a valid price", args.symbol);
            };
            println!("Using {}", suggestion.describe());
            price
        }
    };

    let entry = ctx.repo.add(&args.symbol, target, args.direction).await?;
    println!(
        "Added {} to {} watchlist at ₹{:.2}",
        entry.symbol,
        entry.direction,
        entry.target_price.round_dp(2)
    );
    Ok(())
}

async fn refresh(ctx: &mut MonitorContext, directions: &[Direction]) -> Result<()> {
    for &direction in directions {
        let report = run_cycle(ctx, direction).await?;
        print!("{}", render_cycle(&report));
    }
    Ok(())
}

/// Refresh on a fixed tick until SIGINT or SIGTERM. A failed cycle is logged
/// and the next tick tries again.
async fn watch(ctx: &mut MonitorContext, every: Duration, directions: &[Direction]) -> Result<()> {
    tracing::info!(
        "Watching {} watchlist(s) every {}s ({} alerts)",
        directions.len(),
        every.as_secs(),
        ctx.channel().as_str()
    );

    let mut interval = time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut sigterm = tokio::signal::unix::signal(SignalKind::terminate())?;
    let shutdown = async {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received SIGINT");
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM");
            }
        }
    };
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = refresh(ctx, directions).await {
                    tracing::error!("Error in refresh cycle: {:#}", e);
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received, stopping watch");
                break;
            }
        }
    }

    Ok(())
}

async fn export(ctx: &MonitorContext, args: ExportArgs) -> Result<()> {
    let text = export_store(ctx.repo.as_ref(), args.format).await?;
    let path = args
        .output
        .unwrap_or_else(|| backup_filename(&args.prefix, args.format, Local::now()).into());
    tokio::fs::write(&path, text)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Exported watchlist to {}", path.display());
    Ok(())
}

async fn import(ctx: &MonitorContext, path: &Path) -> Result<()> {
    let format = BackupFormat::from_path(path)?;
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let report = import_document(ctx.repo.as_ref(), format, &text).await?;
    println!(
        "Imported {} entries, {} failed",
        report.success_count, report.failure_count
    );
    for error in &report.errors {
        println!("  {}", error);
    }
    Ok(())
}
