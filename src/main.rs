use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, TimeZone};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use trade_journal_analytics::analytics::{analyze_position, summarize_positions};
use trade_journal_analytics::config::{load_config, render_config, AnalyticsConfig};
use trade_journal_analytics::filter::{DateRange, FilterCriteria};
use trade_journal_analytics::report::{render_positions, render_report};
use trade_journal_analytics::source::JsonSnapshotSource;
use trade_journal_analytics::store::AnalyticsStore;
use trade_journal_analytics::types::{Strategy, SymbolPosition};

#[derive(Parser)]
#[command(name = "journal-analytics")]
#[command(version)]
#[command(about = "Performance analytics over a day-trading journal export", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (TOML, optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter a journal snapshot and print totals, profit analysis and groupings
    Report {
        /// Journal snapshot JSON file
        snapshot: PathBuf,
        /// First trading day (YYYY-MM-DD, configured time zone)
        #[arg(short, long)]
        start: Option<String>,
        /// Last trading day (YYYY-MM-DD, configured time zone)
        #[arg(short, long)]
        end: Option<String>,
        /// Account to include (repeatable; defaults to every account in the snapshot)
        #[arg(short, long)]
        account: Vec<String>,
        /// Direction to include: long or short (repeatable; defaults to both)
        #[arg(short, long)]
        position: Vec<String>,
        /// Tag id to select (repeatable; "no_tag" disables the tag filter)
        #[arg(short, long)]
        tag: Vec<String>,
        /// Print the full analytics state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Risk and reward of open bracket positions
    Positions {
        /// JSON file holding an array of positions
        file: PathBuf,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs)?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Report {
            snapshot,
            start,
            end,
            account,
            position,
            tag,
            json,
        } => {
            run_report(config, &snapshot, start, end, account, position, tag, json).await?;
        }
        Commands::Positions { file, json } => {
            run_positions(&file, json).await?;
        }
        Commands::Config => {
            print!("{}", render_config(&config)?);
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.as_str()));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn parse_day(value: &str, tz: Tz) -> Result<i64> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{}', expected YYYY-MM-DD", value))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("invalid date '{}'", value))?;
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.timestamp())
        .ok_or_else(|| anyhow!("'{}' has no midnight in {}", value, tz))
}

#[allow(clippy::too_many_arguments)]
async fn run_report(
    config: AnalyticsConfig,
    snapshot: &Path,
    start: Option<String>,
    end: Option<String>,
    accounts: Vec<String>,
    positions: Vec<String>,
    tags: Vec<String>,
    json: bool,
) -> Result<()> {
    let tz = config.timezone()?;
    let date_range = DateRange::new(
        start.as_deref().map(|s| parse_day(s, tz)).transpose()?.unwrap_or(0),
        end.as_deref().map(|s| parse_day(s, tz)).transpose()?.unwrap_or(0),
    );

    let source = JsonSnapshotSource::new(snapshot);

    let accounts: BTreeSet<String> = if accounts.is_empty() {
        source
            .load()
            .await?
            .days
            .iter()
            .flat_map(|d| d.trades.iter().map(|t| t.account.clone()))
            .collect()
    } else {
        accounts.into_iter().collect()
    };

    let mut directions = Vec::new();
    for p in &positions {
        directions.push(Strategy::from_str(p).ok_or_else(|| anyhow!("unknown position '{}', expected long or short", p))?);
    }
    if directions.is_empty() {
        directions = Strategy::all();
    }

    let criteria = FilterCriteria::for_accounts(accounts)
        .with_date_range(date_range)
        .with_positions(directions)
        .with_tags(tags);
    criteria.validate()?;

    info!(
        "Analyzing {} for {} account(s)",
        snapshot.display(),
        criteria.accounts.len()
    );

    let store = AnalyticsStore::new(config)?;
    store.refresh(&source, criteria).await;
    let state = store.state().await;

    if !state.has_data() {
        warn!("No trades matched the selected filters");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        print!("{}", render_report(&state, tz));
    }
    Ok(())
}

async fn run_positions(file: &Path, json: bool) -> Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let positions: Vec<SymbolPosition> =
        serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", file.display()))?;

    let analytics: Vec<_> = positions.iter().map(analyze_position).collect();
    let portfolio = summarize_positions(&positions);

    if json {
        let body = serde_json::json!({
            "positions": analytics,
            "portfolio": portfolio,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        print!("{}", render_positions(&analytics, &portfolio));
    }
    Ok(())
}
