use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod commands;

use commands::ReportContext;

#[derive(Parser)]
#[command(name = "eod")]
#[command(about = "End-of-day book PNL: FIFO pairs, settlement, account summary, exit reasons", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (base -> desk -> day overrides)
    #[arg(long = "config", global = true)]
    config_paths: Vec<PathBuf>,

    /// Exports root; overrides report.exports_root
    #[arg(long, global = true)]
    exports: Option<PathBuf>,

    /// Print results only; do not write exports/<report_id>/
    #[arg(long = "no-artifacts", global = true, default_value_t = false)]
    no_artifacts: bool,

    /// What to do with config keys the command never reads
    #[arg(long = "unused-keys", global = true, value_enum, default_value_t = UnusedKeys::Warn)]
    unused_keys: UnusedKeys,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum UnusedKeys {
    Warn,
    Fail,
}

#[derive(Subcommand)]
enum Commands {
    /// FIFO trade pairs + per-instrument pivot from a broker order book
    Pairs {
        /// Order book (.csv, or .xlsx read from the first sheet)
        #[arg(long)]
        orderbook: PathBuf,

        /// Restrict to these accounts (repeatable); default: every account in the file
        #[arg(long = "account")]
        accounts: Vec<String>,
    },

    /// Realized + settlement PNL of a positions export, split NFO / BFO
    Settlement {
        /// Positions CSV
        #[arg(long)]
        positions: PathBuf,

        /// Value only this account's rows (needs a UserID column)
        #[arg(long)]
        account: Option<String>,

        #[command(flatten)]
        segments: SegmentArgs,
    },

    /// Per-account settlement summary table
    Summary {
        /// Positions CSV with a UserID column
        #[arg(long)]
        positions: PathBuf,

        /// Accounts to summarise (repeatable); default: every account in the file
        #[arg(long = "account")]
        accounts: Vec<String>,

        #[command(flatten)]
        segments: SegmentArgs,
    },

    /// Portfolio exit reasons from a strategy grid log and leg exports
    Exits {
        /// Grid log (.csv or .xlsx)
        #[arg(long)]
        gridlog: PathBuf,

        /// Leg exports, .csv or .xlsx (repeatable)
        #[arg(long = "legs", required_unless_present = "summary")]
        legs: Vec<PathBuf>,

        /// Strategy summary workbook; every sheet named like "legs" is read
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

/// Settlement segment flags shared by `settlement` and `summary`.
#[derive(Args, Debug, Clone, Default)]
pub struct SegmentArgs {
    /// NFO bhavcopy CSV (CONTRACT_D, SETTLEMENT)
    #[arg(long = "nfo-bhav")]
    pub nfo_bhav: Option<PathBuf>,

    /// BFO bhavcopy CSV (Expiry Date, Series Code, Close Price)
    #[arg(long = "bfo-bhav")]
    pub bfo_bhav: Option<PathBuf>,

    /// NFO expiry (YYYY-MM-DD); default: settlement.nfo.expiry, then today
    #[arg(long = "nfo-expiry")]
    pub nfo_expiry: Option<NaiveDate>,

    /// BFO expiry (YYYY-MM-DD); default: settlement.bfo.expiry, then today
    #[arg(long = "bfo-expiry")]
    pub bfo_expiry: Option<NaiveDate>,

    /// Skip NFO settlement valuation
    #[arg(long = "no-nfo", default_value_t = false)]
    pub no_nfo: bool,

    /// Skip BFO settlement valuation
    #[arg(long = "no-bfo", default_value_t = false)]
    pub no_bfo: bool,
}

fn main() -> Result<()> {
    // dev-time bootstrap; a missing file is fine
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    let policy = match cli.unused_keys {
        UnusedKeys::Warn => eod_config::UnusedKeyPolicy::Warn,
        UnusedKeys::Fail => eod_config::UnusedKeyPolicy::Fail,
    };

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let loaded = eod_config::load_layered_yaml(&paths)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Pairs {
            orderbook,
            accounts,
        } => {
            let ctx = ReportContext::load(
                &cli.config_paths,
                eod_config::ReportMode::Pairs,
                policy,
                cli.exports,
                !cli.no_artifacts,
            )?;
            commands::pairs::run(&ctx, &orderbook, accounts)?;
        }

        Commands::Settlement {
            positions,
            account,
            segments,
        } => {
            let ctx = ReportContext::load(
                &cli.config_paths,
                eod_config::ReportMode::Settlement,
                policy,
                cli.exports,
                !cli.no_artifacts,
            )?;
            commands::settlement::run_settlement(&ctx, &positions, account.as_deref(), &segments)?;
        }

        Commands::Summary {
            positions,
            accounts,
            segments,
        } => {
            let ctx = ReportContext::load(
                &cli.config_paths,
                eod_config::ReportMode::Summary,
                policy,
                cli.exports,
                !cli.no_artifacts,
            )?;
            commands::settlement::run_summary(&ctx, &positions, accounts, &segments)?;
        }

        Commands::Exits {
            gridlog,
            legs,
            summary,
        } => {
            let ctx = ReportContext::load(
                &cli.config_paths,
                eod_config::ReportMode::Exits,
                policy,
                cli.exports,
                !cli.no_artifacts,
            )?;
            commands::exits::run(&ctx, &gridlog, &legs, summary.as_deref())?;
        }
    }

    Ok(())
}

fn init_tracing() {
    // stderr keeps stdout parseable for key=value consumers
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
