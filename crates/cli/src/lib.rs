pub mod commands;

use clap::{Parser, Subcommand};
use restock_core::config::{AppConfig, LoadOptions, LogFormat};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "restock",
    about = "Restock recommendation CLI",
    long_about = "Recommend household items, flag replenishment candidates, and evaluate ranking quality.",
    after_help = "Examples:\n  restock seed\n  restock recommend --requester 3 --top-n 5\n  restock evaluate --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Replace stored data with a deterministic synthetic dataset")]
    Seed {
        #[arg(long, default_value_t = restock_db::DEFAULT_SEED, help = "Generator seed")]
        seed: u64,
    },
    #[command(about = "Rank items for a requester using collaborative filtering")]
    Recommend {
        #[arg(long, help = "Requester id")]
        requester: i64,
        #[arg(long, help = "Number of items to return (defaults to config)")]
        top_n: Option<usize>,
        #[arg(long, help = "Fusion weight toward user-based predictions, in [0, 1]")]
        alpha: Option<f64>,
        #[arg(long, help = "Reference time as RFC3339 (defaults to now)")]
        as_of: Option<String>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List items a requester is due to reacquire")]
    Replenish {
        #[arg(long, help = "Requester id")]
        requester: i64,
        #[arg(long, help = "Reference time as RFC3339 (defaults to now)")]
        as_of: Option<String>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Show the most interacted-with catalog items")]
    Popular {
        #[arg(long, help = "Number of items to return (defaults to config)")]
        top_n: Option<usize>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Measure precision and recall against held-out acquisitions")]
    Evaluate {
        #[arg(long, help = "Number of items to rank per requester (defaults to config)")]
        top_n: Option<usize>,
        #[arg(long, help = "Fusion weight toward user-based predictions, in [0, 1]")]
        alpha: Option<f64>,
        #[arg(long, help = "Reference time as RFC3339 (defaults to now)")]
        as_of: Option<String>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, DB connectivity, and schema readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

/// Installs a stderr subscriber so command output on stdout stays parseable.
///
/// Falls back to default logging settings when the config cannot be loaded;
/// the command itself reports the config failure.
pub fn init_logging() -> anyhow::Result<()> {
    let config = AppConfig::load(LoadOptions::default()).unwrap_or_default();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|error| anyhow::anyhow!("failed to install tracing subscriber: {error}"))
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed { seed } => commands::seed::run(seed),
        Command::Recommend { requester, top_n, alpha, as_of, json } => {
            commands::recommend::run(commands::recommend::RecommendOptions {
                requester,
                top_n,
                alpha,
                as_of,
                json,
            })
        }
        Command::Replenish { requester, as_of, json } => {
            commands::replenish::run(requester, as_of, json)
        }
        Command::Popular { top_n, json } => commands::popular::run(top_n, json),
        Command::Evaluate { top_n, alpha, as_of, json } => {
            commands::evaluate::run(top_n, alpha, as_of, json)
        }
        Command::Config => commands::CommandResult::text(commands::config::run()),
        Command::Doctor { json } => commands::CommandResult::text(commands::doctor::run(json)),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
