use std::path::PathBuf;

use clap::Parser;
use derive_more::{Display, Error};
use error_stack::{Report, ResultExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rent_watch::config::{self, AppConfig};
use rent_watch::extract::ExtractorChain;
use rent_watch::fetch::HttpPageSource;
use rent_watch::monitor::{self, RunOutcome};
use rent_watch::notifier;
use rent_watch::storage::file::FilePriceStore;

#[derive(Debug, Display, Error)]
pub enum AppError {
    #[display("configuration error")]
    Config,
    #[display("runtime error")]
    Runtime,
}

#[derive(Parser)]
#[command(
    name = "rent-watch",
    about = "Checks an apartment listing and alerts when the rent drops"
)]
struct Cli {
    /// Dotenv file to load settings from (defaults to `.env` if present)
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(report) = run().await {
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}

/// Only configuration problems surface as errors; every other failure is
/// logged and left for the next scheduled run.
async fn run() -> Result<RunOutcome, Report<AppError>> {
    let cli = Cli::parse();
    let file_vars =
        config::read_env_file(cli.env_file.as_deref()).change_context(AppError::Config)?;

    let config = config::from_env(&file_vars).change_context(AppError::Config)?;
    init_tracing(&config);

    // ── Components ────────────────────────────────────────────────────────────
    let extractors =
        ExtractorChain::standard(&config.target.selector).change_context(AppError::Config)?;
    let notifier = notifier::build(&config.channel).change_context(AppError::Config)?;
    let source =
        HttpPageSource::new(config.target.request_timeout).change_context(AppError::Runtime)?;
    let store = FilePriceStore::new(config.state_path());

    info!(
        url = %config.target.url,
        channel = %notifier.channel(),
        state = %store.path().display(),
        "checking price"
    );

    let outcome = monitor::run_once(
        &config.target,
        &source,
        &extractors,
        &store,
        notifier.as_ref(),
    )
    .await;

    info!(?outcome, "run complete");
    Ok(outcome)
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::new(&config.general.log_level);
    match config.general.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}
