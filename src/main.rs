//! docferry - bulk document mover.
//!
//! Moves documents between a clustered document store and a filesystem:
//!
//! ```bash
//! # Export a view, one page file per fetched page
//! docferry -u node1:27017,node2:27017 -b events -p secret \
//!     export --view by_region --keys eu,us --page-size 1000 -o /data/out
//!
//! # Push page files back as bulk writes
//! docferry -u node1:27017 -b events -p secret \
//!     import /data/out/part-* --action set --concurrency 32
//! ```
//!
//! Exit codes: 0 on success, 1 on argument validation failure, 2 when a run
//! fails or its failure rate exceeds the configured threshold.

use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use docferry::cli::{CliInterface, Commands};
use docferry::error::Result;
use docferry::export::ExportOrchestrator;
use docferry::import::{ImportTask, Verdict};
use docferry::store::MongoStore;

/// Application entry point
#[tokio::main]
async fn main() {
    let cli = match CliInterface::new() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    initialize_logging(&cli);

    match run(&cli).await {
        Ok(Verdict::Pass) => {}
        Ok(Verdict::Fail) => {
            eprintln!("Run failed: failure rate exceeded the configured threshold");
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}

/// Connect, dispatch the subcommand, and release the connection exactly
/// once on every path.
async fn run(cli: &CliInterface) -> Result<Verdict> {
    let store = MongoStore::connect(&cli.config().store).await?;
    let outcome = dispatch(cli, &store).await;
    store.disconnect().await;
    outcome
}

async fn dispatch(cli: &CliInterface, store: &MongoStore) -> Result<Verdict> {
    match cli.command() {
        Commands::Export { .. } => {
            let orchestrator = ExportOrchestrator::new(store, &cli.config().export);
            let report = orchestrator.run().await?;
            println!(
                "Exported {} records into {} page files ({} pages failed, {} key filters failed)",
                report.records_written,
                report.pages_written,
                report.pages_failed,
                report.key_filters_failed
            );
            // A partially failed export is still reported as such.
            if report.pages_failed > 0 || report.key_filters_failed > 0 {
                Ok(Verdict::Fail)
            } else {
                Ok(Verdict::Pass)
            }
        }
        Commands::Import { .. } => {
            let cancel = CancellationToken::new();
            let ctrl_c_token = cancel.clone();
            let ctrl_c_handle = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("Interrupted; stopping admission of new operations...");
                    ctrl_c_token.cancel();
                }
            });

            let task = ImportTask::new(store, &cli.config().import, &cli.config().job)
                .with_cancellation(cancel);
            let verdict = task.run().await;

            ctrl_c_handle.abort();
            verdict
        }
    }
}

/// Initialize logging system based on verbosity level
fn initialize_logging(cli: &CliInterface) {
    let level = if cli.args().very_verbose {
        Level::TRACE
    } else if cli.args().verbose {
        Level::DEBUG
    } else {
        cli.config().logging.level.to_tracing_level()
    };

    // RUST_LOG takes precedence; the flag-derived level is the fallback.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
