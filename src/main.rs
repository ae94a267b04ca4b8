use std::sync::Arc;

use clap::{Parser, Subcommand};

use polyscan::config::{AppConfig, LogFormat};
use polyscan::report::{results_table, watchlist_table, ConsoleObserver};
use polyscan::session::Termination;
use polyscan::stream::HttpTransport;
use polyscan::watchlist::{FileBackend, Watchlist, WatchlistStore};
use polyscan::Scanner;

#[derive(Debug, Parser)]
#[command(name = "polyscan", about = "Holder-profitability analysis for Polymarket markets")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Stream an analysis for a market URL
    Analyze {
        /// Polymarket event URL or shareable `event[/market]` path
        url: String,
        /// Pin every flagged market once the analysis completes
        #[arg(long)]
        pin_flagged: bool,
        /// Pin specific markets (by id) from this analysis
        #[arg(long = "pin", value_name = "ITEM_ID")]
        pin: Vec<String>,
    },
    /// Show pinned markets and their trend since the previous refresh
    Watchlist,
    /// Re-run the analysis for one pinned market, or all of them
    Refresh { item_id: Option<String> },
    /// Remove a market from the watchlist
    Unpin { item_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    init_tracing(config.log_format);
    polyscan::metrics::describe_metrics();

    let cli = Cli::parse();

    let transport = Arc::new(HttpTransport::new(
        config.stream_endpoint(),
        config.connect_timeout,
    )?);
    let store: Arc<dyn Watchlist> =
        Arc::new(WatchlistStore::new(FileBackend::new(&config.watchlist_path)));
    let scanner = Scanner::new(transport, store);

    match cli.command {
        Command::Analyze {
            url,
            pin_flagged,
            pin,
        } => {
            scanner.subscribe(Arc::new(ConsoleObserver));
            let session = scanner.analyze(&url)?;

            let outcome = tokio::select! {
                outcome = scanner.wait(session) => outcome,
                _ = tokio::signal::ctrl_c() => {
                    scanner.cancel();
                    Some(Termination::Cancelled)
                }
            };

            let results = scanner.results();
            if !results.results.is_empty() {
                println!("{}", results_table(&results.results));
            }

            if pin_flagged {
                let pinned = scanner.pin_flagged();
                println!("Pinned {pinned} flagged market(s)");
            }
            for item_id in &pin {
                if scanner.pin(item_id) {
                    println!("Pinned {item_id}");
                }
            }

            if !matches!(outcome, Some(Termination::Completed(_))) {
                std::process::exit(1);
            }
        }
        Command::Watchlist => {
            let entries = scanner.store().all();
            if entries.is_empty() {
                println!("Watchlist is empty");
            } else {
                println!("{}", watchlist_table(&entries));
            }
        }
        Command::Refresh { item_id } => {
            let outcomes = match item_id {
                Some(id) => match scanner.refresh_entry(&id) {
                    Some(session) => vec![(id.clone(), scanner.wait_refresh(&id, session).await)],
                    None => anyhow::bail!("{id} is not pinned or cannot be refreshed"),
                },
                None => scanner.refresh_all().await,
            };

            for (id, outcome) in &outcomes {
                match outcome {
                    Some(Termination::Completed(_)) => println!("{id}: refreshed"),
                    Some(reason) => eprintln!("{id}: {reason}"),
                    None => eprintln!("{id}: superseded"),
                }
            }
            println!("{}", watchlist_table(&scanner.store().all()));
        }
        Command::Unpin { item_id } => {
            if scanner.unpin(&item_id) {
                println!("Unpinned {item_id}");
            } else {
                println!("{item_id} was not pinned");
            }
        }
    }

    Ok(())
}

fn init_tracing(format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    // stdout carries the report tables
    let registry = tracing_subscriber::registry().with(EnvFilter::from_default_env());
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry.with(fmt::layer().with_writer(std::io::stderr)).init(),
    }
}
