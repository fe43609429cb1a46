use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use pricewatch::config::AppConfig;
use pricewatch::models::RunSummary;
use pricewatch::runner::Runner;
use pricewatch::scheduler;
use pricewatch::store::Workbook;

#[derive(Parser)]
#[command(name = "pricewatch", about = "Lowest-price and stock-change tracker", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run one batch pass over the product list
    Run,
    /// Print the resolved configuration
    Info,
    /// Run batches on the configured cron schedule until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pricewatch=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.command.unwrap_or(Command::Info) {
        Command::Info => print_info(&config),
        Command::Run => {
            let workbook = Workbook::open(config.require_workbook()?)?;
            info!("starting batch run");
            let runner = Runner::new(config)?;
            let summary = runner
                .run_once(&workbook, &workbook, &workbook, &workbook)
                .await?;
            print_summary(&summary);
        }
        Command::Watch => scheduler::run_watch(config).await?,
    }

    Ok(())
}

fn print_info(config: &AppConfig) {
    let workbook = if config.store.workbook.trim().is_empty() {
        "(unset)"
    } else {
        config.store.workbook.as_str()
    };
    println!("workbook:        {workbook}");
    println!("user agent:      {}", config.fetcher.user_agent);
    println!("timeout:         {}s", config.fetcher.timeout_secs);
    println!("retry:           {}", config.fetcher.retry);
    println!("backoff:         {}ms", config.fetcher.backoff_ms);
    println!("price threshold: {}", config.run.price_threshold);
    println!("watch cron:      {}", config.scheduler.cron);
}

fn print_summary(summary: &RunSummary) {
    println!(
        "Batch {} finished in {:.2}s",
        summary.batch_id, summary.duration_secs
    );
    println!(
        "  entries: {} total, {} succeeded, {} failed",
        summary.total, summary.succeeded, summary.failed
    );
    println!(
        "  http calls: {} (rate-limited {}, forbidden {}, timeouts {}, other {})",
        summary.http_calls,
        summary.rate_limited,
        summary.forbidden,
        summary.timeouts,
        summary.other_failures
    );
    println!(
        "  changes: {} price, {} stock",
        summary.price_changes, summary.stock_changes
    );
}
