//! Queueing display command-line entry point.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use queueing_display::{DisplayOptions, HttpPageLoader, run};

#[derive(Parser, Debug)]
#[command(name = "queueing-display")]
#[command(about = "Shows the live match queue countdown of an event server")]
struct Cli {
    /// Event server base URL
    #[arg(short, long, default_value = queueing_display::options::DEFAULT_SERVER)]
    server: String,

    /// Display ID reported to the server
    #[arg(long)]
    display_id: Option<String>,

    /// Delay between reconnect attempts, in milliseconds
    #[arg(long, default_value = "3000")]
    reconnect_delay_ms: u64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let mut options = DisplayOptions::new()
        .with_server(&cli.server)
        .with_reconnect_delay(Duration::from_millis(cli.reconnect_delay_ms));
    if let Some(display_id) = &cli.display_id {
        options = options.with_query("displayId", display_id);
    }
    options.validate().context("invalid display options")?;

    let loader = HttpPageLoader::new(&options).context("failed to create page loader")?;
    let (renders, mut lines) = watch::channel(String::new());

    // Status lines go to stdout, logs to stderr.
    tokio::spawn(async move {
        while lines.changed().await.is_ok() {
            let line = lines.borrow_and_update().clone();
            println!("{line}");
        }
    });

    info!(server = %cli.server, "Starting queueing display");
    run(&options, &loader, renders, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
    .context("queueing display failed")?;

    Ok(())
}
