use clap::Parser;
use tracing_subscriber::EnvFilter;

use pajak_cli::app::{self, Cli};
use pajak_cli::config::AppConfig;

// ─── tracing ─────────────────────────────────────────────────────────────────

/// Initialise the tracing subscriber.
///
/// * Honours `RUST_LOG` when set.
/// * Otherwise uses the configured level, falling back to `info`.
/// * Strips timestamps and target names and writes to stderr so stdout
///   carries only JSON.
fn init_tracing(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::discover(cli.config.as_deref())?;

    init_tracing(cli.log_level(&config));

    app::run(cli, config).await
}
