//! Statement Extractor
//!
//! Terminal front-end that uploads PDF bank statements for transaction
//! extraction and waits for the resulting CSV.

use anyhow::Result;
use clap::Parser;
use statement_extractor::app::App;
use statement_extractor::config::{Args, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Stdout belongs to the shell, so logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Statement Extractor v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_args(args);
    tracing::debug!("Configuration: {:?}", config);

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut app = App::new(stdin.lock(), stdout.lock(), config)?;
    app.run().await?;

    Ok(())
}
