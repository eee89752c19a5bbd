use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use velocitas_components::cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        tracing::error!(error = ?e, "Component failed");
        std::process::exit(1);
    }
    Ok(())
}
