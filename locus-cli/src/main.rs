//! locus entry point.

use std::process::ExitCode;

use locus_cli::{run, CliError, Command};
use locus_core::LocusConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match try_main().await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn try_main() -> Result<String, CliError> {
    let command = Command::parse(std::env::args().skip(1))?;
    let config = LocusConfig::load()?;
    tracing::debug!(root_dir = %config.cache.root_dir.display(), "Configuration loaded");
    run(&config, command).await
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .try_init();
}
