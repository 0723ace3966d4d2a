mod config;
mod github;
mod output;
mod scan;

pub const USER_AGENT: &str = concat!("starscan/", env!("CARGO_PKG_VERSION"));

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use config::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_tracing() {
        eprintln!("failed to initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    let (client, options) = match cli.into_parts() {
        Ok(parts) => parts,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match scan::run(&client, &options).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout carries only the JSON document.
fn init_tracing() -> Result<(), tracing_subscriber::filter::ParseError> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("starscan=info".parse()?),
        )
        .init();
    Ok(())
}
