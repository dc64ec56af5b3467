use anyhow::Result;
use clap::Parser;
use tracing::level_filters::LevelFilter;

use uptime_service::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.verbose {
        0 => logger::init(),
        1 => logger::init_with_level(LevelFilter::DEBUG),
        _ => logger::init_with_level(LevelFilter::TRACE),
    }

    cli.execute().await
}
