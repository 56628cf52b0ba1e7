use anyhow::Result;
use clap::Parser;
use drivesort::cli;
use log::{error, info};

fn main() -> Result<()> {
    let args = cli::Args::parse();
    let config = cli::load_config(&args)?;
    cli::init_logging(&args, &config)?;
    info!("Starting drivesort v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = cli::run(args, config) {
        // Through the logger so the failure also lands in the error log file
        error!("{:#}", e);
        log::logger().flush();
        std::process::exit(1);
    }

    Ok(())
}
