#![doc = include_str!("../README.md")]

mod cli;

use std::io::{self, BufWriter, Write};

use clap::Parser;
use cli::commands::run;
use cli::config::{CliArgs, CliConfig};
use cli::telemetry::init_telemetry;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = CliConfig::try_from(args)?;

    init_telemetry()?;
    log_startup_info(&config);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let res = run(&config, &mut out);
    out.flush()?;
    res
}

fn log_startup_info(config: &CliConfig) {
    if cfg!(debug_assertions) {
        tracing::debug!("Starting with full config: {:#?}", config);
    } else {
        let identity = config.generator.identity();
        tracing::debug!(
            "Starting as worker {} in datacenter {}",
            identity.worker_id(),
            identity.datacenter_id()
        );
    }
}
