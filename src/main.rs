mod cli;
mod commands;
mod config;
mod coverage;
mod document;
mod error;
mod model;
mod monitor;
mod remote;
mod style;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::config::UserConfig;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.silent);

    if let Err(err) = run(cli) {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = UserConfig::load(&cli.config)?;
    config.log_settings();

    match cli.command {
        Commands::Coverage(args) => commands::coverage::run(&config, args),
        Commands::Test(args) => commands::test_run::run(&config, args),
    }
}

fn init_tracing(silent: bool) {
    let env_filter = if silent {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
