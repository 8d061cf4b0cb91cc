use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::DEFAULT_USER_CONFIG_PATH;
use crate::monitor::DEFAULT_POLL_INTERVAL_MS;

#[derive(Parser, Debug)]
#[command(
    name = "apexcov",
    version,
    about = "Apex code coverage reports and asynchronous test runs"
)]
pub struct Cli {
    /// Path to the YAML user config.
    #[arg(short = 'c', long, global = true, default_value = DEFAULT_USER_CONFIG_PATH)]
    pub config: PathBuf,

    /// Only report errors.
    #[arg(short = 's', long, global = true, default_value_t = false)]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch coverage and write the spreadsheet report (or print it).
    Coverage(CoverageArgs),
    /// Run Apex tests asynchronously and follow them to completion.
    Test(TestArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CoverageArgs {
    /// Keep classes that report no measurable lines.
    #[arg(short = 'i', long, default_value_t = false)]
    pub include_invalid: bool,

    /// Print coverage to the console instead of writing the report.
    #[arg(short = 'd', long, default_value_t = false)]
    pub display: bool,

    #[arg(long, default_value_t = false, requires = "display")]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TestArgs {
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,
}
