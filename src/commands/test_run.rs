use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::block_on;
use crate::cli::TestArgs;
use crate::config::UserConfig;
use crate::model::TestScope;
use crate::monitor::{TestRunSummary, run_test_monitor};
use crate::remote::{TestRunApi, ToolingClient};

pub fn run(config: &UserConfig, args: TestArgs) -> Result<()> {
    let client = ToolingClient::new(config)?;
    block_on(run_with(&client, config, &args))??;
    info!("done");
    Ok(())
}

/// Submits the configured test classes (or all local tests) and follows the run.
pub async fn run_with<A>(api: &A, config: &UserConfig, args: &TestArgs) -> Result<TestRunSummary>
where
    A: TestRunApi + ?Sized,
{
    let scope = TestScope::from_class_names(&config.target_apex_test_classes);
    let poll_interval = Duration::from_millis(args.poll_interval_ms);

    match &scope {
        TestScope::Classes(names) => info!(classes = names.len(), "submitting test classes"),
        TestScope::AllLocalTests => info!("submitting all local tests"),
    }

    let summary = run_test_monitor(api, &scope, poll_interval)
        .await
        .context("apex test run failed")?;

    if summary.ng_count > 0 {
        warn!(ng = summary.ng_count, "some test classes reported failures");
    }
    Ok(summary)
}
