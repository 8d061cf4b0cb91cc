pub mod coverage;
pub mod test_run;

use std::future::Future;

use anyhow::{Context, Result};

/// Drives one command's async flow on a single-threaded runtime.
fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    Ok(runtime.block_on(future))
}
