mod output;

use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::block_on;
use crate::cli::CoverageArgs;
use crate::config::UserConfig;
use crate::coverage::{ClassificationOptions, classify};
use crate::document::Workbook;
use crate::error::ToolError;
use crate::remote::{QueryApi, ToolingClient, query_all};
use crate::util::now_report_timestamp;

const COVERAGE_QUERY: &str = "SELECT ApexClassOrTriggerId, ApexClassOrTrigger.Name, NumLinesCovered, NumLinesUncovered FROM ApexCodeCoverageAggregate";

/// What a coverage run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverageOutcome {
    NothingToReport,
    Displayed { rows: usize },
    Written { rows: usize },
}

pub fn run(config: &UserConfig, args: CoverageArgs) -> Result<()> {
    let client = ToolingClient::new(config)?;
    let stdout = io::stdout();
    let mut writer = io::BufWriter::new(stdout.lock());
    block_on(run_with(&client, config, &args, &mut writer))??;
    info!("done");
    Ok(())
}

/// Fetches, classifies and reports coverage; console output goes to `console`.
pub async fn run_with<Q, W>(
    api: &Q,
    config: &UserConfig,
    args: &CoverageArgs,
    console: &mut W,
) -> Result<CoverageOutcome>
where
    Q: QueryApi + ?Sized,
    W: Write,
{
    let records = query_all(api, COVERAGE_QUERY)
        .await
        .context("failed to query code coverage aggregate")?;
    let fetched = records.len();

    let options = ClassificationOptions::new(&config.target_apex_classes, args.include_invalid);
    let outcome = classify(records, &options);

    info!(
        fetched,
        count = outcome.retained,
        units = outcome.report.len(),
        skipped_invalid = outcome.skipped_invalid,
        skipped_filtered = outcome.skipped_filtered,
        "classified apex coverage"
    );
    if outcome.skipped_malformed > 0 {
        warn!(
            skipped_malformed = outcome.skipped_malformed,
            "skipped malformed coverage records"
        );
    }

    if outcome.report.is_empty() {
        info!("no coverage records matched; nothing to report");
        return Ok(CoverageOutcome::NothingToReport);
    }

    let ordered = outcome.report.ordered();

    if args.display {
        if args.json {
            output::write_json_table(console, &ordered)?;
        } else {
            output::write_text_table(console, &ordered)?;
        }
        return Ok(CoverageOutcome::Displayed {
            rows: ordered.len(),
        });
    }

    let template_path = config.template_file_path()?;
    let result_path = config.result_file_path()?;

    let mut workbook = Workbook::load(template_path)?;
    let sheet = workbook
        .first_sheet_mut()
        .ok_or_else(|| ToolError::Rendering {
            path: template_path.to_path_buf(),
            reason: "template has no sheets".to_string(),
        })?;
    let rows = output::render_report(sheet, &ordered, config, &now_report_timestamp());
    workbook.save(result_path)?;

    info!(path = %result_path.display(), rows, "wrote coverage report");
    Ok(CoverageOutcome::Written { rows })
}
