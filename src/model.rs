use serde::{Deserialize, Serialize};

/// `ApexCodeCoverageAggregate` row as returned by the tooling query endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawCoverageRecord {
    #[serde(default)]
    pub apex_class_or_trigger_id: Option<String>,
    pub apex_class_or_trigger: NamedReference,
    pub num_lines_covered: u64,
    pub num_lines_uncovered: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NamedReference {
    pub name: String,
}

/// Coverage of one class or trigger with its derived totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageRecord {
    pub unit_id: Option<String>,
    pub unit_name: String,
    pub lines_covered: u64,
    pub lines_uncovered: u64,
    pub total_lines: u64,
    /// Coverage floored to whole percent; 0 when there are no measurable lines.
    pub coverage_percent: u64,
}

impl CoverageRecord {
    /// Returns `None` when the line counts do not fit the totals.
    pub fn try_new(
        unit_id: Option<String>,
        unit_name: String,
        lines_covered: u64,
        lines_uncovered: u64,
    ) -> Option<Self> {
        let total_lines = lines_covered.checked_add(lines_uncovered)?;
        let coverage_percent = if total_lines == 0 {
            0
        } else {
            u64::try_from(u128::from(lines_covered) * 100 / u128::from(total_lines)).ok()?
        };

        Some(Self {
            unit_id,
            unit_name,
            lines_covered,
            lines_uncovered,
            total_lines,
            coverage_percent,
        })
    }

    /// Coverage ratio truncated to two decimal places.
    pub fn coverage_ratio(&self) -> f64 {
        self.coverage_percent as f64 / 100.0
    }

    pub fn coverage_label(&self) -> String {
        format!("{}%", self.coverage_percent)
    }
}

impl RawCoverageRecord {
    pub fn into_record(self) -> Option<CoverageRecord> {
        CoverageRecord::try_new(
            self.apex_class_or_trigger_id,
            self.apex_class_or_trigger.name,
            self.num_lines_covered,
            self.num_lines_uncovered,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum QueueStatus {
    Queued,
    Processing,
    Completed,
    /// Holding, Preparing, Failed, Aborted and anything newer.
    #[serde(other)]
    Other,
}

/// `ApexTestQueueItem` row for one test class within a job.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestQueueItem {
    pub apex_class: NamedReference,
    pub status: QueueStatus,
    #[serde(default)]
    pub extended_status: Option<String>,
}

impl TestQueueItem {
    pub fn class_name(&self) -> &str {
        &self.apex_class.name
    }

    pub fn extended_status(&self) -> &str {
        self.extended_status.as_deref().unwrap_or_default()
    }

    pub fn is_completed(&self) -> bool {
        self.status == QueueStatus::Completed
    }
}

/// Scope of an asynchronous test run request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestScope {
    Classes(Vec<String>),
    AllLocalTests,
}

impl TestScope {
    pub fn from_class_names(class_names: &[String]) -> Self {
        if class_names.is_empty() {
            Self::AllLocalTests
        } else {
            Self::Classes(class_names.to_vec())
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleCoverageRow {
    pub apex_class_name: String,
    pub coverage: String,
    pub total_lines: u64,
    pub covered_lines: u64,
    pub uncovered_lines: u64,
}

impl From<&CoverageRecord> for ConsoleCoverageRow {
    fn from(record: &CoverageRecord) -> Self {
        Self {
            apex_class_name: record.unit_name.clone(),
            coverage: record.coverage_label(),
            total_lines: record.total_lines,
            covered_lines: record.lines_covered,
            uncovered_lines: record.lines_uncovered,
        }
    }
}
