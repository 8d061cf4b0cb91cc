use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use super::ClassifiedReport;
use crate::model::{CoverageRecord, RawCoverageRecord};

#[derive(Debug, Clone, Default)]
pub struct ClassificationOptions {
    /// Unit names to keep. Empty keeps everything.
    pub unit_filter: HashSet<String>,
    /// Keep units that report zero covered and zero uncovered lines.
    pub include_invalid: bool,
}

impl ClassificationOptions {
    pub fn new(unit_names: &[String], include_invalid: bool) -> Self {
        Self {
            unit_filter: unit_names.iter().cloned().collect(),
            include_invalid,
        }
    }

    fn accepts_name(&self, unit_name: &str) -> bool {
        self.unit_filter.is_empty() || self.unit_filter.contains(unit_name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClassificationOutcome {
    pub report: ClassifiedReport,
    /// Records accepted, counting duplicates of the same unit name.
    pub retained: usize,
    pub skipped_invalid: usize,
    pub skipped_filtered: usize,
    pub skipped_malformed: usize,
}

enum RecordDecision {
    Keep(CoverageRecord),
    Invalid,
    Filtered,
    Malformed,
}

pub fn classify(records: Vec<Value>, options: &ClassificationOptions) -> ClassificationOutcome {
    let mut outcome = ClassificationOutcome::default();

    for raw in records {
        match decide(raw, options) {
            RecordDecision::Keep(record) => {
                let unit_id = record.unit_id.clone();
                if let Some(replaced) = outcome.report.insert(record) {
                    debug!(
                        unit = %replaced.unit_name,
                        replaced_id = ?replaced.unit_id,
                        unit_id = ?unit_id,
                        "duplicate coverage unit replaced"
                    );
                }
                outcome.retained += 1;
            }
            RecordDecision::Invalid => outcome.skipped_invalid += 1,
            RecordDecision::Filtered => outcome.skipped_filtered += 1,
            RecordDecision::Malformed => outcome.skipped_malformed += 1,
        }
    }

    outcome
}

fn decide(raw: Value, options: &ClassificationOptions) -> RecordDecision {
    let Ok(raw) = serde_json::from_value::<RawCoverageRecord>(raw) else {
        return RecordDecision::Malformed;
    };

    if !options.include_invalid && raw.num_lines_covered == 0 && raw.num_lines_uncovered == 0 {
        return RecordDecision::Invalid;
    }

    if !options.accepts_name(&raw.apex_class_or_trigger.name) {
        return RecordDecision::Filtered;
    }

    match raw.into_record() {
        Some(record) => RecordDecision::Keep(record),
        None => RecordDecision::Malformed,
    }
}
