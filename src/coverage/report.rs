use std::collections::HashMap;

use crate::model::CoverageRecord;

/// Classified coverage keyed by unit name.
///
/// Re-inserting a name replaces the record in place, keeping its first position.
#[derive(Debug, Clone, Default)]
pub struct ClassifiedReport {
    records: Vec<CoverageRecord>,
    positions: HashMap<String, usize>,
}

impl ClassifiedReport {
    /// Returns the record previously stored under the same name, if any.
    pub fn insert(&mut self, record: CoverageRecord) -> Option<CoverageRecord> {
        match self.positions.get(&record.unit_name) {
            Some(&position) => Some(std::mem::replace(&mut self.records[position], record)),
            None => {
                self.positions
                    .insert(record.unit_name.clone(), self.records.len());
                self.records.push(record);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, unit_name: &str) -> Option<&CoverageRecord> {
        self.positions
            .get(unit_name)
            .map(|&position| &self.records[position])
    }

    /// Records ordered by lower-cased unit name; equal keys keep insertion order.
    pub fn ordered(&self) -> Vec<&CoverageRecord> {
        let mut keyed = self
            .records
            .iter()
            .map(|record| (record.unit_name.to_ascii_lowercase(), record))
            .collect::<Vec<_>>();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        keyed.into_iter().map(|(_, record)| record).collect()
    }
}
