mod classify;
mod report;

pub use classify::{ClassificationOptions, ClassificationOutcome, classify};
pub use report::ClassifiedReport;
