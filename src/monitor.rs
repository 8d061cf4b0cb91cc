use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info};

use crate::error::ToolError;
use crate::model::{TestQueueItem, TestScope};
use crate::remote::TestRunApi;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;

static PASS_RATIO_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)/(\d+)\)").expect("pass ratio pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    Ng,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("OK"),
            Self::Ng => f.write_str("NG"),
        }
    }
}

/// OK only when the extended status carries `(passed/total)` with passed == total.
pub fn verdict_for(extended_status: &str) -> Verdict {
    let Some(captures) = PASS_RATIO_PATTERN.captures(extended_status) else {
        return Verdict::Ng;
    };
    let passed = captures.get(1).and_then(|m| m.as_str().parse::<u64>().ok());
    let total = captures.get(2).and_then(|m| m.as_str().parse::<u64>().ok());
    match (passed, total) {
        (Some(passed), Some(total)) if passed == total => Verdict::Ok,
        _ => Verdict::Ng,
    }
}

pub fn progress_percent(completed: usize, total: usize) -> usize {
    if total == 0 {
        return 100;
    }
    completed * 100 / total
}

/// A class finalized during one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedClass {
    pub class_name: String,
    pub verdict: Verdict,
    pub extended_status: String,
    pub progress_percent: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollOutcome {
    pub newly_completed: Vec<CompletedClass>,
    pub terminal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestRunSummary {
    pub class_count: usize,
    pub ok_count: usize,
    pub ng_count: usize,
    pub polls: usize,
}

/// Tracks which classes have been reported so repeated polls never double count.
#[derive(Debug, Clone, Default)]
pub struct MonitorState {
    completed: HashSet<String>,
    ok_count: usize,
    ng_count: usize,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn ok_count(&self) -> usize {
        self.ok_count
    }

    pub fn ng_count(&self) -> usize {
        self.ng_count
    }

    /// Folds one full queue snapshot into the state.
    pub fn observe(&mut self, items: &[TestQueueItem]) -> PollOutcome {
        let total = items.len();
        let mut outcome = PollOutcome {
            newly_completed: Vec::new(),
            terminal: true,
        };

        for item in items {
            if !item.is_completed() {
                outcome.terminal = false;
                continue;
            }
            if self.completed.contains(item.class_name()) {
                continue;
            }

            let verdict = verdict_for(item.extended_status());
            match verdict {
                Verdict::Ok => self.ok_count += 1,
                Verdict::Ng => self.ng_count += 1,
            }
            self.completed.insert(item.class_name().to_string());

            outcome.newly_completed.push(CompletedClass {
                class_name: item.class_name().to_string(),
                verdict,
                extended_status: item.extended_status().to_string(),
                progress_percent: progress_percent(self.completed.len(), total),
            });
        }

        outcome
    }

    fn summary(&self, polls: usize) -> TestRunSummary {
        TestRunSummary {
            class_count: self.completed_count(),
            ok_count: self.ok_count(),
            ng_count: self.ng_count(),
            polls,
        }
    }
}

/// Submits a test run and polls its queue until every item has completed.
///
/// Each poll finishes (fetch and bookkeeping) before the next delay starts.
/// A failed fetch ends the run without retrying.
pub async fn run_test_monitor<A>(
    api: &A,
    scope: &TestScope,
    poll_interval: Duration,
) -> Result<TestRunSummary, ToolError>
where
    A: TestRunApi + ?Sized,
{
    let job_id = api
        .submit_test_run(scope)
        .await?
        .ok_or(ToolError::MissingJobId)?;
    info!(job_id = %job_id, "test run submitted");

    let mut state = MonitorState::new();
    let mut polls = 0usize;

    loop {
        tokio::time::sleep(poll_interval).await;

        let items = api.fetch_queue_status(&job_id).await?;
        polls += 1;

        let outcome = state.observe(&items);
        for completed in &outcome.newly_completed {
            info!(
                progress = %format!("{}%", completed.progress_percent),
                class = %completed.class_name,
                result = %completed.verdict,
                status = %completed.extended_status,
                "test class completed"
            );
        }

        debug!(
            poll = polls,
            completed = state.completed_count(),
            total = items.len(),
            "queue polled"
        );
        if outcome.terminal {
            break;
        }
    }

    let summary = state.summary(polls);
    info!(
        class_count = summary.class_count,
        ok = summary.ok_count,
        ng = summary.ng_count,
        polls = summary.polls,
        "test run completed"
    );
    Ok(summary)
}
