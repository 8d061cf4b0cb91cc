mod pagination;
mod tooling;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ToolError;
use crate::model::{TestQueueItem, TestScope};

pub use pagination::query_all;
pub use tooling::ToolingClient;

/// One page of a cursor-based query response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPage {
    #[serde(default)]
    pub total_size: u64,
    #[serde(default)]
    pub records: Vec<Value>,
    #[serde(default)]
    pub next_records_url: Option<String>,
}

#[async_trait]
pub trait QueryApi: Send + Sync {
    async fn query(&self, query: &str) -> Result<QueryPage, ToolError>;

    async fn query_more(&self, cursor: &str) -> Result<QueryPage, ToolError>;
}

#[async_trait]
pub trait TestRunApi: Send + Sync {
    /// Returns the job id, or `None` when the service accepted the request without one.
    async fn submit_test_run(&self, scope: &TestScope) -> Result<Option<String>, ToolError>;

    async fn fetch_queue_status(&self, job_id: &str) -> Result<Vec<TestQueueItem>, ToolError>;
}
