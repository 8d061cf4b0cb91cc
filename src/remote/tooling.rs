use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::{QueryApi, QueryPage, TestRunApi, query_all};
use crate::config::{ACCESS_TOKEN_ENV, UserConfig};
use crate::error::ToolError;
use crate::model::{TestQueueItem, TestScope};

const REQUEST_TIMEOUT_SECS: u64 = 120;
const TEST_LEVEL_ALL_LOCAL: &str = "RunLocalTests";

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RunTestsRequest<'a> {
    Classes { tests: Vec<TestClassEntry<'a>> },
    Level {
        #[serde(rename = "testLevel")]
        test_level: &'a str,
    },
}

#[derive(Debug, Serialize)]
struct TestClassEntry<'a> {
    #[serde(rename = "className")]
    class_name: &'a str,
}

impl<'a> RunTestsRequest<'a> {
    fn for_scope(scope: &'a TestScope) -> Self {
        match scope {
            TestScope::Classes(names) => Self::Classes {
                tests: names
                    .iter()
                    .map(|name| TestClassEntry { class_name: name })
                    .collect(),
            },
            TestScope::AllLocalTests => Self::Level {
                test_level: TEST_LEVEL_ALL_LOCAL,
            },
        }
    }
}

/// Salesforce Tooling REST API client authenticated with a bearer session token.
#[derive(Debug, Clone)]
pub struct ToolingClient {
    instance_url: String,
    api_version: String,
    access_token: String,
    client: reqwest::Client,
}

impl ToolingClient {
    pub fn new(config: &UserConfig) -> Result<Self, ToolError> {
        let access_token = config
            .access_token
            .clone()
            .ok_or_else(|| ToolError::Configuration {
                path: config.source_path.clone(),
                reason: format!("accessToken is not set and {ACCESS_TOKEN_ENV} is empty"),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self::with_client(
            &config.instance_url,
            &config.api_version,
            access_token,
            client,
        ))
    }

    pub fn with_client(
        instance_url: &str,
        api_version: &str,
        access_token: String,
        client: reqwest::Client,
    ) -> Self {
        Self {
            instance_url: instance_url.trim_end_matches('/').to_string(),
            api_version: api_version.trim().trim_start_matches('v').to_string(),
            access_token,
            client,
        }
    }

    fn tooling_url(&self, resource: &str) -> String {
        format!(
            "{}/services/data/v{}/tooling/{}",
            self.instance_url, self.api_version, resource
        )
    }

    fn cursor_url(&self, cursor: &str) -> String {
        if cursor.starts_with("http://") || cursor.starts_with("https://") {
            cursor.to_string()
        } else {
            format!("{}{}", self.instance_url, cursor)
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ToolError> {
        let response = request.bearer_auth(&self.access_token).send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl QueryApi for ToolingClient {
    async fn query(&self, query: &str) -> Result<QueryPage, ToolError> {
        debug!(query, "tooling query");
        let request = self
            .client
            .get(self.tooling_url("query/"))
            .query(&[("q", query)]);
        self.send_json(request).await
    }

    async fn query_more(&self, cursor: &str) -> Result<QueryPage, ToolError> {
        debug!(cursor, "tooling query more");
        let request = self.client.get(self.cursor_url(cursor));
        self.send_json(request).await
    }
}

#[async_trait]
impl TestRunApi for ToolingClient {
    async fn submit_test_run(&self, scope: &TestScope) -> Result<Option<String>, ToolError> {
        let body = RunTestsRequest::for_scope(scope);
        let request = self
            .client
            .post(self.tooling_url("runTestsAsynchronous/"))
            .json(&body);
        let value: Value = self.send_json(request).await?;
        Ok(job_id_from_response(&value))
    }

    async fn fetch_queue_status(&self, job_id: &str) -> Result<Vec<TestQueueItem>, ToolError> {
        let records = query_all(self, &queue_status_query(job_id)).await?;
        records
            .into_iter()
            .map(|record| {
                serde_json::from_value::<TestQueueItem>(record)
                    .map_err(|err| ToolError::remote(format!("malformed queue item: {err}")))
            })
            .collect()
    }
}

async fn check_status(response: Response) -> Result<Response, ToolError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ToolError::remote_status(status.as_u16(), body))
}

fn job_id_from_response(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ToOwned::to_owned)
}

pub(crate) fn queue_status_query(job_id: &str) -> String {
    format!(
        "SELECT Id, ApexClass.Name, ExtendedStatus, Status FROM ApexTestQueueItem WHERE ParentJobId = '{}'",
        escape_soql_literal(job_id)
    )
}

fn escape_soql_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{RunTestsRequest, ToolingClient, job_id_from_response, queue_status_query};
    use crate::model::TestScope;

    fn client() -> ToolingClient {
        ToolingClient::with_client(
            "https://example.my.salesforce.com/",
            "v59.0",
            "token".to_string(),
            reqwest::Client::new(),
        )
    }

    #[test]
    fn tooling_url_normalizes_instance_and_version() {
        assert_eq!(
            client().tooling_url("query/"),
            "https://example.my.salesforce.com/services/data/v59.0/tooling/query/"
        );
    }

    #[test]
    fn cursor_url_joins_relative_cursor_to_instance() {
        let client = client();
        assert_eq!(
            client.cursor_url("/services/data/v59.0/tooling/query/01g-2000"),
            "https://example.my.salesforce.com/services/data/v59.0/tooling/query/01g-2000"
        );
        assert_eq!(
            client.cursor_url("https://other.example.com/next"),
            "https://other.example.com/next"
        );
    }

    #[test]
    fn run_tests_request_serializes_both_scopes() {
        let classes = TestScope::Classes(vec!["ATest".to_string(), "BTest".to_string()]);
        assert_eq!(
            serde_json::to_value(RunTestsRequest::for_scope(&classes)).expect("serializable"),
            json!({"tests": [{"className": "ATest"}, {"className": "BTest"}]})
        );

        let all = TestScope::AllLocalTests;
        assert_eq!(
            serde_json::to_value(RunTestsRequest::for_scope(&all)).expect("serializable"),
            json!({"testLevel": "RunLocalTests"})
        );
    }

    #[test]
    fn job_id_from_response_requires_non_empty_string() {
        assert_eq!(
            job_id_from_response(&json!("7071x00000ABCDE")).as_deref(),
            Some("7071x00000ABCDE")
        );
        assert_eq!(job_id_from_response(&json!("")), None);
        assert_eq!(job_id_from_response(&json!(null)), None);
    }

    #[test]
    fn queue_status_query_escapes_job_id() {
        assert_eq!(
            queue_status_query("70'7"),
            "SELECT Id, ApexClass.Name, ExtendedStatus, Status FROM ApexTestQueueItem WHERE ParentJobId = '70\\'7'"
        );
    }
}
