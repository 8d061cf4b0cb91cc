use serde_json::Value;
use tracing::debug;

use super::{QueryApi, QueryPage};
use crate::error::ToolError;

/// Drains a query and every continuation page, in server order.
///
/// Pages are fetched one at a time. Any failure discards the records gathered
/// so far.
pub async fn query_all<Q>(api: &Q, query: &str) -> Result<Vec<Value>, ToolError>
where
    Q: QueryApi + ?Sized,
{
    let first = api.query(query).await?;
    let (mut records, mut cursor) = split_page(first);

    let mut page_count = 1usize;
    while let Some(next) = cursor.take() {
        let page = api.query_more(&next).await?;
        page_count += 1;
        cursor = page.next_records_url.filter(|value| !value.is_empty());
        records.extend(page.records);
    }

    debug!(pages = page_count, records = records.len(), "query drained");
    Ok(records)
}

fn split_page(page: QueryPage) -> (Vec<Value>, Option<String>) {
    if page.total_size == 0 {
        return (Vec::new(), None);
    }
    let cursor = page.next_records_url.filter(|value| !value.is_empty());
    (page.records, cursor)
}
