use std::sync::Arc;

use reqwest::Method;

use crate::{client::ClientInner, errors::Result, types::SharedWorkflowList};

/// Query for the shared-workflow catalog. `limit` and `offset` are applied
/// by the server; the tool layer defaults them to 20 and 0.
#[derive(Debug, Clone, Default)]
pub struct SharedWorkflowQuery {
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Shared-workflow catalog operations.
#[derive(Clone)]
pub struct WorkflowsClient {
    pub(crate) inner: Arc<ClientInner>,
}

impl WorkflowsClient {
    /// `GET /shared-workflows`: browse published workflow templates.
    pub async fn list_shared(&self, query: SharedWorkflowQuery) -> Result<SharedWorkflowList> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(search) = query.search.filter(|s| !s.is_empty()) {
            params.push(("search", search));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(offset) = query.offset {
            params.push(("offset", offset.to_string()));
        }

        let builder = self
            .inner
            .request(Method::GET, "/shared-workflows")?
            .query(&params);
        let list: SharedWorkflowList = self.inner.execute_json(builder).await?;
        list.validate()?;
        Ok(list)
    }
}
