use std::sync::Arc;

use reqwest::Method;

use crate::{
    client::ClientInner,
    errors::Result,
    types::{expect_uuid, Deployment, DeploymentEnvironment},
};

/// Query for the `/deployments` listing.
#[derive(Debug, Clone)]
pub struct DeploymentsQuery {
    pub environment: DeploymentEnvironment,
    pub is_fluid: Option<bool>,
    pub page_size: Option<i64>,
    pub offset: Option<i64>,
}

impl DeploymentsQuery {
    pub fn new(environment: DeploymentEnvironment) -> Self {
        Self {
            environment,
            is_fluid: None,
            page_size: None,
            offset: None,
        }
    }
}

/// Deployment catalog operations.
#[derive(Clone)]
pub struct DeploymentsClient {
    pub(crate) inner: Arc<ClientInner>,
}

impl DeploymentsClient {
    /// `GET /deployments`: list deployments for one environment, reduced
    /// to execution-relevant fields (`workflow`/`version` stripped).
    pub async fn list(&self, query: DeploymentsQuery) -> Result<Vec<Deployment>> {
        let mut params: Vec<(&str, String)> =
            vec![("environment", query.environment.as_str().to_string())];
        if let Some(is_fluid) = query.is_fluid {
            params.push(("is_fluid", is_fluid.to_string()));
        }
        if let Some(page_size) = query.page_size {
            params.push(("page_size", page_size.to_string()));
        }
        if let Some(offset) = query.offset {
            params.push(("offset", offset.to_string()));
        }

        let builder = self.inner.request(Method::GET, "/deployments")?.query(&params);
        let deployments: Vec<Deployment> = self.inner.execute_json(builder).await?;
        Self::validate_and_strip(deployments)
    }

    /// `GET /workflow/{id}/deployments`: deployments created from one
    /// workflow, reduced the same way as [`list`](Self::list).
    pub async fn list_by_workflow(&self, workflow_id: &str) -> Result<Vec<Deployment>> {
        expect_uuid(
            workflow_id,
            "workflow_id",
            "Invalid workflow ID format. Please provide a valid UUID.",
        )?;
        let path = format!("/workflow/{workflow_id}/deployments");
        let builder = self.inner.request(Method::GET, &path)?;
        let deployments: Vec<Deployment> = self.inner.execute_json(builder).await?;
        Self::validate_and_strip(deployments)
    }

    /// `GET /deployments/community`: the community catalog. Returned
    /// unstripped: tool synthesis needs the embedded `workflow` reference.
    pub async fn list_community(&self, limit: i64, offset: i64) -> Result<Vec<Deployment>> {
        let params = [("limit", limit.to_string()), ("offset", offset.to_string())];
        let builder = self
            .inner
            .request(Method::GET, "/deployments/community")?
            .query(&params);
        let deployments: Vec<Deployment> = self.inner.execute_json(builder).await?;
        for deployment in &deployments {
            deployment.validate()?;
        }
        Ok(deployments)
    }

    fn validate_and_strip(deployments: Vec<Deployment>) -> Result<Vec<Deployment>> {
        for deployment in &deployments {
            deployment.validate()?;
        }
        Ok(deployments.into_iter().map(Deployment::strip_refs).collect())
    }
}
