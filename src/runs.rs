use std::sync::Arc;

use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::{
    client::ClientInner,
    errors::{Result, ValidationError},
    types::{expect_uuid, Gpu, RunList, RunOutput},
};

/// Request body for the low-level workflow execution endpoint. This is the
/// advanced/fallback path; prefer
/// [`run_deployment`](RunsClient::run_deployment) where a deployment
/// exists.
#[derive(Debug, Clone, Serialize)]
pub struct RunWorkflowRequest {
    pub model_id: String,
    pub workflow_id: String,
    pub workflow_version_id: String,
    pub gpu: Gpu,
    pub inputs: Map<String, Value>,
    pub origin: String,
    pub batch_number: String,
}

impl RunWorkflowRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (value, field) in [
            (&self.model_id, "model_id"),
            (&self.workflow_id, "workflow_id"),
            (&self.workflow_version_id, "workflow_version_id"),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::new("is required").with_field(field));
            }
        }
        Ok(())
    }
}

/// Execution operations.
#[derive(Clone)]
pub struct RunsClient {
    pub(crate) inner: Arc<ClientInner>,
}

impl RunsClient {
    /// `POST /run/deployment/sync`: execute a deployment with node-id
    /// keyed inputs and return the raw run result.
    pub async fn run_deployment(
        &self,
        deployment_id: &str,
        inputs: Map<String, Value>,
    ) -> Result<Value> {
        expect_uuid(
            deployment_id,
            "deployment_id",
            "Invalid deployment ID format. Please provide a valid UUID.",
        )?;
        let body = json!({
            "deployment_id": deployment_id,
            "inputs": inputs,
        });
        tracing::debug!(deployment_id, body = %body, "running deployment");
        let builder = self
            .inner
            .request(Method::POST, "/run/deployment/sync")?
            .json(&body);
        self.inner.execute_json(builder).await
    }

    /// Like [`run_deployment`](Self::run_deployment), but validates the
    /// response as a run-output sequence.
    pub async fn run_deployment_sync(
        &self,
        deployment_id: &str,
        inputs: Map<String, Value>,
    ) -> Result<Vec<RunOutput>> {
        let raw = self.run_deployment(deployment_id, inputs).await?;
        let outputs: Vec<RunOutput> = serde_json::from_value(raw)?;
        for output in &outputs {
            output.validate()?;
        }
        Ok(outputs)
    }

    /// `POST /run/workflow/sync`: execute a workflow version directly on
    /// a machine, bypassing deployments.
    pub async fn run_workflow(&self, req: RunWorkflowRequest) -> Result<Value> {
        req.validate()?;
        let builder = self
            .inner
            .request(Method::POST, "/run/workflow/sync")?
            .json(&req);
        self.inner.execute_json(builder).await
    }

    /// `GET /runs?deployment_id=...`: run history for one deployment.
    pub async fn list_by_deployment(&self, deployment_id: &str) -> Result<RunList> {
        expect_uuid(
            deployment_id,
            "deployment_id",
            "Invalid deployment ID format. Please provide a valid UUID.",
        )?;
        let builder = self
            .inner
            .request(Method::GET, "/runs")?
            .query(&[("deployment_id", deployment_id)]);
        let list: RunList = self.inner.execute_json(builder).await?;
        list.validate()?;
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_workflow_request_requires_ids() {
        let req = RunWorkflowRequest {
            model_id: "model_1".into(),
            workflow_id: "  ".into(),
            workflow_version_id: "v1".into(),
            gpu: Gpu::T4,
            inputs: Map::new(),
            origin: "api".into(),
            batch_number: "1".into(),
        };
        let err = req.validate().unwrap_err();
        assert_eq!(err.field.as_deref(), Some("workflow_id"));
    }

    #[test]
    fn run_workflow_request_serializes_gpu_label() {
        let req = RunWorkflowRequest {
            model_id: "model_1".into(),
            workflow_id: "wf_1".into(),
            workflow_version_id: "v1".into(),
            gpu: Gpu::A100_80GB,
            inputs: Map::new(),
            origin: "api".into(),
            batch_number: "1".into(),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["gpu"], "A100-80GB");
    }
}
