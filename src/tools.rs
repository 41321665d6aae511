//! Agent-facing tool surface.
//!
//! A tool is a (name, description, parameter schema, handler) record. The
//! six builtin tools wrap the fixed API operations; [`crate::dynamic`]
//! synthesizes additional tools from the community deployment catalog.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    client::Client,
    deployments::DeploymentsQuery,
    errors::{Error, Result, ValidationError},
    runs::RunWorkflowRequest,
    types::{DeploymentEnvironment, Gpu},
    upload::DEFAULT_TARGET_FOLDER,
    workflows::SharedWorkflowQuery,
};

/// One agent-consumable content block of a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
}

/// Result of one tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub content: Vec<ContentBlock>,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    /// Serialize a value as one JSON text block.
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self::text(serde_json::to_string(value)?))
    }
}

/// A boxed future type for async tool handlers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Handler function type: receives the caller's JSON arguments and
/// produces the tool output.
pub type ToolHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<ToolOutput>> + Send + Sync>;

/// A named tool with its parameter contract and executable handler.
#[derive(Clone)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    /// JSON-Schema object describing the accepted arguments.
    pub parameters: Value,
    pub handler: ToolHandler,
}

impl std::fmt::Debug for ToolDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDef")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Registry mapping tool names to definitions with dispatch.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolDef>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Returns self for chaining; a later tool with the
    /// same name replaces the earlier one.
    pub fn register(mut self, tool: ToolDef) -> Self {
        self.tools.insert(tool.name.clone(), tool);
        self
    }

    pub fn register_all(mut self, tools: impl IntoIterator<Item = ToolDef>) -> Self {
        for tool in tools {
            self.tools.insert(tool.name.clone(), tool);
        }
        self
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ToolDef> {
        self.tools.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Execute one tool by name.
    pub async fn execute(&self, name: &str, args: Value) -> Result<ToolOutput> {
        let tool = self.tools.get(name).ok_or_else(|| {
            Error::Validation(ValidationError::new(format!("unknown tool '{name}'")))
        })?;
        (tool.handler)(args).await
    }

    /// Execute several calls concurrently, preserving order.
    pub async fn execute_all(&self, calls: Vec<(String, Value)>) -> Vec<Result<ToolOutput>> {
        let futures: Vec<_> = calls
            .into_iter()
            .map(|(name, args)| async move { self.execute(&name, args).await })
            .collect();
        futures::future::join_all(futures).await
    }
}

/// JSON-Schema parameter contract derived from a Rust argument type.
pub fn tool_parameters_for<T: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(&schema).unwrap_or_else(|_| json!({ "type": "object" }))
}

/// Parse and schema-validate caller arguments for a tool.
fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|err| {
        Error::Validation(ValidationError::new(format!(
            "invalid arguments for tool '{tool}': {err}"
        )))
    })
}

fn default_limit() -> i64 {
    20
}

fn default_target_folder() -> String {
    DEFAULT_TARGET_FOLDER.to_string()
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ListSharedWorkflowsArgs {
    /// Keyword search over workflow titles and descriptions.
    #[serde(default)]
    search: Option<String>,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ListDeploymentsArgs {
    environment: DeploymentEnvironment,
    #[serde(default)]
    is_fluid: Option<bool>,
    #[serde(default)]
    page_size: Option<i64>,
    #[serde(default)]
    offset: Option<i64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ListDeploymentsByWorkflowArgs {
    workflow_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct RunDeploymentArgs {
    deployment_id: String,
    /// Flat node-id keyed inputs, e.g. `{"6": "positive prompt"}`.
    #[serde(default)]
    inputs: HashMap<String, Value>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct RunWorkflowArgs {
    model_id: String,
    workflow_id: String,
    workflow_version_id: String,
    gpu: Gpu,
    inputs: HashMap<String, Value>,
    origin: String,
    batch_number: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct UploadFileArgs {
    /// Local file path to upload.
    file_path: String,
    /// Target folder name on the server.
    #[serde(default = "default_target_folder")]
    target_folder: String,
}

/// Browse shared workflow templates from the community.
pub fn list_shared_workflows_tool(client: &Client) -> ToolDef {
    let client = client.clone();
    ToolDef {
        name: "list-shared-workflows".into(),
        description: "Browse shared workflow templates from the ComfyDeploy community. \
            Workflows are the base ComfyUI configurations before deployment; use \
            list-deployments-by-workflow to find executable deployments of a workflow. \
            Search by keywords, trying broader terms first, then specific ones."
            .into(),
        parameters: tool_parameters_for::<ListSharedWorkflowsArgs>(),
        handler: Arc::new(move |args| {
            let client = client.clone();
            Box::pin(async move {
                let args: ListSharedWorkflowsArgs = parse_args("list-shared-workflows", args)?;
                let list = client
                    .workflows()
                    .list_shared(SharedWorkflowQuery {
                        search: args.search,
                        limit: Some(args.limit),
                        offset: Some(args.offset),
                    })
                    .await?;
                ToolOutput::json(&list)
            })
        }),
    }
}

/// List deployments for one environment.
pub fn list_deployments_tool(client: &Client) -> ToolDef {
    let client = client.clone();
    ToolDef {
        name: "list-deployments".into(),
        description: "List available AI generation deployments. Deployments are \
            production-ready versions of ComfyUI workflows; each has a deployment_id \
            usable with run-deployment. Filter by environment: 'private-share' for your \
            own deployments, 'public-share' for deployments shared with you, \
            'community-share' for community deployments."
            .into(),
        parameters: tool_parameters_for::<ListDeploymentsArgs>(),
        handler: Arc::new(move |args| {
            let client = client.clone();
            Box::pin(async move {
                let args: ListDeploymentsArgs = parse_args("list-deployments", args)?;
                let mut query = DeploymentsQuery::new(args.environment);
                query.is_fluid = args.is_fluid;
                query.page_size = args.page_size;
                query.offset = args.offset;
                let deployments = client.deployments().list(query).await?;
                ToolOutput::json(&deployments)
            })
        }),
    }
}

/// List deployments created from one workflow.
pub fn list_deployments_by_workflow_tool(client: &Client) -> ToolDef {
    let client = client.clone();
    ToolDef {
        name: "list-deployments-by-workflow".into(),
        description: "List available AI generation deployments for a specific workflow. \
            Use this after finding suitable workflows via list-shared-workflows to get \
            the deployments you can actually execute."
            .into(),
        parameters: tool_parameters_for::<ListDeploymentsByWorkflowArgs>(),
        handler: Arc::new(move |args| {
            let client = client.clone();
            Box::pin(async move {
                let args: ListDeploymentsByWorkflowArgs =
                    parse_args("list-deployments-by-workflow", args)?;
                let deployments = client
                    .deployments()
                    .list_by_workflow(&args.workflow_id)
                    .await?;
                ToolOutput::json(&deployments)
            })
        }),
    }
}

/// Execute a deployment with node-id keyed inputs.
pub fn run_deployment_tool(client: &Client) -> ToolDef {
    let client = client.clone();
    ToolDef {
        name: "run-deployment".into(),
        description: "Execute a specific AI generation deployment with user-provided \
            inputs and return the raw run result. Inputs must be a flat key-value object \
            keyed by node id, e.g. {\"6\": \"positive prompt\", \"7\": \"negative prompt\"}, \
            not nested objects."
            .into(),
        parameters: tool_parameters_for::<RunDeploymentArgs>(),
        handler: Arc::new(move |args| {
            let client = client.clone();
            Box::pin(async move {
                let args: RunDeploymentArgs = parse_args("run-deployment", args)?;
                let inputs = args.inputs.into_iter().collect();
                let result = client
                    .runs()
                    .run_deployment(&args.deployment_id, inputs)
                    .await?;
                ToolOutput::json(&result)
            })
        }),
    }
}

/// Advanced/fallback path: execute a workflow version directly.
pub fn run_workflow_tool(client: &Client) -> ToolDef {
    let client = client.clone();
    ToolDef {
        name: "run-workflow".into(),
        description: "Run a workflow version directly on a machine. Advanced fallback \
            for workflows without a deployment; prefer run-deployment."
            .into(),
        parameters: tool_parameters_for::<RunWorkflowArgs>(),
        handler: Arc::new(move |args| {
            let client = client.clone();
            Box::pin(async move {
                let args: RunWorkflowArgs = parse_args("run-workflow", args)?;
                let result = client
                    .runs()
                    .run_workflow(RunWorkflowRequest {
                        model_id: args.model_id,
                        workflow_id: args.workflow_id,
                        workflow_version_id: args.workflow_version_id,
                        gpu: args.gpu,
                        inputs: args.inputs.into_iter().collect(),
                        origin: args.origin,
                        batch_number: args.batch_number,
                    })
                    .await?;
                ToolOutput::json(&result)
            })
        }),
    }
}

/// Upload a local file to the asset system.
pub fn upload_file_tool(client: &Client) -> ToolDef {
    let client = client.clone();
    ToolDef {
        name: "upload-file".into(),
        description: "Upload a local file to ComfyDeploy's asset system and get the URL \
            for use in deployments. The returned URL can be used as input for deployments \
            that require file inputs (images, videos, documents). Creates the target \
            folder if it doesn't exist."
            .into(),
        parameters: tool_parameters_for::<UploadFileArgs>(),
        handler: Arc::new(move |args| {
            let client = client.clone();
            Box::pin(async move {
                let args: UploadFileArgs = parse_args("upload-file", args)?;
                let asset = client
                    .assets()
                    .upload(&args.file_path, &args.target_folder)
                    .await?;
                ToolOutput::json(&asset)
            })
        }),
    }
}

/// All six fixed tools over one client.
pub fn builtin_tools(client: &Client) -> Vec<ToolDef> {
    vec![
        list_shared_workflows_tool(client),
        list_deployments_tool(client),
        list_deployments_by_workflow_tool(client),
        run_deployment_tool(client),
        run_workflow_tool(client),
        upload_file_tool(client),
    ]
}
