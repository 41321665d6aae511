//! Typed Rust client and agent-tool surface for the ComfyDeploy API.
//!
//! Two layers:
//!
//! - A thin HTTP client ([`Client`]) with one sub-client per API area
//!   (shared workflows, deployments, runs, assets). Every response is
//!   decoded and validated before it is returned.
//! - A tool layer ([`tools`], [`dynamic`]) that exposes those calls as
//!   named tools for an agent host: six fixed tools plus one synthesized
//!   tool per community deployment, each with a JSON-Schema parameter
//!   contract derived from the deployment's declared inputs.
#![allow(clippy::result_large_err)]

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.comfydeploy.com/api";

/// Environment variable consulted when `Config.api_key` is unset.
pub const API_KEY_ENV: &str = "COMFY_DEPLOY_API_KEY";

/// Default request timeout (60 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);

mod client;
mod deployments;
pub mod dynamic;
mod errors;
mod runs;
pub mod schema;
pub mod tools;
mod types;
mod upload;
mod workflows;

pub use client::{Client, Config};
pub use deployments::{DeploymentsClient, DeploymentsQuery};
pub use errors::{
    ApiError, ApiErrorShape, Error, FieldDetail, Result, TransportError, TransportErrorKind,
    ValidationError,
};
pub use runs::{RunWorkflowRequest, RunsClient};
pub use tools::{
    builtin_tools, BoxFuture, ContentBlock, ToolDef, ToolHandler, ToolOutput, ToolRegistry,
};
pub use types::{
    Deployment, DeploymentEnvironment, Gpu, InputModel, MachineRef, MediaItem, NodeMeta,
    OutputData, OutputModel, RunList, RunListItem, RunOutput, SharedWorkflow, SharedWorkflowList,
    WorkflowRef,
};
pub use upload::{content_type_for, AssetsClient, UploadedAsset, DEFAULT_TARGET_FOLDER};
pub use workflows::{SharedWorkflowQuery, WorkflowsClient};
