//! Domain records for the ComfyDeploy API.
//!
//! Every shape crossing the process boundary is deserialized with serde and
//! then checked with `validate()`, which carries the field-level messages
//! the API contract documents. Nullish fields accept both a missing key and
//! an explicit `null`. Free-form substructures (workflow exports, share
//! options, showcase media) are kept as opaque JSON for forward
//! compatibility.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::errors::ValidationError;

/// Deployment lifecycle environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum DeploymentEnvironment {
    #[serde(rename = "staging")]
    Staging,
    #[serde(rename = "production")]
    Production,
    #[serde(rename = "public-share")]
    PublicShare,
    #[serde(rename = "private-share")]
    PrivateShare,
    #[serde(rename = "preview")]
    Preview,
    #[serde(rename = "community-share")]
    CommunityShare,
}

impl DeploymentEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentEnvironment::Staging => "staging",
            DeploymentEnvironment::Production => "production",
            DeploymentEnvironment::PublicShare => "public-share",
            DeploymentEnvironment::PrivateShare => "private-share",
            DeploymentEnvironment::Preview => "preview",
            DeploymentEnvironment::CommunityShare => "community-share",
        }
    }
}

impl fmt::Display for DeploymentEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// GPU tier accepted by the low-level workflow execution endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Gpu {
    #[serde(rename = "CPU")]
    Cpu,
    T4,
    L4,
    #[serde(rename = "A10G")]
    A10G,
    #[serde(rename = "L40G")]
    L40G,
    A100,
    #[serde(rename = "A100-80GB")]
    A100_80GB,
    H100,
    H200,
    B200,
}

/// Workflow reference embedded in a deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRef {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
}

impl WorkflowRef {
    pub fn validate(&self) -> Result<(), ValidationError> {
        expect_uuid(
            &self.id,
            "workflow.id",
            "Invalid workflow ID format. Please provide a valid UUID.",
        )
    }
}

/// Machine reference embedded in a deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineRef {
    pub id: String,
    pub name: String,
}

impl MachineRef {
    pub fn validate(&self) -> Result<(), ValidationError> {
        expect_uuid(
            &self.id,
            "machine.id",
            "Invalid machine ID format. Please provide a valid UUID.",
        )
    }
}

/// One exposed parameter of a deployment.
///
/// `input_id` is the execution-time key the deployment expects;
/// `display_name` is the human-facing label and may be empty, in which case
/// callers fall back to `input_id`. `input_id` is unique within a
/// deployment's input list; `display_name` is not guaranteed unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputModel {
    #[serde(rename = "type")]
    pub kind: String,
    pub class_type: String,
    pub input_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    /// Legacy enum encoding: a JSON string holding an array of strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
}

impl InputModel {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(default) = &self.default_value {
            if default.is_object() {
                return Err(ValidationError::new(
                    "Invalid default value. Must be a string, number, boolean, array, or null.",
                )
                .with_field("default_value"));
            }
        }
        if let Some(options) = &self.options {
            let parsed: Result<Vec<String>, _> = serde_json::from_str(options);
            if parsed.is_err() {
                return Err(ValidationError::new(
                    "Options must be a valid JSON string containing an array of strings.",
                )
                .with_field("options"));
            }
        }
        Ok(())
    }
}

/// A declared output of a deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputModel {
    pub class_type: String,
    pub output_id: String,
}

/// An executable, configured instance of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_version_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_options: Option<serde_json::Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub showcase_media: Option<Vec<serde_json::Map<String, Value>>>,
    pub environment: DeploymentEnvironment,
    #[serde(
        default,
        deserialize_with = "datetime::deserialize_opt",
        serialize_with = "datetime::serialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
    #[serde(
        default,
        deserialize_with = "datetime::deserialize_opt",
        serialize_with = "datetime::serialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(
        default,
        deserialize_with = "datetime::deserialize_opt",
        serialize_with = "datetime::serialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub activated_at: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<WorkflowRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<serde_json::Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine: Option<MachineRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_types: Option<Vec<InputModel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_types: Option<Vec<OutputModel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dub_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_version_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modal_image_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency_limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_timeout: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_timeout: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_warm: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modal_app_id: Option<String>,
}

impl Deployment {
    pub fn validate(&self) -> Result<(), ValidationError> {
        expect_uuid(
            &self.id,
            "id",
            "Invalid deployment ID format. Please provide a valid UUID.",
        )?;
        expect_uuid_opt(
            self.workflow_version_id.as_deref(),
            "workflow_version_id",
            "Invalid workflow version ID format. Please provide a valid UUID.",
        )?;
        expect_uuid_opt(
            self.workflow_id.as_deref(),
            "workflow_id",
            "Invalid workflow ID format. Please provide a valid UUID.",
        )?;
        expect_uuid_opt(
            self.machine_id.as_deref(),
            "machine_id",
            "Invalid machine ID format. Please provide a valid UUID.",
        )?;
        expect_uuid_opt(
            self.machine_version_id.as_deref(),
            "machine_version_id",
            "Invalid machine version ID format. Please provide a valid UUID.",
        )?;
        if let Some(workflow) = &self.workflow {
            workflow.validate()?;
        }
        if let Some(machine) = &self.machine {
            machine.validate()?;
        }
        for input in self.input_types.iter().flatten() {
            input.validate()?;
        }
        Ok(())
    }

    /// Drop the `workflow` and `version` sub-objects, keeping every other
    /// field unchanged. List endpoints return deployments in this reduced
    /// form so callers only see execution-relevant fields.
    pub fn strip_refs(mut self) -> Self {
        self.workflow = None;
        self.version = None;
        self
    }
}

/// One media artifact produced by a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subfolder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_duration: Option<f64>,
}

/// Media grouped by kind for one run output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<MediaItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<MediaItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gifs: Option<Vec<MediaItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub videos: Option<Vec<MediaItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_files: Option<Vec<MediaItem>>,
}

/// Node metadata attached to a run output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
}

/// One output record of a synchronous deployment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_id: Option<String>,
    pub run_id: String,
    pub data: OutputData,
    #[serde(default)]
    pub node_meta: NodeMeta,
    #[serde(with = "datetime")]
    pub created_at: OffsetDateTime,
    #[serde(with = "datetime")]
    pub updated_at: OffsetDateTime,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
}

impl RunOutput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        expect_uuid(
            &self.id,
            "id",
            "Invalid output ID format. Please provide a valid UUID.",
        )?;
        expect_uuid(
            &self.run_id,
            "run_id",
            "Invalid run ID format. Please provide a valid UUID.",
        )
    }
}

/// A publishable workflow snapshot from the community catalog.
///
/// `workflow_export` is an opaque passthrough blob (nodes/links/groups and
/// editor config); it is deliberately not modeled field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedWorkflow {
    pub id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    pub workflow_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_version_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_export: Option<Value>,
    pub share_slug: String,
    pub title: String,
    pub description: String,
    pub cover_image: String,
    pub is_public: bool,
    pub view_count: i64,
    pub download_count: i64,
    #[serde(with = "datetime")]
    pub created_at: OffsetDateTime,
    #[serde(with = "datetime")]
    pub updated_at: OffsetDateTime,
}

impl SharedWorkflow {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.view_count < 0 {
            return Err(ValidationError::new(
                "View count must be a non-negative integer.",
            )
            .with_field("view_count"));
        }
        if self.download_count < 0 {
            return Err(ValidationError::new(
                "Download count must be a non-negative integer.",
            )
            .with_field("download_count"));
        }
        Ok(())
    }
}

/// Paginated shared-workflow listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedWorkflowList {
    pub shared_workflows: Vec<SharedWorkflow>,
    pub total: i64,
}

impl SharedWorkflowList {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.total < 0 {
            return Err(
                ValidationError::new("Total count must be a non-negative integer.")
                    .with_field("total"),
            );
        }
        for workflow in &self.shared_workflows {
            workflow.validate()?;
        }
        Ok(())
    }
}

/// One entry of a deployment's run history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunListItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_version_id: Option<String>,
    pub deployment_id: String,
    pub workflow_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<String>,
    pub origin: String,
    pub status: String,
    #[serde(
        default,
        deserialize_with = "datetime::deserialize_opt",
        serialize_with = "datetime::serialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub ended_at: Option<OffsetDateTime>,
    #[serde(with = "datetime")]
    pub created_at: OffsetDateTime,
    #[serde(
        default,
        deserialize_with = "datetime::deserialize_opt",
        serialize_with = "datetime::serialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub started_at: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl RunListItem {
    pub fn validate(&self) -> Result<(), ValidationError> {
        expect_uuid(
            &self.id,
            "id",
            "Invalid run ID format. Please provide a valid UUID.",
        )?;
        expect_uuid(
            &self.deployment_id,
            "deployment_id",
            "Invalid deployment ID format. Please provide a valid UUID.",
        )?;
        expect_uuid(
            &self.workflow_id,
            "workflow_id",
            "Invalid workflow ID format. Please provide a valid UUID.",
        )
    }
}

/// Run history for one deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunList {
    pub data: Vec<RunListItem>,
}

impl RunList {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for item in &self.data {
            item.validate()?;
        }
        Ok(())
    }
}

pub(crate) fn expect_uuid(
    value: &str,
    field: &'static str,
    message: &'static str,
) -> Result<(), ValidationError> {
    Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new(message).with_field(field))
}

fn expect_uuid_opt(
    value: Option<&str>,
    field: &'static str,
    message: &'static str,
) -> Result<(), ValidationError> {
    match value {
        Some(value) => expect_uuid(value, field, message),
        None => Ok(()),
    }
}

/// Date coercion: RFC 3339 / ISO 8601 strings and unix timestamps both
/// decode to [`OffsetDateTime`]; anything else is a deserialize error.
/// Values serialize back as RFC 3339, which re-validates on the way in.
pub(crate) mod datetime {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;
    use time::format_description::well_known::{Iso8601, Rfc3339};
    use time::OffsetDateTime;

    pub fn serialize<S: Serializer>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        let text = value.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OffsetDateTime, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn serialize_opt<S: Serializer>(
        value: &Option<OffsetDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serialize(value, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize_opt<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<OffsetDateTime>, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        if raw.is_null() {
            return Ok(None);
        }
        parse(&raw).map(Some).map_err(serde::de::Error::custom)
    }

    pub(crate) fn parse(value: &Value) -> Result<OffsetDateTime, String> {
        match value {
            Value::String(text) => OffsetDateTime::parse(text, &Rfc3339)
                .or_else(|_| OffsetDateTime::parse(text, &Iso8601::DEFAULT))
                .map_err(|_| format!("Invalid date: {text:?}. Please provide a valid date.")),
            Value::Number(num) => {
                let seconds = num
                    .as_f64()
                    .ok_or_else(|| format!("Invalid date: {num}. Please provide a valid date."))?;
                OffsetDateTime::from_unix_timestamp_nanos((seconds * 1e9) as i128)
                    .map_err(|_| format!("Invalid date: {num}. Please provide a valid date."))
            }
            other => Err(format!("Invalid date: {other}. Please provide a valid date.")),
        }
    }
}
