//! Dynamic tool synthesis from the community deployment catalog.
//!
//! One catalog page is fetched at startup and each eligible deployment is
//! turned into a dedicated tool whose parameter schema is derived from the
//! deployment's declared inputs. Callers address parameters by display
//! name; the handler enforces the derived contract, fills in defaults for
//! omitted optional parameters, and remaps the keys to node ids before
//! execution.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::{
    client::Client,
    errors::{Error, ValidationError},
    schema::{derive_parameter, parameters_schema, resolve_key, validate_arguments, ParameterSpec},
    tools::{ContentBlock, ToolDef, ToolOutput},
    types::{Deployment, InputModel, RunOutput},
    upload::content_type_for,
};

/// Catalog page size used for synthesis. One page only; the long tail of
/// community deployments stays reachable through run-deployment.
pub const COMMUNITY_PAGE_SIZE: i64 = 20;

const SHARE_SLUG_PREFIX: &str = "comfy-deploy_";

/// Fetch the community catalog and synthesize one tool per eligible
/// deployment. A catalog fetch failure degrades to an empty set so the
/// fixed tools stay usable.
pub async fn synthesize_community_tools(client: &Client) -> Vec<ToolDef> {
    let deployments = match client
        .deployments()
        .list_community(COMMUNITY_PAGE_SIZE, 0)
        .await
    {
        Ok(deployments) => deployments,
        Err(err) => {
            tracing::warn!(error = %err, "community catalog unavailable, skipping tool synthesis");
            return Vec::new();
        }
    };

    deployments
        .into_iter()
        .filter(is_eligible)
        .map(|deployment| build_tool(client, deployment))
        .collect()
}

/// A deployment is synthesizable when it can be addressed (non-empty id)
/// and presented (a workflow with a non-empty name).
fn is_eligible(deployment: &Deployment) -> bool {
    !deployment.id.is_empty()
        && deployment
            .workflow
            .as_ref()
            .is_some_and(|workflow| !workflow.name.is_empty())
}

/// Tool name: the share slug with its platform prefix removed, falling
/// back to the deployment id.
fn tool_name(deployment: &Deployment) -> String {
    match deployment.share_slug.as_deref() {
        Some(slug) if !slug.is_empty() => slug
            .strip_prefix(SHARE_SLUG_PREFIX)
            .unwrap_or(slug)
            .to_string(),
        _ => deployment.id.clone(),
    }
}

fn tool_description(deployment: &Deployment, workflow_name: &str) -> String {
    let base = deployment
        .description
        .as_deref()
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Run the {workflow_name} workflow"));
    format!("{base}. Workflow: {workflow_name}")
}

/// Wrap the derived per-parameter schema in the single required `inputs`
/// argument the handler expects.
fn tool_parameters(params: &[ParameterSpec]) -> Value {
    let mut inputs = parameters_schema(params);
    if let Some(obj) = inputs.as_object_mut() {
        obj.insert(
            "description".into(),
            json!("Input parameters for the workflow"),
        );
    }
    json!({
        "type": "object",
        "properties": { "inputs": inputs },
        "required": ["inputs"]
    })
}

#[derive(Debug, Deserialize)]
struct DynamicArgs {
    #[serde(default)]
    inputs: Map<String, Value>,
}

fn build_tool(client: &Client, deployment: Deployment) -> ToolDef {
    let workflow_name = deployment
        .workflow
        .as_ref()
        .map(|workflow| workflow.name.clone())
        .unwrap_or_default();
    let input_types: Vec<InputModel> = deployment.input_types.clone().unwrap_or_default();
    let params: Vec<ParameterSpec> = input_types.iter().map(derive_parameter).collect();

    let name = tool_name(&deployment);
    let description = tool_description(&deployment, &workflow_name);
    let parameters = tool_parameters(&params);

    let client = client.clone();
    let deployment_id = deployment.id;
    let input_types = Arc::new(input_types);
    let params = Arc::new(params);
    let handler_name = name.clone();

    ToolDef {
        name,
        description,
        parameters,
        handler: Arc::new(move |args| {
            let client = client.clone();
            let deployment_id = deployment_id.clone();
            let input_types = input_types.clone();
            let params = params.clone();
            let handler_name = handler_name.clone();
            Box::pin(async move {
                let args = if args.is_null() { json!({}) } else { args };
                let args: DynamicArgs = serde_json::from_value(args).map_err(|err| {
                    Error::Validation(ValidationError::new(format!(
                        "invalid arguments for tool '{handler_name}': {err}"
                    )))
                })?;
                let inputs = validate_arguments(&params, &args.inputs)?;
                let payload = remap_inputs(&input_types, &inputs);
                let outputs = client
                    .runs()
                    .run_deployment_sync(&deployment_id, payload)
                    .await?;
                Ok(shape_run_output(&outputs))
            })
        }),
    }
}

/// Translate display-name keyed arguments back to node-id keys. Keys
/// matching no declared input are dropped; inputs with no matching key
/// stay absent from the payload.
fn remap_inputs(input_types: &[InputModel], args: &Map<String, Value>) -> Map<String, Value> {
    let mut payload = Map::new();
    for input in input_types {
        if let Some(value) = args.get(&resolve_key(input)) {
            payload.insert(input.input_id.clone(), value.clone());
        }
    }
    payload
}

/// Condense a synchronous run result into agent-consumable blocks: a
/// summary line plus one image block per addressable image. Only the
/// first output record is considered.
fn shape_run_output(outputs: &[RunOutput]) -> ToolOutput {
    let images = outputs
        .first()
        .and_then(|output| output.data.images.as_deref())
        .unwrap_or_default();

    let noun = if images.len() == 1 { "image" } else { "images" };
    let mut content = vec![ContentBlock::Text {
        text: format!("Generated {} {noun}", images.len()),
    }];
    for item in images {
        if item.url.is_empty() {
            continue;
        }
        content.push(ContentBlock::Image {
            url: item.url.clone(),
            mime_type: Some(content_type_for(&item.filename).to_string()),
        });
    }
    ToolOutput { content }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Config;
    use crate::types::MediaItem;
    use serde_json::json;

    fn test_client() -> Client {
        Client::new(Config {
            api_key: Some("cd_test".into()),
            base_url: Some("http://127.0.0.1:9".into()),
            ..Default::default()
        })
        .expect("client")
    }

    fn deployment(raw: Value) -> Deployment {
        serde_json::from_value(raw).expect("deployment")
    }

    fn community_deployment() -> Deployment {
        deployment(json!({
            "id": "0a1b2c3d-0000-4000-8000-000000000001",
            "user_id": "user_1",
            "environment": "community-share",
            "share_slug": "comfy-deploy_sdxl-turbo",
            "description": "Fast text to image",
            "workflow": {
                "id": "0a1b2c3d-0000-4000-8000-000000000002",
                "name": "SDXL Turbo"
            },
            "input_types": [
                {
                    "type": "string",
                    "class_type": "ComfyUIDeployExternalText",
                    "input_id": "6",
                    "display_name": "Prompt"
                },
                {
                    "type": "integer",
                    "class_type": "ComfyUIDeployExternalNumberInt",
                    "input_id": "7",
                    "display_name": "Steps",
                    "min_value": 1.0,
                    "max_value": 50.0
                }
            ]
        }))
    }

    #[test]
    fn tool_name_strips_slug_prefix() {
        assert_eq!(tool_name(&community_deployment()), "sdxl-turbo");
    }

    #[test]
    fn tool_name_falls_back_to_deployment_id() {
        let mut dep = community_deployment();
        dep.share_slug = None;
        assert_eq!(tool_name(&dep), "0a1b2c3d-0000-4000-8000-000000000001");

        dep.share_slug = Some("custom-slug".into());
        assert_eq!(tool_name(&dep), "custom-slug");
    }

    #[test]
    fn description_joins_workflow_name() {
        let dep = community_deployment();
        assert_eq!(
            tool_description(&dep, "SDXL Turbo"),
            "Fast text to image. Workflow: SDXL Turbo"
        );

        let mut bare = dep;
        bare.description = None;
        assert_eq!(
            tool_description(&bare, "SDXL Turbo"),
            "Run the SDXL Turbo workflow. Workflow: SDXL Turbo"
        );
    }

    #[test]
    fn eligibility_requires_id_and_workflow_name() {
        assert!(is_eligible(&community_deployment()));

        let mut missing_workflow = community_deployment();
        missing_workflow.workflow = None;
        assert!(!is_eligible(&missing_workflow));

        let mut blank_name = community_deployment();
        blank_name.workflow.as_mut().unwrap().name.clear();
        assert!(!is_eligible(&blank_name));

        let mut blank_id = community_deployment();
        blank_id.id.clear();
        assert!(!is_eligible(&blank_id));
    }

    #[test]
    fn parameters_wrap_inputs_object() {
        let tool = build_tool(&test_client(), community_deployment());
        assert_eq!(tool.parameters["type"], "object");
        assert_eq!(tool.parameters["required"], json!(["inputs"]));
        let inputs = &tool.parameters["properties"]["inputs"];
        assert_eq!(inputs["description"], "Input parameters for the workflow");
        assert!(inputs["properties"]["Prompt"].is_object());
        assert_eq!(inputs["properties"]["Steps"]["minimum"], json!(1.0));
    }

    #[test]
    fn remap_translates_display_names_and_drops_omitted() {
        let dep = community_deployment();
        let input_types = dep.input_types.unwrap();
        let mut args = Map::new();
        args.insert("Prompt".into(), json!("a red fox"));
        args.insert("Unknown".into(), json!(true));

        let payload = remap_inputs(&input_types, &args);
        assert_eq!(payload.get("6"), Some(&json!("a red fox")));
        assert!(!payload.contains_key("7"));
        assert_eq!(payload.len(), 1);
    }

    fn run_output_with_images(images: Vec<MediaItem>) -> RunOutput {
        serde_json::from_value(json!({
            "id": "0a1b2c3d-0000-4000-8000-00000000000a",
            "run_id": "0a1b2c3d-0000-4000-8000-00000000000b",
            "data": { "images": images },
            "created_at": "2024-05-01T12:00:00Z",
            "updated_at": "2024-05-01T12:00:00Z"
        }))
        .expect("run output")
    }

    fn image(url: &str) -> MediaItem {
        MediaItem {
            url: url.into(),
            kind: "output".into(),
            filename: "out.png".into(),
            is_public: None,
            subfolder: None,
            upload_duration: None,
        }
    }

    #[test]
    fn summary_pluralizes_image_counts() {
        let none = shape_run_output(&[]);
        assert_eq!(
            none.content,
            vec![ContentBlock::Text {
                text: "Generated 0 images".into()
            }]
        );

        let one = shape_run_output(&[run_output_with_images(vec![image("https://cdn/x.png")])]);
        assert_eq!(
            one.content[0],
            ContentBlock::Text {
                text: "Generated 1 image".into()
            }
        );
        assert_eq!(one.content.len(), 2);

        let two = shape_run_output(&[run_output_with_images(vec![
            image("https://cdn/a.png"),
            image("https://cdn/b.png"),
        ])]);
        assert_eq!(
            two.content[0],
            ContentBlock::Text {
                text: "Generated 2 images".into()
            }
        );
    }

    #[test]
    fn urlless_images_are_counted_but_not_linked() {
        let output = shape_run_output(&[run_output_with_images(vec![
            image("https://cdn/a.png"),
            image(""),
        ])]);
        assert_eq!(
            output.content[0],
            ContentBlock::Text {
                text: "Generated 2 images".into()
            }
        );
        assert_eq!(output.content.len(), 2);
        assert_eq!(
            output.content[1],
            ContentBlock::Image {
                url: "https://cdn/a.png".into(),
                mime_type: Some("image/png".into()),
            }
        );
    }
}
