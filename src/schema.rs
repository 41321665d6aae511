//! Parameter-contract derivation for dynamically synthesized tools.
//!
//! Community deployments describe their inputs with loosely-typed
//! [`InputModel`] records. [`derive_parameter`] maps each record onto a
//! closed [`ParamKind`] variant, and [`parameters_schema`] renders a set of
//! derived parameters as a JSON-Schema object, keeping the derivation
//! testable independently of any schema library.

use serde_json::{json, Map, Value};

use crate::errors::ValidationError;
use crate::types::InputModel;

/// Closed set of parameter shapes a deployment input can map to.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    Numeric {
        minimum: Option<f64>,
        maximum: Option<f64>,
    },
    Boolean,
    Enum {
        choices: Vec<String>,
    },
    Text,
}

/// A derived, user-facing parameter of a synthesized tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    /// User-facing key: the input's display name, falling back to its
    /// node id when no display name is set.
    pub key: String,
    pub description: String,
    pub kind: ParamKind,
    /// Attached default. `Some` makes the parameter optional.
    pub default: Option<Value>,
}

impl ParameterSpec {
    pub fn required(&self) -> bool {
        self.default.is_none()
    }

    /// Render this parameter as a JSON-Schema fragment.
    pub fn json_schema(&self) -> Value {
        let mut schema = match &self.kind {
            ParamKind::Numeric { minimum, maximum } => {
                let mut fragment = json!({ "type": "number" });
                if let Some(minimum) = minimum {
                    fragment["minimum"] = json!(minimum);
                }
                if let Some(maximum) = maximum {
                    fragment["maximum"] = json!(maximum);
                }
                fragment
            }
            ParamKind::Boolean => json!({ "type": "boolean" }),
            ParamKind::Enum { choices } => json!({ "type": "string", "enum": choices }),
            ParamKind::Text => json!({ "type": "string" }),
        };
        schema["description"] = json!(self.description);
        if let Some(default) = &self.default {
            schema["default"] = default.clone();
        }
        schema
    }

    /// Check one caller-supplied value against this parameter's kind.
    pub fn check(&self, value: &Value) -> Result<(), ValidationError> {
        match &self.kind {
            ParamKind::Numeric { minimum, maximum } => {
                let number = value.as_f64().ok_or_else(|| {
                    ValidationError::new("must be a number").with_field(self.key.as_str())
                })?;
                if let Some(minimum) = minimum {
                    if number < *minimum {
                        return Err(ValidationError::new(format!("must be at least {minimum}"))
                            .with_field(self.key.as_str()));
                    }
                }
                if let Some(maximum) = maximum {
                    if number > *maximum {
                        return Err(ValidationError::new(format!("must be at most {maximum}"))
                            .with_field(self.key.as_str()));
                    }
                }
                Ok(())
            }
            ParamKind::Boolean => {
                if value.is_boolean() {
                    Ok(())
                } else {
                    Err(ValidationError::new("must be a boolean").with_field(self.key.as_str()))
                }
            }
            ParamKind::Enum { choices } => {
                let text = value.as_str().ok_or_else(|| {
                    ValidationError::new("must be a string").with_field(self.key.as_str())
                })?;
                if choices.iter().any(|choice| choice == text) {
                    Ok(())
                } else {
                    Err(
                        ValidationError::new(format!("must be one of: {}", choices.join(", ")))
                            .with_field(self.key.as_str()),
                    )
                }
            }
            ParamKind::Text => {
                if value.is_string() {
                    Ok(())
                } else {
                    Err(ValidationError::new("must be a string").with_field(self.key.as_str()))
                }
            }
        }
    }
}

/// User-facing key for one deployment input.
pub fn resolve_key(input: &InputModel) -> String {
    if input.display_name.is_empty() {
        input.input_id.clone()
    } else {
        input.display_name.clone()
    }
}

/// Map one deployment input onto a typed parameter.
///
/// Non-empty `enum_options` always win and produce a closed string
/// enumeration, regardless of the declared type. Otherwise the declared
/// type picks numeric (with bounds when present) or boolean, and anything
/// unrecognized becomes free-form text.
///
/// A default is attached only when its JSON runtime type equals the
/// declared type string, so a numeric default on an input declared
/// `integer` (runtime type "number") stays unattached and the parameter is
/// required. Untyped catalog defaults must not silently become tool
/// defaults.
pub fn derive_parameter(input: &InputModel) -> ParameterSpec {
    let kind = match &input.enum_options {
        Some(choices) if !choices.is_empty() => ParamKind::Enum {
            choices: choices.clone(),
        },
        _ => match input.kind.as_str() {
            "integer" | "float" | "number" => ParamKind::Numeric {
                minimum: input.min_value,
                maximum: input.max_value,
            },
            "boolean" => ParamKind::Boolean,
            _ => ParamKind::Text,
        },
    };

    let description = if input.description.is_empty() {
        format!("Input for node {}", input.input_id)
    } else {
        input.description.clone()
    };

    let default = input
        .default_value
        .clone()
        .filter(|value| !value.is_null())
        .filter(|value| json_type_name(value) == input.kind);

    ParameterSpec {
        key: resolve_key(input),
        description,
        kind,
        default,
    }
}

/// Render a parameter set as one JSON-Schema object. Parameters resolving
/// to the same key collide; the later entry fully supersedes the earlier
/// one (an accepted data-quality limitation of the source catalog).
pub fn parameters_schema(params: &[ParameterSpec]) -> Value {
    let mut properties = Map::new();
    let mut required_by_key = Map::new();
    for param in params {
        properties.insert(param.key.clone(), param.json_schema());
        required_by_key.insert(param.key.clone(), Value::Bool(param.required()));
    }
    let required: Vec<&String> = required_by_key
        .iter()
        .filter(|(_, required)| required.as_bool() == Some(true))
        .map(|(key, _)| key)
        .collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Enforce a parameter set over caller arguments: every supplied value
/// must pass its parameter's [`check`](ParameterSpec::check), omitted
/// required parameters are rejected, and omitted optional parameters get
/// their attached default merged in. Keys matching no parameter pass
/// through untouched. Superseded collision entries are skipped, consistent
/// with [`parameters_schema`].
pub fn validate_arguments(
    params: &[ParameterSpec],
    args: &Map<String, Value>,
) -> Result<Map<String, Value>, ValidationError> {
    let mut merged = args.clone();
    for (index, param) in params.iter().enumerate() {
        if params[index + 1..].iter().any(|later| later.key == param.key) {
            continue;
        }
        match merged.get(&param.key) {
            Some(value) => param.check(value)?,
            None => match &param.default {
                Some(default) => {
                    merged.insert(param.key.clone(), default.clone());
                }
                None => {
                    return Err(ValidationError::new("is required").with_field(param.key.as_str()))
                }
            },
        }
    }
    Ok(merged)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
