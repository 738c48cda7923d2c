//! Two-phase workflow document validation.
//!
//! Phase one walks the fixed structural schema and collects every violation.
//! Phase two only runs on structurally valid documents and checks that the
//! keys of `connections` name declared nodes. Optionally it also checks the
//! targets nested inside each fan-out entry.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;

use crate::schema::Workflow;

/// One validation finding, shaped like a JSON-Schema error record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub instance_path: String,
    pub schema_path: String,
    pub keyword: String,
    pub params: Value,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Option<Vec<ErrorDetail>>,
}

impl ValidationResult {
    fn ok() -> Self {
        Self {
            valid: true,
            errors: None,
        }
    }

    fn failed(errors: Vec<ErrorDetail>) -> Self {
        Self {
            valid: false,
            errors: Some(errors),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Kind {
    String,
    Number,
    Object,
    Array,
}

impl Kind {
    fn name(self) -> &'static str {
        match self {
            Kind::String => "string",
            Kind::Number => "number",
            Kind::Object => "object",
            Kind::Array => "array",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            Kind::String => value.is_string(),
            Kind::Number => value.is_number(),
            Kind::Object => value.is_object(),
            Kind::Array => value.is_array(),
        }
    }
}

struct Field {
    name: &'static str,
    kind: Kind,
    required: bool,
}

const fn field(name: &'static str, kind: Kind, required: bool) -> Field {
    Field {
        name,
        kind,
        required,
    }
}

const WORKFLOW_FIELDS: &[Field] = &[
    field("name", Kind::String, true),
    field("nodes", Kind::Array, true),
    field("connections", Kind::Object, true),
    field("settings", Kind::Object, true),
];

const NODE_FIELDS: &[Field] = &[
    field("name", Kind::String, true),
    field("type", Kind::String, true),
    field("typeVersion", Kind::Number, true),
    field("position", Kind::Array, true),
    field("parameters", Kind::Object, true),
    field("credentials", Kind::Object, false),
];

const POSITION_LEN: usize = 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    check_targets: bool,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also reject connection targets that name no declared node.
    pub fn check_targets(mut self, enabled: bool) -> Self {
        self.check_targets = enabled;
        self
    }

    pub fn validate(&self, doc: &Value) -> ValidationResult {
        let errors = check_structure(doc);
        if !errors.is_empty() {
            return ValidationResult::failed(errors);
        }

        let workflow: Workflow = match serde_json::from_value(doc.clone()) {
            Ok(w) => w,
            Err(e) => {
                return ValidationResult::failed(vec![ErrorDetail {
                    instance_path: String::new(),
                    schema_path: "#".to_string(),
                    keyword: "type".to_string(),
                    params: json!({}),
                    message: e.to_string(),
                }])
            }
        };

        match self.check_references(&workflow) {
            Some(error) => ValidationResult::failed(vec![error]),
            None => ValidationResult::ok(),
        }
    }

    fn check_references(&self, workflow: &Workflow) -> Option<ErrorDetail> {
        let names: HashSet<&str> = workflow.node_names().collect();

        if let Some(key) = workflow
            .connections
            .keys()
            .find(|key| !names.contains(key.as_str()))
        {
            return Some(reference_error(
                "/connections".to_string(),
                key,
                format!("connection references unknown node \"{}\"", key),
            ));
        }

        if self.check_targets {
            if let Some((source, target)) = workflow
                .connection_targets()
                .into_iter()
                .find(|(_, t)| !names.contains(t.node.as_str()))
            {
                return Some(reference_error(
                    format!("/connections/{}", escape_pointer(source)),
                    &target.node,
                    format!(
                        "connection from \"{}\" targets unknown node \"{}\"",
                        source, target.node
                    ),
                ));
            }
        }

        None
    }
}

/// Validate with the default rules: only the source keys of `connections`
/// are cross-checked against node names.
pub fn validate(doc: &Value) -> ValidationResult {
    Validator::new().validate(doc)
}

fn reference_error(instance_path: String, node: &str, message: String) -> ErrorDetail {
    ErrorDetail {
        instance_path,
        schema_path: "#/properties/connections".to_string(),
        keyword: "reference".to_string(),
        params: json!({ "node": node }),
        message,
    }
}

fn check_structure(doc: &Value) -> Vec<ErrorDetail> {
    let mut errors = Vec::new();
    let Some(obj) = expect_kind(doc, Kind::Object, "", "#", &mut errors) else {
        return errors;
    };
    check_object(obj, WORKFLOW_FIELDS, "", "#", &mut errors);

    if let Some(nodes) = obj.get("nodes").and_then(Value::as_array) {
        let schema = "#/properties/nodes/items";
        for (i, node) in nodes.iter().enumerate() {
            let path = format!("/nodes/{}", i);
            let Some(node) = expect_kind(node, Kind::Object, &path, schema, &mut errors) else {
                continue;
            };
            check_object(node, NODE_FIELDS, &path, schema, &mut errors);
            if let Some(position) = node.get("position").and_then(Value::as_array) {
                check_position(
                    position,
                    &format!("{}/position", path),
                    &format!("{}/properties/position", schema),
                    &mut errors,
                );
            }
        }
    }

    errors
}

fn check_object(
    obj: &serde_json::Map<String, Value>,
    fields: &[Field],
    path: &str,
    schema: &str,
    errors: &mut Vec<ErrorDetail>,
) {
    for f in fields.iter().filter(|f| f.required) {
        if !obj.contains_key(f.name) {
            errors.push(ErrorDetail {
                instance_path: path.to_string(),
                schema_path: format!("{}/required", schema),
                keyword: "required".to_string(),
                params: json!({ "missingProperty": f.name }),
                message: format!("must have required property '{}'", f.name),
            });
        }
    }

    for f in fields {
        if let Some(value) = obj.get(f.name) {
            expect_kind(
                value,
                f.kind,
                &format!("{}/{}", path, f.name),
                &format!("{}/properties/{}", schema, f.name),
                errors,
            );
        }
    }
}

fn check_position(items: &[Value], path: &str, schema: &str, errors: &mut Vec<ErrorDetail>) {
    if items.len() < POSITION_LEN {
        errors.push(ErrorDetail {
            instance_path: path.to_string(),
            schema_path: format!("{}/minItems", schema),
            keyword: "minItems".to_string(),
            params: json!({ "limit": POSITION_LEN }),
            message: format!("must NOT have fewer than {} items", POSITION_LEN),
        });
    } else if items.len() > POSITION_LEN {
        errors.push(ErrorDetail {
            instance_path: path.to_string(),
            schema_path: format!("{}/maxItems", schema),
            keyword: "maxItems".to_string(),
            params: json!({ "limit": POSITION_LEN }),
            message: format!("must NOT have more than {} items", POSITION_LEN),
        });
    }

    let item_schema = format!("{}/items", schema);
    for (i, item) in items.iter().enumerate() {
        expect_kind(item, Kind::Number, &format!("{}/{}", path, i), &item_schema, errors);
    }
}

/// Push a `type` error when `value` is not of `kind`. Returns the object
/// map when `kind` is `Object` and the value matches.
fn expect_kind<'a>(
    value: &'a Value,
    kind: Kind,
    path: &str,
    schema: &str,
    errors: &mut Vec<ErrorDetail>,
) -> Option<&'a serde_json::Map<String, Value>> {
    if !kind.matches(value) {
        errors.push(ErrorDetail {
            instance_path: path.to_string(),
            schema_path: format!("{}/type", schema),
            keyword: "type".to_string(),
            params: json!({ "type": kind.name() }),
            message: format!("must be {}", kind.name()),
        });
        return None;
    }
    value.as_object()
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}
