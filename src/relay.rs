use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::{truncate, RelayError};
use crate::gemini::WorkflowGenerator;
use crate::n8n::WorkflowSubmitter;
use crate::validator::Validator;

pub const DEFAULT_WORKFLOW_NAME: &str = "Generated Workflow";
const LOG_PREVIEW_LIMIT: usize = 1000;

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub message: String,
    pub n8n: Value,
}

/// Prompt in, created workflow out: model call, validation, submission.
#[derive(Clone)]
pub struct Relay {
    generator: Arc<dyn WorkflowGenerator>,
    submitter: Arc<dyn WorkflowSubmitter>,
    validator: Validator,
}

impl Relay {
    pub fn new(
        generator: Arc<dyn WorkflowGenerator>,
        submitter: Arc<dyn WorkflowSubmitter>,
        validator: Validator,
    ) -> Self {
        Self {
            generator,
            submitter,
            validator,
        }
    }

    pub async fn generate(&self, request_id: &str, prompt: &str) -> Result<GenerateResponse, RelayError> {
        let raw = self.generator.generate(prompt).await?;
        log::debug!("[{}] Gemini raw (trim): {}", request_id, truncate(&raw, LOG_PREVIEW_LIMIT));

        let mut workflow: Value = serde_json::from_str(&raw)
            .map_err(|_| RelayError::InvalidModelOutput { raw: raw.clone() })?;

        apply_defaults(&mut workflow);

        let result = self.validator.validate(&workflow);
        if !result.valid {
            let details = result.errors.unwrap_or_default();
            log::warn!("[{}] Generated workflow failed validation ({} errors)", request_id, details.len());
            return Err(RelayError::Validation { details });
        }

        if let Some(obj) = workflow.as_object_mut() {
            obj.remove("active");
        }

        let created = self.submitter.submit(&workflow).await?;
        log::info!("[{}] Workflow created", request_id);

        Ok(GenerateResponse {
            message: "Workflow created".to_string(),
            n8n: created,
        })
    }
}

/// Fill in `name`, `active` and `settings` on a parsed model reply.
/// Anything other than an object is left for the validator to reject.
pub fn apply_defaults(workflow: &mut Value) {
    let Some(obj) = workflow.as_object_mut() else {
        return;
    };

    if !obj.get("name").is_some_and(is_truthy) {
        obj.insert("name".to_string(), Value::String(DEFAULT_WORKFLOW_NAME.to_string()));
    }

    let active = obj.get("active").is_some_and(is_truthy);
    obj.insert("active".to_string(), Value::Bool(active));

    if !obj.get("settings").is_some_and(is_truthy) {
        obj.insert("settings".to_string(), Value::Object(Map::new()));
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
