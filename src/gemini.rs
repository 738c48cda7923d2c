use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::Config;
use crate::error::{truncate, RelayError};

const SERVICE: &str = "Gemini REST";
const BODY_ECHO_LIMIT: usize = 1500;

pub const SYSTEM_INSTRUCTION: &str = r#"You are a strict JSON-only code generator for n8n workflows.
Return exactly one valid JSON object and nothing else (no commentary, no backticks, no explanation).
Required top-level keys: "name", "nodes", "connections".
Nodes must use valid n8n node types and include: name, type, typeVersion, position, and parameters.
The "connections" object format must be exact, like this: {"Source Node Name":{"main":[[{"node":"Target Node Name","type":"main"}]]}}.
Do not return text outside the single JSON object. If asked for credentials, use placeholders like "{{CREDENTIALS.name}}"."#;

/// Places the generated text is known to show up in, tried in order.
const CANDIDATE_PATHS: &[&str] = &[
    "$.candidates[0].content.parts[0].text",
    "$.candidates[0].content.parts[0]",
    "$.candidates[0].content.text",
    "$.output[0].content.parts[0].text",
    "$.output.text",
    "$.text",
    "$.response.output.text",
    "$.result.output.text",
];

/// Turns a natural-language prompt into (hopefully) a workflow JSON string.
#[async_trait]
pub trait WorkflowGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, RelayError>;
}

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn request_body(prompt: &str) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }],
            "systemInstruction": {
                "role": "system",
                "parts": [{ "text": SYSTEM_INSTRUCTION }]
            }
        })
    }
}

#[async_trait]
impl WorkflowGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, RelayError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        log::info!("Calling Gemini (model: {})", self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&Self::request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        let parsed: Value = serde_json::from_str(&response_text).map_err(|_| RelayError::Upstream {
            service: SERVICE,
            status: status.as_u16(),
            message: format!(
                "Non-JSON response: {}",
                truncate(&response_text, BODY_ECHO_LIMIT)
            ),
        })?;

        if !status.is_success() {
            return Err(RelayError::Upstream {
                service: SERVICE,
                status: status.as_u16(),
                message: error_message(&parsed),
            });
        }

        let text = candidate_text(&parsed);
        Ok(extract_json_object(&text).to_string())
    }
}

fn error_message(parsed: &Value) -> String {
    match parsed.get("error") {
        Some(err) => match err.get("message").and_then(Value::as_str) {
            Some(msg) if !msg.is_empty() => msg.to_string(),
            _ => value_to_string(err),
        },
        None => parsed.to_string(),
    }
}

/// Pull the generated text out of a response, whatever envelope it came in.
pub fn candidate_text(parsed: &Value) -> String {
    CANDIDATE_PATHS
        .iter()
        .filter_map(|path| jsonpath_lib::select(parsed, path).ok())
        .filter_map(|found| found.into_iter().next())
        .find(|v| is_present(v))
        .map(value_to_string)
        .unwrap_or_else(|| parsed.to_string())
}

/// The span from the first `{` to the last `}`, or the whole text when
/// there is no such span.
pub fn extract_json_object(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(first), Some(last)) if last > first => &text[first..=last],
        _ => text,
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64() != Some(0.0),
        _ => true,
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        _ => value.to_string(),
    }
}
