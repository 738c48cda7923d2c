use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::Config;
use crate::error::RelayError;

/// Creates a workflow on the automation platform and returns its reply.
#[async_trait]
pub trait WorkflowSubmitter: Send + Sync {
    async fn submit(&self, workflow: &Value) -> Result<Value, RelayError>;
}

pub struct N8nClient {
    client: reqwest::Client,
    base_url: Option<String>,
    api_key: Option<String>,
}

impl N8nClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.n8n_base_url.clone(),
            api_key: config.n8n_api_key.clone(),
        }
    }
}

#[async_trait]
impl WorkflowSubmitter for N8nClient {
    async fn submit(&self, workflow: &Value) -> Result<Value, RelayError> {
        let (Some(base_url), Some(api_key)) = (&self.base_url, &self.api_key) else {
            return Err(RelayError::Config(
                "N8N_BASE_URL or N8N_API_KEY missing in environment".to_string(),
            ));
        };

        let url = format!("{}/workflows", base_url.trim_end_matches('/'));
        log::info!("Creating workflow in n8n: {}", url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("X-N8N-API-KEY", api_key)
            .json(workflow)
            .send()
            .await?;

        let status = response.status();
        let payload = response
            .json::<Value>()
            .await
            .unwrap_or_else(|_| json!({ "raw": "invalid-json" }));

        if !status.is_success() {
            return Err(RelayError::Upstream {
                service: "n8n API",
                status: status.as_u16(),
                message: payload.to_string(),
            });
        }

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn config(base_url: Option<String>, api_key: Option<&str>) -> Config {
        Config {
            gemini_api_key: "unused".into(),
            gemini_model: "unused".into(),
            gemini_base_url: "unused".into(),
            n8n_base_url: base_url,
            n8n_api_key: api_key.map(String::from),
            port: 0,
            strict_connections: false,
        }
    }

    #[tokio::test]
    async fn test_submit_posts_workflow() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/workflows")
            .match_header("x-n8n-api-key", "n-key")
            .match_body(Matcher::Json(json!({"name": "W"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "42", "name": "W"}"#)
            .create_async()
            .await;

        // trailing slash on the base URL is tolerated
        let base = format!("{}/api/v1/", server.url());
        let client = N8nClient::new(&config(Some(base), Some("n-key")));
        let created = client.submit(&json!({"name": "W"})).await.unwrap();
        assert_eq!(created["id"], "42");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_submit_reports_error_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/workflows")
            .with_status(400)
            .with_body(r#"{"message": "request/body must have required property 'settings'"}"#)
            .create_async()
            .await;

        let client = N8nClient::new(&config(Some(server.url()), Some("n-key")));
        let err = client.submit(&json!({})).await.unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("n8n API error (status 400)"));
        assert!(text.contains("settings"));
    }

    #[tokio::test]
    async fn test_submit_tolerates_non_json_reply() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/workflows")
            .with_status(500)
            .with_body("oops")
            .create_async()
            .await;

        let client = N8nClient::new(&config(Some(server.url()), Some("n-key")));
        let err = client.submit(&json!({})).await.unwrap_err();
        assert!(err.to_string().contains("invalid-json"));
    }

    #[tokio::test]
    async fn test_submit_requires_credentials() {
        let client = N8nClient::new(&config(Some("http://localhost:5678".into()), None));
        let err = client.submit(&json!({})).await.unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
        assert!(err.to_string().contains("N8N_API_KEY"));
    }
}
