use anyhow::{Context, Result};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_PORT: u16 = 3000;

/// Process-wide settings, read once at startup and handed to each client.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub n8n_base_url: Option<String>,
    pub n8n_api_key: Option<String>,
    pub port: u16,
    pub strict_connections: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values count as unset.
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let gemini_api_key = get("GEMINI_API_KEY").context("GEMINI_API_KEY missing in environment")?;

        let port = match get("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT value `{}`", raw))?,
            None => DEFAULT_PORT,
        };

        let strict_connections = get("STRICT_CONNECTIONS")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);

        Ok(Self {
            gemini_api_key,
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_base_url: get("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            n8n_base_url: get("N8N_BASE_URL"),
            n8n_api_key: get("N8N_API_KEY"),
            port,
            strict_connections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "g-key")])).unwrap();
        assert_eq!(config.gemini_api_key, "g-key");
        assert_eq!(config.gemini_model, DEFAULT_MODEL);
        assert_eq!(config.gemini_base_url, DEFAULT_GEMINI_BASE_URL);
        assert_eq!(config.port, 3000);
        assert!(config.n8n_base_url.is_none());
        assert!(config.n8n_api_key.is_none());
        assert!(!config.strict_connections);
    }

    #[test]
    fn test_missing_gemini_key_is_fatal() {
        let err = Config::from_lookup(lookup(&[("N8N_API_KEY", "x")])).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));

        assert!(Config::from_lookup(lookup(&[("GEMINI_API_KEY", "  ")])).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "g-key"),
            ("GEMINI_MODEL", "gemini-2.0-flash"),
            ("N8N_BASE_URL", "http://localhost:5678/api/v1"),
            ("N8N_API_KEY", "n-key"),
            ("PORT", "8080"),
            ("STRICT_CONNECTIONS", "TRUE"),
        ]))
        .unwrap();
        assert_eq!(config.gemini_model, "gemini-2.0-flash");
        assert_eq!(config.n8n_base_url.as_deref(), Some("http://localhost:5678/api/v1"));
        assert_eq!(config.n8n_api_key.as_deref(), Some("n-key"));
        assert_eq!(config.port, 8080);
        assert!(config.strict_connections);
    }

    #[test]
    fn test_invalid_port() {
        let err = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "k"), ("PORT", "http")]))
            .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
