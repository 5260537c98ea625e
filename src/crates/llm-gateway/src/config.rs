//! Gateway configuration, defaults matching `original_source/core/config.py`'s
//! `Settings` 1:1 (see SPEC_FULL.md §6).

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Composite `id.secret` Zhipu AI API key.
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub retry_count: u32,
    pub retry_delay: Duration,
    pub retry_backoff: f64,
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "glm-4-flash".to_string(),
            temperature: 0.7,
            max_tokens: 6000,
            retry_count: 3,
            retry_delay: Duration::from_secs(5),
            retry_backoff: 2.0,
            timeout: Duration::from_secs(60),
        }
    }
}

impl GatewayConfig {
    /// Splits `api_key` into Zhipu's `(id, secret)` pair.
    pub fn split_api_key(&self) -> Option<(&str, &str)> {
        self.api_key.split_once('.')
    }
}
