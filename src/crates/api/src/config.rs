//! `Settings` — environment-driven configuration, defaults matching
//! `original_source/core/config.py`'s `Settings` 1:1 (§6). Built on
//! `tooling::config`'s `ConfigBuilder` and `get_env_*` helpers, the
//! same env-loading pattern `orchestrator::config::server` uses.

use tooling::config::{get_env_or, get_env_parse_or, ConfigBuilder};
use tooling::Result as ToolingResult;

use llm_gateway::GatewayConfig;

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub retry_count: u32,
    pub retry_delay_secs: u64,
    pub retry_backoff: f64,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "glm-4-flash".to_string(),
            temperature: 0.7,
            max_tokens: 6000,
            retry_count: 3,
            retry_delay_secs: 5,
            retry_backoff: 2.0,
            timeout_secs: 60,
        }
    }
}

impl From<&LlmSettings> for GatewayConfig {
    fn from(settings: &LlmSettings) -> Self {
        GatewayConfig {
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            retry_count: settings.retry_count,
            retry_delay: std::time::Duration::from_secs(settings.retry_delay_secs),
            retry_backoff: settings.retry_backoff,
            timeout: std::time::Duration::from_secs(settings.timeout_secs),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9000,
        }
    }
}

impl ExecutorSettings {
    pub fn websocket_url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct PersistenceSettings {
    pub database_url: String,
    pub data_root: String,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            database_url: "sqlite:algotest.db".to_string(),
            data_root: "data".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub host: String,
    pub port: u16,
    pub workers: u32,
    pub keep_alive_secs: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            workers: 4,
            keep_alive_secs: 75,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub llm: LlmSettings,
    pub executor: ExecutorSettings,
    pub persistence: PersistenceSettings,
    pub service: ServiceSettings,
}

impl ConfigBuilder for Settings {
    fn from_env(prefix: &str) -> ToolingResult<Self> {
        let llm = LlmSettings {
            api_key: get_env_or(&format!("{prefix}LLM_API_KEY"), "")?,
            model: get_env_or(&format!("{prefix}LLM_MODEL"), "glm-4-flash")?,
            temperature: get_env_parse_or(&format!("{prefix}LLM_TEMPERATURE"), 0.7)?,
            max_tokens: get_env_parse_or(&format!("{prefix}LLM_MAX_TOKENS"), 6000)?,
            retry_count: get_env_parse_or(&format!("{prefix}LLM_RETRY_COUNT"), 3)?,
            retry_delay_secs: get_env_parse_or(&format!("{prefix}LLM_RETRY_DELAY_SECS"), 5)?,
            retry_backoff: get_env_parse_or(&format!("{prefix}LLM_RETRY_BACKOFF"), 2.0)?,
            timeout_secs: get_env_parse_or(&format!("{prefix}LLM_TIMEOUT_SECS"), 60)?,
        };

        let executor = ExecutorSettings {
            host: get_env_or(&format!("{prefix}EXECUTOR_HOST"), "127.0.0.1")?,
            port: get_env_parse_or(&format!("{prefix}EXECUTOR_PORT"), 9000)?,
        };

        let persistence = PersistenceSettings {
            database_url: get_env_or(&format!("{prefix}DATABASE_URL"), "sqlite:algotest.db")?,
            data_root: get_env_or(&format!("{prefix}DATA_ROOT"), "data")?,
        };

        let service = ServiceSettings {
            host: get_env_or(&format!("{prefix}HOST"), "0.0.0.0")?,
            port: get_env_parse_or(&format!("{prefix}PORT"), 8080)?,
            workers: get_env_parse_or(&format!("{prefix}WORKERS"), 4)?,
            keep_alive_secs: get_env_parse_or(&format!("{prefix}KEEP_ALIVE_SECS"), 75)?,
        };

        Ok(Self { llm, executor, persistence, service })
    }

    fn merge(&mut self, _other: Self) -> &mut Self {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_source_config() {
        let settings = Settings::default();
        assert_eq!(settings.llm.model, "glm-4-flash");
        assert_eq!(settings.llm.max_tokens, 6000);
        assert_eq!(settings.llm.retry_count, 3);
        assert_eq!(settings.service.port, 8080);
    }

    #[test]
    fn executor_settings_build_a_websocket_url() {
        let executor = ExecutorSettings { host: "executor.local".to_string(), port: 9100 };
        assert_eq!(executor.websocket_url(), "ws://executor.local:9100");
    }
}
