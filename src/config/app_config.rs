use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub engine: EngineConfig,
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Scheduler tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// In-flight provider calls per batch; 0 means the whole batch
    pub max_concurrent_steps: usize,

    /// Upper bound on one provider call; 0 or absent disables it
    pub step_timeout_ms: Option<u64>,

    /// Upper bound on one status reporter call
    pub reporter_timeout_ms: u64,

    /// How long a finished run waits for queued status events to drain
    pub reporter_flush_timeout_ms: u64,
}

/// Credentials and endpoints per provider; a provider without an API key is skipped
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub openai: Option<ProviderConfig>,
    pub anthropic: Option<ProviderConfig>,
    pub gemini: Option<ProviderConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider_timeout_secs() -> u64 {
    60
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_steps: 0,
            step_timeout_ms: None,
            reporter_timeout_ms: 5_000,
            reporter_flush_timeout_ms: 250,
        }
    }
}

impl EngineConfig {
    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    pub fn reporter_timeout(&self) -> Duration {
        Duration::from_millis(self.reporter_timeout_ms)
    }

    pub fn reporter_flush_timeout(&self) -> Duration {
        Duration::from_millis(self.reporter_flush_timeout_ms)
    }

    pub fn concurrency_limit(&self) -> Option<usize> {
        (self.max_concurrent_steps > 0).then_some(self.max_concurrent_steps)
    }
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            timeout_secs: default_provider_timeout_secs(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn is_enabled(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(Path::new("config"))
    }

    /// `default` and `local` files under `dir` (both optional), then `APP__*` env
    pub fn load_from(dir: &Path) -> Result<Self, config::ConfigError> {
        let default = dir.join("default");
        let local = dir.join("local");

        let config = config::Config::builder()
            .add_source(config::File::with_name(&default.to_string_lossy()).required(false))
            .add_source(config::File::with_name(&local.to_string_lossy()).required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_defaults() {
        let engine = EngineConfig::default();

        assert!(engine.step_timeout().is_none());
        assert!(engine.concurrency_limit().is_none());
        assert_eq!(engine.reporter_timeout(), Duration::from_secs(5));
        assert_eq!(engine.reporter_flush_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_zero_timeout_disables() {
        let engine = EngineConfig {
            step_timeout_ms: Some(0),
            max_concurrent_steps: 2,
            ..EngineConfig::default()
        };

        assert!(engine.step_timeout().is_none());
        assert_eq!(engine.concurrency_limit(), Some(2));
    }

    #[test]
    fn test_deserialize_from_toml() {
        let config = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [logging]
                level = "debug"
                format = "json"

                [engine]
                step_timeout_ms = 30000

                [providers.openai]
                api_key = "sk-test"

                [providers.gemini]
                api_key = ""
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let app: AppConfig = config.try_deserialize().unwrap();

        assert_eq!(app.logging.level, "debug");
        assert!(matches!(app.logging.format, LogFormat::Json));
        assert_eq!(app.engine.step_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(app.engine.reporter_timeout_ms, 5_000);

        let openai = app.providers.openai.unwrap();
        assert!(openai.is_enabled());
        assert_eq!(openai.timeout_secs, 60);
        assert!(!app.providers.gemini.unwrap().is_enabled());
        assert!(app.providers.anthropic.is_none());
    }

    fn config_dir(files: &[(&str, &str)]) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("resume-tailor-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        for (name, contents) in files {
            std::fs::write(dir.join(name), contents).unwrap();
        }
        dir
    }

    #[test]
    fn test_load_from_layers_local_over_default() {
        let dir = config_dir(&[
            ("default.toml", "[engine]
max_concurrent_steps = 2
"),
            ("local.toml", "[engine]
max_concurrent_steps = 4
"),
        ]);

        let app = AppConfig::load_from(&dir).unwrap();
        assert_eq!(app.engine.concurrency_limit(), Some(4));
    }

    #[test]
    fn test_load_from_rejects_malformed_file() {
        let dir = config_dir(&[("local.toml", "[engine
max_concurrent_steps = ")]);
        assert!(AppConfig::load_from(&dir).is_err());
    }
}
