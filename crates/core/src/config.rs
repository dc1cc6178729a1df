use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::LatencyClass;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub router: RouterConfig,
    pub dispatch: DispatchConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
}

/// Budgets for the fallback intent classifier.
#[derive(Clone, Debug)]
pub struct RouterConfig {
    pub classifier_timeout_ms: u64,
    pub fallback_confidence: f32,
}

/// Per-tier execution deadlines for the tool dispatcher.
#[derive(Clone, Debug)]
pub struct DispatchConfig {
    pub standard_timeout_secs: u64,
    pub network_timeout_secs: u64,
    pub enrichment_timeout_secs: u64,
}

impl DispatchConfig {
    pub fn deadline_secs(&self, latency: LatencyClass) -> u64 {
        match latency {
            LatencyClass::Standard => self.standard_timeout_secs,
            LatencyClass::Network => self.network_timeout_secs,
            LatencyClass::Enrichment => self.enrichment_timeout_secs,
        }
    }

    pub fn deadline(&self, latency: LatencyClass) -> Duration {
        Duration::from_secs(self.deadline_secs(latency))
    }
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub classifier_timeout_ms: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: Some("http://localhost:11434".to_string()),
                model: "llama3.1".to_string(),
            },
            router: RouterConfig { classifier_timeout_ms: 2_500, fallback_confidence: 0.3 },
            dispatch: DispatchConfig {
                standard_timeout_secs: 10,
                network_timeout_secs: 30,
                enrichment_timeout_secs: 120,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|anthropic|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("dealdesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(api_key_value) = llm.api_key {
                self.llm.api_key = Some(api_key_value.into());
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
        }

        if let Some(router) = patch.router {
            if let Some(classifier_timeout_ms) = router.classifier_timeout_ms {
                self.router.classifier_timeout_ms = classifier_timeout_ms;
            }
            if let Some(fallback_confidence) = router.fallback_confidence {
                self.router.fallback_confidence = fallback_confidence;
            }
        }

        if let Some(dispatch) = patch.dispatch {
            if let Some(standard) = dispatch.standard_timeout_secs {
                self.dispatch.standard_timeout_secs = standard;
            }
            if let Some(network) = dispatch.network_timeout_secs {
                self.dispatch.network_timeout_secs = network;
            }
            if let Some(enrichment) = dispatch.enrichment_timeout_secs {
                self.dispatch.enrichment_timeout_secs = enrichment;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("DEALDESK_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("DEALDESK_LLM_API_KEY") {
            self.llm.api_key = Some(value.into());
        }
        if let Some(value) = read_env("DEALDESK_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("DEALDESK_LLM_MODEL") {
            self.llm.model = value;
        }

        if let Some(value) = read_env("DEALDESK_ROUTER_CLASSIFIER_TIMEOUT_MS") {
            self.router.classifier_timeout_ms =
                parse_u64("DEALDESK_ROUTER_CLASSIFIER_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = read_env("DEALDESK_ROUTER_FALLBACK_CONFIDENCE") {
            self.router.fallback_confidence =
                parse_f32("DEALDESK_ROUTER_FALLBACK_CONFIDENCE", &value)?;
        }

        if let Some(value) = read_env("DEALDESK_DISPATCH_STANDARD_TIMEOUT_SECS") {
            self.dispatch.standard_timeout_secs =
                parse_u64("DEALDESK_DISPATCH_STANDARD_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("DEALDESK_DISPATCH_NETWORK_TIMEOUT_SECS") {
            self.dispatch.network_timeout_secs =
                parse_u64("DEALDESK_DISPATCH_NETWORK_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("DEALDESK_DISPATCH_ENRICHMENT_TIMEOUT_SECS") {
            self.dispatch.enrichment_timeout_secs =
                parse_u64("DEALDESK_DISPATCH_ENRICHMENT_TIMEOUT_SECS", &value)?;
        }

        let log_level =
            read_env("DEALDESK_LOGGING_LEVEL").or_else(|| read_env("DEALDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("DEALDESK_LOGGING_FORMAT").or_else(|| read_env("DEALDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(classifier_timeout_ms) = overrides.classifier_timeout_ms {
            self.router.classifier_timeout_ms = classifier_timeout_ms;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_router(&self.router)?;
        validate_dispatch(&self.dispatch)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("dealdesk.toml"), PathBuf::from("config/dealdesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    match llm.provider {
        LlmProvider::OpenAi | LlmProvider::Anthropic => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for openai/anthropic providers".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for ollama provider".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn validate_router(router: &RouterConfig) -> Result<(), ConfigError> {
    if router.classifier_timeout_ms == 0 || router.classifier_timeout_ms > 30_000 {
        return Err(ConfigError::Validation(
            "router.classifier_timeout_ms must be in range 1..=30000".to_string(),
        ));
    }

    if !(0.0..=1.0).contains(&router.fallback_confidence) {
        return Err(ConfigError::Validation(
            "router.fallback_confidence must be in range 0.0..=1.0".to_string(),
        ));
    }

    Ok(())
}

fn validate_dispatch(dispatch: &DispatchConfig) -> Result<(), ConfigError> {
    for (key, value) in [
        ("dispatch.standard_timeout_secs", dispatch.standard_timeout_secs),
        ("dispatch.network_timeout_secs", dispatch.network_timeout_secs),
        ("dispatch.enrichment_timeout_secs", dispatch.enrichment_timeout_secs),
    ] {
        if value == 0 || value > 600 {
            return Err(ConfigError::Validation(format!("{key} must be in range 1..=600")));
        }
    }

    if dispatch.standard_timeout_secs > dispatch.network_timeout_secs
        || dispatch.network_timeout_secs > dispatch.enrichment_timeout_secs
    {
        return Err(ConfigError::Validation(
            "dispatch timeouts must be ordered standard <= network <= enrichment".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    router: Option<RouterPatch>,
    dispatch: Option<DispatchPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RouterPatch {
    classifier_timeout_ms: Option<u64>,
    fallback_confidence: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct DispatchPatch {
    standard_timeout_secs: Option<u64>,
    network_timeout_secs: Option<u64>,
    enrichment_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::catalog::LatencyClass;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    #[test]
    fn defaults_pass_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        assert_eq!(config.dispatch.deadline_secs(LatencyClass::Standard), 10);
        assert_eq!(config.dispatch.deadline_secs(LatencyClass::Network), 30);
        assert_eq!(config.dispatch.deadline_secs(LatencyClass::Enrichment), 120);
        assert_eq!(config.router.classifier_timeout_ms, 2_500);
        Ok(())
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_DEALDESK_MODEL", "deal-model-7b");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("dealdesk.toml");
            fs::write(
                &path,
                r#"
[llm]
model = "${TEST_DEALDESK_MODEL}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            if config.llm.model != "deal-model-7b" {
                return Err("model should be interpolated from environment".to_string());
            }
            Ok(())
        })();

        clear_vars(&["TEST_DEALDESK_MODEL"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("DEALDESK_ROUTER_CLASSIFIER_TIMEOUT_MS", "4000");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("dealdesk.toml");
            fs::write(
                &path,
                r#"
[router]
classifier_timeout_ms = 3000

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    classifier_timeout_ms: Some(5000),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            if config.router.classifier_timeout_ms != 5000 {
                return Err("explicit override should win over env and file".to_string());
            }
            if config.logging.level != "debug" {
                return Err("overridden log level should be debug".to_string());
            }
            Ok(())
        })();

        clear_vars(&["DEALDESK_ROUTER_CLASSIFIER_TIMEOUT_MS"]);
        result
    }

    #[test]
    fn unordered_dispatch_tiers_fail_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("DEALDESK_DISPATCH_STANDARD_TIMEOUT_SECS", "90");
        env::set_var("DEALDESK_DISPATCH_NETWORK_TIMEOUT_SECS", "30");

        let result = (|| -> Result<(), String> {
            match AppConfig::load(LoadOptions::default()) {
                Ok(_) => Err("expected validation failure for unordered tiers".to_string()),
                Err(ConfigError::Validation(message)) if message.contains("ordered") => Ok(()),
                Err(other) => Err(format!("unexpected error: {other}")),
            }
        })();

        clear_vars(&[
            "DEALDESK_DISPATCH_STANDARD_TIMEOUT_SECS",
            "DEALDESK_DISPATCH_NETWORK_TIMEOUT_SECS",
        ]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("DEALDESK_LOG_LEVEL", "warn");
        env::set_var("DEALDESK_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            if config.logging.level != "warn" {
                return Err("warn log level should be set from env var".to_string());
            }
            if !matches!(config.logging.format, LogFormat::Pretty) {
                return Err("pretty logging format should be set from env var".to_string());
            }
            Ok(())
        })();

        clear_vars(&["DEALDESK_LOG_LEVEL", "DEALDESK_LOG_FORMAT"]);
        result
    }

    #[test]
    fn api_key_is_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("DEALDESK_LLM_API_KEY", "sk-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            if debug.contains("sk-secret-value") {
                return Err("debug output should not contain the api key".to_string());
            }
            Ok(())
        })();

        clear_vars(&["DEALDESK_LLM_API_KEY"]);
        result
    }
}
