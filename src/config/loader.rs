//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（agentdesk.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["agentdesk", "agentdesk.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `AGENTDESK_`，层级分隔符 `__`）
/// 2. 配置文件（agentdesk.toml 或 agentdesk.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `AGENTDESK_API__BASE_URL=https://desk.example.com`
/// - `AGENTDESK_API__TOKEN=...`
/// - `AGENTDESK_POLLING__ACTIVE_INTERVAL_MS=1000`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("api.base_url", "http://localhost:3000")?
        .set_default("api.timeout_secs", 30)?
        .set_default("polling.active_interval_ms", 2000)?
        .set_default("polling.idle_interval_ms", 5000)?
        .set_default("polling.page_size", 20)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: AGENTDESK_API__BASE_URL=http://api:3000
    builder = builder.add_source(
        Environment::with_prefix("AGENTDESK")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.api.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "API base URL cannot be empty".to_string(),
        ));
    }

    let polling = &config.polling;
    if polling.active_interval_ms == 0 || polling.idle_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "Polling intervals cannot be 0".to_string(),
        ));
    }

    if polling.active_interval_ms > polling.idle_interval_ms {
        return Err(ConfigError::ValidationError(format!(
            "Active interval ({}ms) cannot exceed idle interval ({}ms)",
            polling.active_interval_ms, polling.idle_interval_ms
        )));
    }

    if polling.page_size == 0 {
        return Err(ConfigError::ValidationError(
            "Page size must be at least 1".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("API URL: {}", config.api.base_url);
    tracing::info!("API Timeout: {}s", config.api.timeout_secs);
    tracing::info!(
        "API Token: {}",
        if config.api.token.is_some() { "<redacted>" } else { "<none>" }
    );
    tracing::info!(
        "Polling: active {}ms, idle {}ms",
        config.polling.active_interval_ms,
        config.polling.idle_interval_ms
    );
    tracing::info!("Page Size: {}", config.polling.page_size);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}
