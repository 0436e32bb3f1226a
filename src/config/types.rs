//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::time::Duration;

use crate::domain::PollCadence;
use crate::infrastructure::adapters::ApiClientConfig;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 远端 API 配置
    #[serde(default)]
    pub api: ApiConfig,

    /// 轮询配置
    #[serde(default)]
    pub polling: PollingConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 远端 API 配置
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// 解析服务与任务服务的基础 URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Bearer token（获取与刷新不在本系统范围内）
    #[serde(default)]
    pub token: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            token: None,
        }
    }
}

impl ApiConfig {
    pub fn client_config(&self) -> ApiClientConfig {
        ApiClientConfig::new(self.base_url.clone())
            .with_timeout(self.timeout_secs)
            .with_token(self.token.clone())
    }
}

/// 轮询配置
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// 存在 pending/processing 任务时的间隔（毫秒）
    #[serde(default = "default_active_interval")]
    pub active_interval_ms: u64,

    /// 列表中没有活跃任务时的间隔（毫秒）
    #[serde(default = "default_idle_interval")]
    pub idle_interval_ms: u64,

    /// 列表默认分页大小
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_active_interval() -> u64 {
    2000
}

fn default_idle_interval() -> u64 {
    5000
}

fn default_page_size() -> u32 {
    20
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            active_interval_ms: default_active_interval(),
            idle_interval_ms: default_idle_interval(),
            page_size: default_page_size(),
        }
    }
}

impl PollingConfig {
    pub fn cadence(&self) -> PollCadence {
        PollCadence::new(
            Duration::from_millis(self.active_interval_ms),
            Duration::from_millis(self.idle_interval_ms),
        )
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
