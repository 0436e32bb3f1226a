//! Shared HTTP API Client
//!
//! 解析服务与任务服务共用的 reqwest 封装：
//! URL 拼接、可选 Bearer token、错误体解析

use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::application::ports::RemoteError;

/// API 客户端配置
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// 远端服务基础 URL
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    /// 可选的 Bearer token
    pub token: Option<String>,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_secs: 30,
            token: None,
        }
    }
}

impl ApiClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }
}

/// 服务端错误体：`{"error": "..."}` 或 `{"message": "..."}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP API 客户端
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    config: ApiClientConfig,
    base: Url,
}

impl ApiClient {
    pub fn new(config: ApiClientConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RemoteError::NetworkError(e.to_string()))?;

        let base = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|e| RemoteError::NetworkError(format!("Invalid base URL: {}", e)))?;

        Ok(Self {
            client,
            config,
            base,
        })
    }

    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    /// 拼接 URL，segments 逐段转义
    pub fn url(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| RemoteError::NetworkError("Base URL cannot be a base".to_string()))?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.config.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// 发送请求并解析 JSON 响应
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, RemoteError> {
        let response = self.send(builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }

    /// 发送请求，忽略响应体
    pub async fn send_empty(&self, builder: RequestBuilder) -> Result<(), RemoteError> {
        self.send(builder).await.map(|_| ())
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, RemoteError> {
        let response = builder.send().await.map_err(map_send_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), body = %body, "API request failed");
        Err(error_from_body(status.as_u16(), &body))
    }
}

fn map_send_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else if e.is_connect() {
        RemoteError::NetworkError(format!("Cannot connect to API: {}", e))
    } else {
        RemoteError::NetworkError(e.to_string())
    }
}

/// 从错误响应中提取服务端信息
pub(crate) fn error_from_body(status: u16, body: &str) -> RemoteError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error.or(b.message))
        .or_else(|| {
            let text = body.trim();
            (!text.is_empty() && text.len() <= 200 && !text.starts_with('<')).then(|| text.to_string())
        });

    if status == 404 {
        return RemoteError::NotFound(message.unwrap_or_else(|| "resource not found".to_string()));
    }
    RemoteError::ServiceError { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ApiClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.timeout_secs, 30);
        assert!(config.token.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = ApiClientConfig::new("http://example.com:9000")
            .with_timeout(5)
            .with_token(Some("secret".to_string()));
        assert_eq!(config.base_url, "http://example.com:9000");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_url_escapes_segments() {
        let client = ApiClient::new(ApiClientConfig::new("http://example.com/v1/")).unwrap();
        let url = client.url(&["api", "tasks", "a/b c", "retry"]).unwrap();
        assert_eq!(url.as_str(), "http://example.com/v1/api/tasks/a%2Fb%20c/retry");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new(ApiClientConfig::new("not a url")).is_err());
    }

    #[test]
    fn test_error_body_parsing() {
        let err = error_from_body(429, r#"{"error":"quota exceeded"}"#);
        assert_eq!(err.server_message(), Some("quota exceeded"));

        let err = error_from_body(400, r#"{"message":"input.amount is required"}"#);
        assert_eq!(err.server_message(), Some("input.amount is required"));

        let err = error_from_body(502, "<html>Bad Gateway</html>");
        assert_eq!(
            err,
            RemoteError::ServiceError {
                status: 502,
                message: None
            }
        );

        let err = error_from_body(404, "");
        assert!(matches!(err, RemoteError::NotFound(_)));
    }
}
