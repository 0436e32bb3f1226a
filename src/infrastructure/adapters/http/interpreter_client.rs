//! HTTP Interpreter Client - 调用远端自然语言解析服务
//!
//! 外部 API:
//! POST {base}/api/interpret               {"message": "..."}
//! POST {base}/api/interpret/quick-action  {"actionId": "...", "params": {...}}
//! GET  {base}/api/quick-actions

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;

use super::ApiClient;
use crate::application::ports::{InterpreterPort, RemoteError};
use crate::domain::{InterpretationResult, Params, QuickAction};

#[derive(Debug, Serialize)]
struct InterpretRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuickActionRequest<'a> {
    action_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Params>,
}

/// HTTP 解析客户端
pub struct HttpInterpreterClient {
    api: ApiClient,
}

impl HttpInterpreterClient {
    pub fn from_api(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl InterpreterPort for HttpInterpreterClient {
    async fn interpret(&self, message: &str) -> Result<InterpretationResult, RemoteError> {
        let url = self.api.url(&["api", "interpret"])?;
        tracing::debug!(url = %url, message_len = message.len(), "Sending interpret request");

        let builder = self
            .api
            .request(Method::POST, url)
            .json(&InterpretRequest { message });
        self.api.send_json(builder).await
    }

    async fn interpret_quick_action(
        &self,
        action_id: &str,
        params: Option<Params>,
    ) -> Result<InterpretationResult, RemoteError> {
        let url = self.api.url(&["api", "interpret", "quick-action"])?;
        tracing::debug!(url = %url, action_id = %action_id, "Sending quick action request");

        let builder = self
            .api
            .request(Method::POST, url)
            .json(&QuickActionRequest { action_id, params });
        self.api.send_json(builder).await
    }

    async fn quick_actions(&self) -> Result<Vec<QuickAction>, RemoteError> {
        let url = self.api.url(&["api", "quick-actions"])?;
        let builder = self.api.request(Method::GET, url);
        self.api.send_json(builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quick_action_request_format() {
        let mut params = Params::new();
        params.insert("month".into(), serde_json::json!("2024-03"));
        let body = serde_json::to_value(QuickActionRequest {
            action_id: "monthly-cashflow",
            params: Some(params),
        })
        .unwrap();

        assert_eq!(body["actionId"], "monthly-cashflow");
        assert_eq!(body["params"]["month"], "2024-03");

        let body = serde_json::to_value(QuickActionRequest {
            action_id: "x",
            params: None,
        })
        .unwrap();
        assert!(body.get("params").is_none());
    }
}
