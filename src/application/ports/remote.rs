//! Remote Error - 远端调用错误
//!
//! 解析服务与任务服务共享的传输/服务端错误

use thiserror::Error;

/// 远端调用错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service error (HTTP {status}): {}", .message.as_deref().unwrap_or("request failed"))]
    ServiceError { status: u16, message: Option<String> },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    pub fn service(status: u16, message: impl Into<String>) -> Self {
        Self::ServiceError {
            status,
            message: Some(message.into()),
        }
    }

    /// 服务端返回的错误信息（如果有）
    pub fn server_message(&self) -> Option<&str> {
        match self {
            RemoteError::ServiceError { message, .. } => message.as_deref(),
            RemoteError::NotFound(message) => Some(message.as_str()),
            _ => None,
        }
    }
}
