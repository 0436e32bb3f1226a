//! 应用层错误定义
//!
//! 统一的命令/查询错误类型

use thiserror::Error;

use crate::application::ports::RemoteError;
use crate::domain::{ClarificationError, InterpretationError};

/// 写操作失败时的通用提示
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// 应用层错误
#[derive(Debug, Clone, Error)]
pub enum ApplicationError {
    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// 调用方输入不合法，不会发往远端
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// missingInfo 与 followUpQuestions 不匹配
    #[error("Malformed interpretation: {0}")]
    MalformedInterpretation(String),

    /// 远端传输或服务错误
    #[error("Remote error: {0}")]
    RemoteError(RemoteError),

    /// 状态无效
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建 NotFound 错误
    pub fn not_found(resource_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type,
            id: id.into(),
        }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建状态无效错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteError(_))
    }

    /// 面向用户的提示：优先使用服务端返回的信息
    pub fn user_message(&self) -> String {
        match self {
            Self::RemoteError(e) => e
                .server_message()
                .map(str::to_string)
                .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()),
            Self::ValidationError(msg) | Self::InvalidState(msg) => msg.clone(),
            Self::NotFound { .. } => self.to_string(),
            Self::MalformedInterpretation(_) | Self::InternalError(_) => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
        }
    }
}

impl From<RemoteError> for ApplicationError {
    fn from(err: RemoteError) -> Self {
        Self::RemoteError(err)
    }
}

impl From<InterpretationError> for ApplicationError {
    fn from(err: InterpretationError) -> Self {
        Self::MalformedInterpretation(err.to_string())
    }
}

impl From<ClarificationError> for ApplicationError {
    fn from(err: ClarificationError) -> Self {
        match err {
            ClarificationError::EmptyAnswer => Self::ValidationError(err.to_string()),
            _ => Self::InvalidState(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_server_message() {
        let err = ApplicationError::from(RemoteError::service(422, "amount must be positive"));
        assert_eq!(err.user_message(), "amount must be positive");

        let err = ApplicationError::from(RemoteError::Timeout);
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn test_clarification_error_mapping() {
        assert!(matches!(
            ApplicationError::from(ClarificationError::EmptyAnswer),
            ApplicationError::ValidationError(_)
        ));
        assert!(matches!(
            ApplicationError::from(ClarificationError::AnswerMissing("tone".into())),
            ApplicationError::InvalidState(_)
        ));
    }
}
