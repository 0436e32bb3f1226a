//! Interpret Command Handlers

use std::sync::Arc;

use crate::application::commands::{InterpretMessage, InterpretQuickAction};
use crate::application::error::ApplicationError;
use crate::application::ports::InterpreterPort;
use crate::domain::InterpretationResult;

/// InterpretMessage Handler - 解析自由文本
pub struct InterpretMessageHandler {
    interpreter: Arc<dyn InterpreterPort>,
}

impl InterpretMessageHandler {
    pub fn new(interpreter: Arc<dyn InterpreterPort>) -> Self {
        Self { interpreter }
    }

    pub async fn handle(
        &self,
        cmd: InterpretMessage,
    ) -> Result<InterpretationResult, ApplicationError> {
        let message = cmd.message.trim();
        if message.is_empty() {
            return Err(ApplicationError::validation("Message cannot be empty"));
        }

        let result = self.interpreter.interpret(message).await.map_err(|e| {
            tracing::warn!(error = %e, "Interpretation failed");
            ApplicationError::from(e)
        })?;

        check_result(result)
    }
}

/// InterpretQuickAction Handler - 解析快捷操作
pub struct InterpretQuickActionHandler {
    interpreter: Arc<dyn InterpreterPort>,
}

impl InterpretQuickActionHandler {
    pub fn new(interpreter: Arc<dyn InterpreterPort>) -> Self {
        Self { interpreter }
    }

    pub async fn handle(
        &self,
        cmd: InterpretQuickAction,
    ) -> Result<InterpretationResult, ApplicationError> {
        let action_id = cmd.action_id.trim();
        if action_id.is_empty() {
            return Err(ApplicationError::validation("Quick action id cannot be empty"));
        }

        let mut result = self
            .interpreter
            .interpret_quick_action(action_id, cmd.params)
            .await
            .map_err(|e| {
                tracing::warn!(action_id = %action_id, error = %e, "Quick action interpretation failed");
                ApplicationError::from(e)
            })?;

        if result.quick_action_id.is_none() {
            result.quick_action_id = Some(action_id.to_string());
        }
        check_result(result)
    }
}

/// 边界校验：配对不成立时拒绝整个结果
fn check_result(result: InterpretationResult) -> Result<InterpretationResult, ApplicationError> {
    if let Err(e) = result.validate() {
        tracing::warn!(intent = %result.intent, error = %e, "Rejecting malformed interpretation");
        return Err(e.into());
    }

    tracing::info!(
        intent = %result.intent,
        confidence = result.confidence,
        missing = result.missing_info.len(),
        auto_execute = result.can_auto_execute,
        "Interpretation received"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::FakeInterpreter;

    #[tokio::test]
    async fn test_empty_message_never_sent() {
        let interpreter = Arc::new(FakeInterpreter::new());
        let handler = InterpretMessageHandler::new(interpreter.clone());

        let err = handler.handle(InterpretMessage::new("   ")).await.unwrap_err();
        assert!(matches!(err, ApplicationError::ValidationError(_)));
        assert_eq!(interpreter.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_result_rejected() {
        let interpreter = Arc::new(FakeInterpreter::new());
        let mut bad = FakeInterpreter::clarifying("create_copy", "copywriter", &[("copy_type", "What type of copy?")]);
        bad.follow_up_questions.clear();
        interpreter.add_rule("copy", bad);

        let handler = InterpretMessageHandler::new(interpreter.clone());
        let err = handler.handle(InterpretMessage::new("write copy")).await.unwrap_err();
        assert!(matches!(err, ApplicationError::MalformedInterpretation(_)));
        assert_eq!(interpreter.calls(), 1);
    }

    #[tokio::test]
    async fn test_remote_failure_has_no_partial_result() {
        let interpreter = Arc::new(FakeInterpreter::new());
        interpreter.fail_next(crate::application::ports::RemoteError::Timeout);

        let handler = InterpretMessageHandler::new(interpreter);
        let err = handler.handle(InterpretMessage::new("hello")).await.unwrap_err();
        assert!(err.is_remote());
    }

    #[tokio::test]
    async fn test_quick_action_tagged_with_id() {
        let interpreter = Arc::new(FakeInterpreter::with_defaults());
        let handler = InterpretQuickActionHandler::new(interpreter);

        let result = handler
            .handle(InterpretQuickAction::new("monthly-cashflow", None))
            .await
            .unwrap();
        assert_eq!(result.quick_action_id.as_deref(), Some("monthly-cashflow"));

        let err = handler
            .handle(InterpretQuickAction::new("", None))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::ValidationError(_)));
    }
}
