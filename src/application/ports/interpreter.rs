//! Interpreter Port - 自然语言解析服务抽象
//!
//! 具体实现在 infrastructure/adapters 层（HTTP / Fake）

use async_trait::async_trait;

use super::RemoteError;
use crate::domain::{InterpretationResult, Params, QuickAction};

/// Interpreter Port
///
/// 解析结果不缓存：语言解析是非确定性的，每次都视为最新结果
#[async_trait]
pub trait InterpreterPort: Send + Sync {
    /// 解析自由文本指令
    async fn interpret(&self, message: &str) -> Result<InterpretationResult, RemoteError>;

    /// 解析预定义快捷操作
    async fn interpret_quick_action(
        &self,
        action_id: &str,
        params: Option<Params>,
    ) -> Result<InterpretationResult, RemoteError>;

    /// 获取可用的快捷操作
    async fn quick_actions(&self) -> Result<Vec<QuickAction>, RemoteError>;
}
