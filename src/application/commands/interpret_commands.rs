//! Interpret Commands - 指令解析相关命令

use crate::domain::Params;

/// 解析自由文本指令
#[derive(Debug, Clone)]
pub struct InterpretMessage {
    pub message: String,
}

impl InterpretMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// 解析快捷操作
#[derive(Debug, Clone)]
pub struct InterpretQuickAction {
    pub action_id: String,
    pub params: Option<Params>,
}

impl InterpretQuickAction {
    pub fn new(action_id: impl Into<String>, params: Option<Params>) -> Self {
        Self {
            action_id: action_id.into(),
            params,
        }
    }
}
