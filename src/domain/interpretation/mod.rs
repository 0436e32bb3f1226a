//! Interpretation Context - 指令解析上下文
//!
//! 职责:
//! - 解析结果模型
//! - 快捷操作
//! - 追问配对校验

mod entities;
mod errors;

pub use entities::{InterpretationResult, QuickAction};
pub use errors::InterpretationError;
