//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：解析请求与任务变更

mod interpret_commands;
mod task_commands;

pub mod handlers;

pub use interpret_commands::*;
pub use task_commands::*;
