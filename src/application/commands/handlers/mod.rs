//! Command Handlers 实现
//!
//! 所有 CommandHandler 的具体实现

mod interpret_handlers;
mod task_handlers;

pub use interpret_handlers::*;
pub use task_handlers::*;
