//! 应用层 - 查询（读操作）
//!
//! CQRS 查询侧：任务、统计与快捷操作的一次性读取

mod task_queries;

pub mod handlers;

pub use task_queries::*;
