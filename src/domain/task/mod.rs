//! Task Context - 任务限界上下文
//!
//! 职责:
//! - 任务实体与状态
//! - 列表过滤与分页
//! - 自适应轮询节奏

mod entities;
pub mod polling;
mod value_objects;

pub use entities::{Task, TaskPage, TaskStats};
pub use polling::{next_list_delay, next_task_delay, PollCadence};
pub use value_objects::{TaskFilters, TaskId, TaskStatus};
