//! Task Queries

use crate::domain::{TaskFilters, TaskId};

/// 获取单个任务
#[derive(Debug, Clone)]
pub struct GetTask {
    pub task_id: TaskId,
}

/// 分页查询任务
#[derive(Debug, Clone)]
pub struct ListTasks {
    pub filters: TaskFilters,
}

/// 获取聚合统计
#[derive(Debug, Clone, Default)]
pub struct GetTaskStats {
    /// 忽略缓存强制读取
    pub force: bool,
}

/// 列出快捷操作
#[derive(Debug, Clone)]
pub struct ListQuickActions;
