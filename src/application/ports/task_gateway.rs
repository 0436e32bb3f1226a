//! Task Gateway Port - 远端任务服务抽象

use async_trait::async_trait;

use super::RemoteError;
use crate::domain::{Params, Task, TaskFilters, TaskId, TaskPage, TaskStats};

/// Task Gateway Port
///
/// 任务的所有变更都通过远端完成，核心从不直接修改 Task
#[async_trait]
pub trait TaskGatewayPort: Send + Sync {
    /// 创建任务
    async fn create_task(&self, agent_kind: &str, input: Params) -> Result<Task, RemoteError>;

    /// 分页查询任务
    async fn list_tasks(&self, filters: &TaskFilters) -> Result<TaskPage, RemoteError>;

    /// 获取单个任务
    async fn get_task(&self, id: &TaskId) -> Result<Task, RemoteError>;

    /// 重试失败的任务
    async fn retry_task(&self, id: &TaskId) -> Result<Task, RemoteError>;

    /// 删除任务
    async fn delete_task(&self, id: &TaskId) -> Result<(), RemoteError>;

    /// 任务聚合统计
    async fn task_stats(&self) -> Result<TaskStats, RemoteError>;
}
