//! Lifecycle Events Port - 生命周期事件与用户通知
//!
//! 事件面向展示层的响应式渲染；通知是可关闭的用户可见提示

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{TaskId, TaskStatus};

/// 生命周期事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum LifecycleEvent {
    /// 任务已创建
    TaskCreated { task_id: TaskId, agent: String },
    /// 观测到任务状态变化
    TaskUpdated { task_id: TaskId, status: TaskStatus },
    /// 任务进入 failed，展示层应显示原因并提供重试
    TaskFailed {
        task_id: TaskId,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// 任务已重新提交
    TaskRetried { task_id: TaskId },
    /// 任务已删除
    TaskDeleted { task_id: TaskId },
    /// 列表视图已刷新
    ListUpdated { filters: String, total: u64 },
    /// 轮询读取失败（保留旧值，按原节奏继续）
    PollFailed { key: String, error: String },
}

/// 事件发布端
pub trait EventSinkPort: Send + Sync {
    fn publish(&self, event: LifecycleEvent);
}

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Error,
}

/// 用户可见通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// 通知中心
pub trait NotifierPort: Send + Sync {
    /// 推送通知，返回通知 ID
    fn notify(&self, level: NotificationLevel, title: &str, message: &str) -> u64;

    /// 关闭通知
    fn dismiss(&self, id: u64) -> bool;

    /// 当前未关闭的通知（按时间顺序）
    fn active(&self) -> Vec<Notification>;
}
