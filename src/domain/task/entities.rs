//! Task Context - Entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{TaskId, TaskStatus};
use crate::domain::Params;

/// 远端工作单元
///
/// 记录归远端系统所有，核心只持有只读缓存副本。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub department: String,
    pub agent: String,
    #[serde(rename = "type", default)]
    pub task_type: String,
    #[serde(default)]
    pub input: Params,
    #[serde(default)]
    pub output: Option<Params>,
    pub status: TaskStatus,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// 创建一个 pending 任务（供内存实现使用）
    pub fn new(agent: impl Into<String>, department: impl Into<String>, input: Params) -> Self {
        let agent = agent.into();
        Self {
            id: TaskId::new(Uuid::new_v4().to_string()),
            company_id: None,
            user_id: None,
            department: department.into(),
            task_type: agent.clone(),
            agent,
            input,
            output: None,
            status: TaskStatus::Pending,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// 失败原因，仅在 failed 状态下有意义
    pub fn failure_reason(&self) -> Option<&str> {
        match self.status {
            TaskStatus::Failed => self.error.as_deref(),
            _ => None,
        }
    }
}

/// 分页任务列表
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

impl TaskPage {
    pub fn has_active(&self) -> bool {
        self.tasks.iter().any(|t| t.status.is_active())
    }
}

/// 任务聚合统计（analytics 视图）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub pending: u64,
    #[serde(default)]
    pub processing: u64,
    #[serde(default)]
    pub completed: u64,
    #[serde(default)]
    pub failed: u64,
}
