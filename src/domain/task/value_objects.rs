//! Task Context - Value Objects

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 远端任务唯一标识（对核心不透明）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// 等待执行
    Pending,
    /// 正在执行
    Processing,
    /// 执行完成
    Completed,
    /// 执行失败
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// 终态：不再发生变化（除非显式 retry）
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// 仍有工作未完成
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Processing)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "processing" => Ok(TaskStatus::Processing),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(format!("unknown task status: {}", other)),
        }
    }
}

/// 任务列表过滤条件
///
/// 同时作为列表缓存和列表轮询的 key（list-filter signature）。
/// 修改 department / status 会把分页重置到第一页。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskFilters {
    pub page: u32,
    pub page_size: u32,
    pub department: Option<String>,
    pub status: Option<TaskStatus>,
}

impl Default for TaskFilters {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            department: None,
            status: None,
        }
    }
}

impl TaskFilters {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
            ..Default::default()
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn with_department(mut self, department: Option<String>) -> Self {
        if self.department != department {
            self.department = department;
            self.page = 1;
        }
        self
    }

    pub fn with_status(mut self, status: Option<TaskStatus>) -> Self {
        if self.status != status {
            self.status = status;
            self.page = 1;
        }
        self
    }
}

impl fmt::Display for TaskFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page={} size={}", self.page, self.page_size)?;
        if let Some(department) = &self.department {
            write!(f, " department={}", department)?;
        }
        if let Some(status) = &self.status {
            write!(f, " status={}", status)?;
        }
        Ok(())
    }
}
