//! Fake Task Gateway - 内存中的远端任务服务
//!
//! 用于测试和离线模式。支持：
//! - 按任务脚本化的状态序列（每次 get 推进一步）
//! - 离线自动推进（pending -> processing -> completed）
//! - 写/读失败注入与调用计数
//! - 读取延迟（响应在请求时刻取快照，延迟后返回）

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::application::ports::{RemoteError, TaskGatewayPort};
use crate::domain::{Params, Task, TaskFilters, TaskId, TaskPage, TaskStats, TaskStatus};

#[derive(Default)]
struct State {
    /// 按插入顺序保存
    tasks: Vec<Task>,
    scripts: HashMap<TaskId, VecDeque<TaskStatus>>,
    get_calls: HashMap<TaskId, usize>,
    list_calls: usize,
    create_calls: usize,
    write_failure: Option<RemoteError>,
    read_failures: VecDeque<RemoteError>,
    auto_progress: bool,
    read_delay: Option<Duration>,
}

impl State {
    fn find_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| &t.id == id)
    }
}

/// Fake 任务网关
pub struct FakeTaskGateway {
    state: Mutex<State>,
}

impl FakeTaskGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    /// 离线模式：每次读取把活跃任务推进一步
    pub fn auto_progress() -> Self {
        let gateway = Self::new();
        gateway.lock().auto_progress = true;
        gateway
    }

    /// get/list 的响应延迟
    pub fn with_read_delay(self, delay: Duration) -> Self {
        self.lock().read_delay = Some(delay);
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 直接放入一条任务记录
    pub fn insert(&self, task: Task) -> Task {
        self.lock().tasks.push(task.clone());
        task
    }

    /// 放入一条指定状态的任务
    pub fn insert_with_status(&self, agent: &str, status: TaskStatus) -> Task {
        let mut task = Task::new(agent, department_for(agent), Params::new());
        apply_status(&mut task, status);
        self.insert(task)
    }

    /// 为任务设置状态脚本，每次 get_task 弹出一个状态
    pub fn script(&self, id: &TaskId, statuses: Vec<TaskStatus>) {
        self.lock().scripts.insert(id.clone(), statuses.into());
    }

    /// 下一次写操作（create/retry/delete）失败
    pub fn fail_next_write(&self, error: RemoteError) {
        self.lock().write_failure = Some(error);
    }

    /// 下一次读操作（get/list/stats）失败，可叠加多次
    pub fn fail_next_read(&self, error: RemoteError) {
        self.lock().read_failures.push_back(error);
    }

    pub fn get_calls(&self, id: &TaskId) -> usize {
        self.lock().get_calls.get(id).copied().unwrap_or(0)
    }

    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    pub fn create_calls(&self) -> usize {
        self.lock().create_calls
    }

    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn read_latency(&self) {
        let delay = self.lock().read_delay;
        match delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }
    }
}

impl Default for FakeTaskGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn department_for(agent: &str) -> &'static str {
    match agent {
        "copywriter" | "social" | "seo" => "marketing",
        "invoice" | "cashflow" | "expense" => "finance",
        "recruiter" | "onboarding" => "hr",
        _ => "general",
    }
}

fn apply_status(task: &mut Task, status: TaskStatus) {
    task.status = status;
    match status {
        TaskStatus::Pending | TaskStatus::Processing => {
            task.output = None;
            task.error = None;
            task.completed_at = None;
        }
        TaskStatus::Completed => {
            let mut output = Params::new();
            output.insert("summary".into(), serde_json::json!(format!("{} finished", task.agent)));
            task.output = Some(output);
            task.error = None;
            task.completed_at = Some(Utc::now());
        }
        TaskStatus::Failed => {
            task.output = None;
            task.error = Some("agent execution failed".to_string());
            task.completed_at = Some(Utc::now());
        }
    }
}

fn progressed(status: TaskStatus) -> TaskStatus {
    match status {
        TaskStatus::Pending => TaskStatus::Processing,
        TaskStatus::Processing => TaskStatus::Completed,
        other => other,
    }
}

fn matches(task: &Task, filters: &TaskFilters) -> bool {
    filters
        .department
        .as_deref()
        .map_or(true, |d| task.department == d)
        && filters.status.map_or(true, |s| task.status == s)
}

#[async_trait]
impl TaskGatewayPort for FakeTaskGateway {
    async fn create_task(&self, agent_kind: &str, input: Params) -> Result<Task, RemoteError> {
        let task = {
            let mut state = self.lock();
            state.create_calls += 1;
            if let Some(error) = state.write_failure.take() {
                return Err(error);
            }
            let task = Task::new(agent_kind, department_for(agent_kind), input);
            state.tasks.push(task.clone());
            task
        };
        tokio::task::yield_now().await;
        tracing::debug!(task_id = %task.id, agent = %agent_kind, "FakeTaskGateway: task created");
        Ok(task)
    }

    async fn list_tasks(&self, filters: &TaskFilters) -> Result<TaskPage, RemoteError> {
        let page = {
            let mut state = self.lock();
            state.list_calls += 1;
            if let Some(error) = state.read_failures.pop_front() {
                return Err(error);
            }
            if state.auto_progress {
                for task in state.tasks.iter_mut() {
                    let next = progressed(task.status);
                    if next != task.status {
                        apply_status(task, next);
                    }
                }
            }

            // 新任务在前；同一时间戳按插入顺序倒序
            let mut matched: Vec<Task> = state
                .tasks
                .iter()
                .rev()
                .filter(|t| matches(t, filters))
                .cloned()
                .collect();
            matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

            let total = matched.len() as u64;
            let page = filters.page.max(1);
            let skip = (page as usize - 1) * filters.page_size as usize;
            TaskPage {
                tasks: matched
                    .into_iter()
                    .skip(skip)
                    .take(filters.page_size as usize)
                    .collect(),
                total,
                page,
                per_page: filters.page_size,
            }
        };
        self.read_latency().await;
        Ok(page)
    }

    async fn get_task(&self, id: &TaskId) -> Result<Task, RemoteError> {
        let task = {
            let mut state = self.lock();
            *state.get_calls.entry(id.clone()).or_insert(0) += 1;
            if let Some(error) = state.read_failures.pop_front() {
                return Err(error);
            }

            let scripted = state.scripts.get_mut(id).and_then(|s| s.pop_front());
            let auto_progress = state.auto_progress;
            let task = state
                .find_mut(id)
                .ok_or_else(|| RemoteError::NotFound(format!("task {}", id)))?;

            if let Some(status) = scripted {
                apply_status(task, status);
            } else if auto_progress {
                let next = progressed(task.status);
                if next != task.status {
                    apply_status(task, next);
                }
            }
            task.clone()
        };
        self.read_latency().await;
        Ok(task)
    }

    async fn retry_task(&self, id: &TaskId) -> Result<Task, RemoteError> {
        let mut state = self.lock();
        if let Some(error) = state.write_failure.take() {
            return Err(error);
        }
        let task = state
            .find_mut(id)
            .ok_or_else(|| RemoteError::NotFound(format!("task {}", id)))?;
        if task.status != TaskStatus::Failed {
            return Err(RemoteError::service(409, "Only failed tasks can be retried"));
        }
        apply_status(task, TaskStatus::Pending);
        Ok(task.clone())
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), RemoteError> {
        let mut state = self.lock();
        if let Some(error) = state.write_failure.take() {
            return Err(error);
        }
        let before = state.tasks.len();
        state.tasks.retain(|t| &t.id != id);
        if state.tasks.len() == before {
            return Err(RemoteError::NotFound(format!("task {}", id)));
        }
        state.scripts.remove(id);
        Ok(())
    }

    async fn task_stats(&self) -> Result<TaskStats, RemoteError> {
        let mut state = self.lock();
        if let Some(error) = state.read_failures.pop_front() {
            return Err(error);
        }
        let mut stats = TaskStats::default();
        for task in &state.tasks {
            stats.total += 1;
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::Processing => stats.processing += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Failed => stats.failed += 1,
            }
        }
        Ok(stats)
    }
}
