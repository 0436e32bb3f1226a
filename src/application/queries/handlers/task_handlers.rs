//! Task Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{InterpreterPort, RemoteError, TaskCachePort, TaskGatewayPort};
use crate::application::queries::{GetTask, GetTaskStats, ListQuickActions, ListTasks};
use crate::domain::{QuickAction, Task, TaskPage, TaskStats};

/// GetTask Handler
pub struct GetTaskHandler {
    gateway: Arc<dyn TaskGatewayPort>,
    cache: Arc<dyn TaskCachePort>,
}

impl GetTaskHandler {
    pub fn new(gateway: Arc<dyn TaskGatewayPort>, cache: Arc<dyn TaskCachePort>) -> Self {
        Self { gateway, cache }
    }

    pub async fn handle(&self, query: GetTask) -> Result<Task, ApplicationError> {
        let seq = self.cache.begin_read();
        let task = self
            .gateway
            .get_task(&query.task_id)
            .await
            .map_err(|e| match e {
                RemoteError::NotFound(_) => ApplicationError::not_found("Task", query.task_id.as_str()),
                other => other.into(),
            })?;

        self.cache.put_task(seq, task.clone());
        Ok(task)
    }
}

/// ListTasks Handler
pub struct ListTasksHandler {
    gateway: Arc<dyn TaskGatewayPort>,
    cache: Arc<dyn TaskCachePort>,
}

impl ListTasksHandler {
    pub fn new(gateway: Arc<dyn TaskGatewayPort>, cache: Arc<dyn TaskCachePort>) -> Self {
        Self { gateway, cache }
    }

    pub async fn handle(&self, query: ListTasks) -> Result<TaskPage, ApplicationError> {
        if query.filters.page == 0 || query.filters.page_size == 0 {
            return Err(ApplicationError::validation("Page and page size must be at least 1"));
        }

        let seq = self.cache.begin_read();
        let page = self.gateway.list_tasks(&query.filters).await?;
        self.cache.put_page(seq, &query.filters, page.clone());

        tracing::debug!(
            filters = %query.filters,
            total = page.total,
            returned = page.tasks.len(),
            "Tasks listed"
        );
        Ok(page)
    }
}

/// GetTaskStats Handler - 聚合统计视图
///
/// 未失效时直接返回缓存；create/retry/delete 会使其失效
pub struct GetTaskStatsHandler {
    gateway: Arc<dyn TaskGatewayPort>,
    cache: Arc<dyn TaskCachePort>,
}

impl GetTaskStatsHandler {
    pub fn new(gateway: Arc<dyn TaskGatewayPort>, cache: Arc<dyn TaskCachePort>) -> Self {
        Self { gateway, cache }
    }

    pub async fn handle(&self, query: GetTaskStats) -> Result<TaskStats, ApplicationError> {
        if !query.force {
            if let Some(stats) = self.cache.get_stats() {
                return Ok(stats);
            }
        }

        let seq = self.cache.begin_read();
        let stats = self.gateway.task_stats().await?;
        self.cache.put_stats(seq, stats.clone());
        Ok(stats)
    }
}

/// ListQuickActions Handler
pub struct ListQuickActionsHandler {
    interpreter: Arc<dyn InterpreterPort>,
}

impl ListQuickActionsHandler {
    pub fn new(interpreter: Arc<dyn InterpreterPort>) -> Self {
        Self { interpreter }
    }

    pub async fn handle(&self, _query: ListQuickActions) -> Result<Vec<QuickAction>, ApplicationError> {
        Ok(self.interpreter.quick_actions().await?)
    }
}
