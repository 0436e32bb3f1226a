//! Task Command Handlers
//!
//! 写操作从不自动重试：失败直接返回给调用方，由用户重新触发

use std::sync::Arc;

use crate::application::commands::{DeleteTask, RetryTask, SubmitTask};
use crate::application::error::ApplicationError;
use crate::application::ports::{TaskCachePort, TaskGatewayPort};
use crate::domain::Task;

/// SubmitTask Handler - 任务提交网关
pub struct SubmitTaskHandler {
    gateway: Arc<dyn TaskGatewayPort>,
    cache: Arc<dyn TaskCachePort>,
}

impl SubmitTaskHandler {
    pub fn new(gateway: Arc<dyn TaskGatewayPort>, cache: Arc<dyn TaskCachePort>) -> Self {
        Self { gateway, cache }
    }

    pub async fn handle(&self, cmd: SubmitTask) -> Result<Task, ApplicationError> {
        let agent_kind = cmd.agent_kind.trim();
        if agent_kind.is_empty() {
            return Err(ApplicationError::validation("Agent kind cannot be empty"));
        }

        let input = cmd.merged_input();
        tracing::debug!(
            agent = %agent_kind,
            params = input.len(),
            answers = cmd.answers.len(),
            "Submitting task"
        );

        let seq = self.cache.begin_read();
        let task = self
            .gateway
            .create_task(agent_kind, input)
            .await
            .map_err(|e| {
                tracing::warn!(agent = %agent_kind, error = %e, "Task creation failed");
                ApplicationError::from(e)
            })?;

        self.cache.put_task(seq, task.clone());
        self.cache.invalidate_lists();
        self.cache.invalidate_stats();

        tracing::info!(
            task_id = %task.id,
            agent = %task.agent,
            status = %task.status,
            "Task created"
        );
        Ok(task)
    }
}

/// RetryTask Handler
pub struct RetryTaskHandler {
    gateway: Arc<dyn TaskGatewayPort>,
    cache: Arc<dyn TaskCachePort>,
}

impl RetryTaskHandler {
    pub fn new(gateway: Arc<dyn TaskGatewayPort>, cache: Arc<dyn TaskCachePort>) -> Self {
        Self { gateway, cache }
    }

    pub async fn handle(&self, cmd: RetryTask) -> Result<Task, ApplicationError> {
        let seq = self.cache.begin_read();
        let task = self.gateway.retry_task(&cmd.task_id).await.map_err(|e| {
            tracing::warn!(task_id = %cmd.task_id, error = %e, "Task retry failed");
            ApplicationError::from(e)
        })?;

        self.cache.put_task(seq, task.clone());
        self.cache.invalidate_lists();
        self.cache.invalidate_stats();

        tracing::info!(task_id = %task.id, status = %task.status, "Task retried");
        Ok(task)
    }
}

/// DeleteTask Handler
pub struct DeleteTaskHandler {
    gateway: Arc<dyn TaskGatewayPort>,
    cache: Arc<dyn TaskCachePort>,
}

impl DeleteTaskHandler {
    pub fn new(gateway: Arc<dyn TaskGatewayPort>, cache: Arc<dyn TaskCachePort>) -> Self {
        Self { gateway, cache }
    }

    pub async fn handle(&self, cmd: DeleteTask) -> Result<(), ApplicationError> {
        self.gateway.delete_task(&cmd.task_id).await.map_err(|e| {
            tracing::warn!(task_id = %cmd.task_id, error = %e, "Task deletion failed");
            ApplicationError::from(e)
        })?;

        let seq = self.cache.begin_read();
        self.cache.remove_task(seq, &cmd.task_id);
        self.cache.invalidate_lists();
        self.cache.invalidate_stats();

        tracing::info!(task_id = %cmd.task_id, "Task deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::RemoteError;
    use crate::domain::{Params, TaskFilters, TaskStatus};
    use crate::infrastructure::adapters::FakeTaskGateway;
    use crate::infrastructure::memory::InMemoryTaskCache;
    use serde_json::json;

    fn setup() -> (Arc<FakeTaskGateway>, Arc<InMemoryTaskCache>) {
        (Arc::new(FakeTaskGateway::new()), Arc::new(InMemoryTaskCache::new()))
    }

    #[tokio::test]
    async fn test_submit_merges_and_invalidates_lists() {
        let (gateway, cache) = setup();
        let filters = TaskFilters::default();
        let seq = cache.begin_read();
        cache.put_page(seq, &filters, Default::default());
        assert!(cache.get_page(&filters).is_some());

        let mut extracted = Params::new();
        extracted.insert("topic".into(), json!("spring sale"));
        let mut answers = Params::new();
        answers.insert("copy_type".into(), json!("ad"));

        let handler = SubmitTaskHandler::new(gateway.clone(), cache.clone());
        let task = handler
            .handle(SubmitTask::new("copywriter", extracted).with_answers(answers))
            .await
            .unwrap();

        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.input["copy_type"], json!("ad"));
        assert_eq!(task.input["topic"], json!("spring sale"));
        assert!(cache.get_page(&filters).is_none());
        assert_eq!(cache.get_task(&task.id), Some(task));
    }

    #[tokio::test]
    async fn test_submit_failure_not_retried() {
        let (gateway, cache) = setup();
        gateway.fail_next_write(RemoteError::service(429, "quota exceeded"));

        let handler = SubmitTaskHandler::new(gateway.clone(), cache);
        let err = handler
            .handle(SubmitTask::new("copywriter", Params::new()))
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), "quota exceeded");
        assert_eq!(gateway.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_submit_rejects_blank_agent() {
        let (gateway, cache) = setup();
        let handler = SubmitTaskHandler::new(gateway.clone(), cache);
        let err = handler
            .handle(SubmitTask::new(" ", Params::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::ValidationError(_)));
        assert_eq!(gateway.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_retry_writes_server_response() {
        let (gateway, cache) = setup();
        let failed = gateway.insert_with_status("copywriter", TaskStatus::Failed);

        let handler = RetryTaskHandler::new(gateway.clone(), cache.clone());
        let task = handler
            .handle(RetryTask {
                task_id: failed.id.clone(),
            })
            .await
            .unwrap();

        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(cache.get_task(&failed.id).map(|t| t.status), Some(TaskStatus::Pending));
    }

    #[tokio::test]
    async fn test_delete_leaves_tombstone() {
        let (gateway, cache) = setup();
        let task = gateway.insert_with_status("copywriter", TaskStatus::Processing);

        let stale_seq = cache.begin_read();
        let handler = DeleteTaskHandler::new(gateway.clone(), cache.clone());
        handler
            .handle(DeleteTask {
                task_id: task.id.clone(),
            })
            .await
            .unwrap();

        // 删除前发出的读取不能复活该任务
        assert!(!cache.put_task(stale_seq, task.clone()));
        assert!(cache.get_task(&task.id).is_none());
    }
}
