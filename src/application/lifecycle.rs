//! Task Lifecycle Facade
//!
//! 面向展示层的任务生命周期入口：create / retry / delete / list / observe。
//! 写操作成功后驱动轮询器（刷新列表、重新启用或停止单任务轮询），
//! 失败时推送可关闭的通知并把错误返回给调用方。

use std::sync::Arc;

use crate::application::commands::handlers::{DeleteTaskHandler, RetryTaskHandler, SubmitTaskHandler};
use crate::application::commands::{DeleteTask, RetryTask, SubmitTask};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    EventSinkPort, LifecycleEvent, Notification, NotificationLevel, NotifierPort, Observation,
    TaskCachePort, TaskGatewayPort, TaskObserverPort,
};
use crate::application::queries::handlers::{GetTaskHandler, GetTaskStatsHandler, ListTasksHandler};
use crate::application::queries::{GetTask, GetTaskStats, ListTasks};
use crate::domain::{Params, Task, TaskFilters, TaskId, TaskPage, TaskStats, TaskStatus};

/// 任务生命周期门面
pub struct TaskLifecycle {
    submit_handler: SubmitTaskHandler,
    retry_handler: RetryTaskHandler,
    delete_handler: DeleteTaskHandler,
    get_handler: GetTaskHandler,
    list_handler: ListTasksHandler,
    stats_handler: GetTaskStatsHandler,
    observer: Arc<dyn TaskObserverPort>,
    events: Arc<dyn EventSinkPort>,
    notifier: Arc<dyn NotifierPort>,
    page_size: u32,
}

impl TaskLifecycle {
    pub fn new(
        gateway: Arc<dyn TaskGatewayPort>,
        cache: Arc<dyn TaskCachePort>,
        observer: Arc<dyn TaskObserverPort>,
        events: Arc<dyn EventSinkPort>,
        notifier: Arc<dyn NotifierPort>,
    ) -> Self {
        Self {
            submit_handler: SubmitTaskHandler::new(gateway.clone(), cache.clone()),
            retry_handler: RetryTaskHandler::new(gateway.clone(), cache.clone()),
            delete_handler: DeleteTaskHandler::new(gateway.clone(), cache.clone()),
            get_handler: GetTaskHandler::new(gateway.clone(), cache.clone()),
            list_handler: ListTasksHandler::new(gateway.clone(), cache.clone()),
            stats_handler: GetTaskStatsHandler::new(gateway, cache),
            observer,
            events,
            notifier,
            page_size: TaskFilters::default().page_size,
        }
    }

    /// 列表视图的默认分页大小
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub async fn create(&self, agent_kind: &str, input: Params) -> Result<Task, ApplicationError> {
        self.submit(SubmitTask::new(agent_kind, input)).await
    }

    /// 提交任务（带澄清答案）
    pub async fn submit(&self, cmd: SubmitTask) -> Result<Task, ApplicationError> {
        let task = self
            .submit_handler
            .handle(cmd)
            .await
            .map_err(|e| self.report("Task submission failed", e))?;

        self.events.publish(LifecycleEvent::TaskCreated {
            task_id: task.id.clone(),
            agent: task.agent.clone(),
        });
        self.observer.refresh_lists();
        Ok(task)
    }

    pub async fn retry(&self, task_id: &TaskId) -> Result<Task, ApplicationError> {
        let task = self
            .retry_handler
            .handle(RetryTask {
                task_id: task_id.clone(),
            })
            .await
            .map_err(|e| self.report("Retry failed", e))?;

        self.events.publish(LifecycleEvent::TaskRetried {
            task_id: task.id.clone(),
        });
        self.events.publish(LifecycleEvent::TaskUpdated {
            task_id: task.id.clone(),
            status: task.status,
        });
        self.observer.refresh_lists();
        self.observer.rearm_task(task_id);
        Ok(task)
    }

    pub async fn delete(&self, task_id: &TaskId) -> Result<(), ApplicationError> {
        self.delete_handler
            .handle(DeleteTask {
                task_id: task_id.clone(),
            })
            .await
            .map_err(|e| self.report("Delete failed", e))?;

        self.observer.stop_task(task_id);
        self.events.publish(LifecycleEvent::TaskDeleted {
            task_id: task_id.clone(),
        });
        self.observer.refresh_lists();
        Ok(())
    }

    pub async fn get(&self, task_id: &TaskId) -> Result<Task, ApplicationError> {
        self.get_handler
            .handle(GetTask {
                task_id: task_id.clone(),
            })
            .await
    }

    pub async fn list(&self, filters: &TaskFilters) -> Result<TaskPage, ApplicationError> {
        self.list_handler
            .handle(ListTasks {
                filters: filters.clone(),
            })
            .await
    }

    /// 统计视图（未失效时来自缓存）
    pub async fn stats(&self) -> Result<TaskStats, ApplicationError> {
        self.stats_handler.handle(GetTaskStats::default()).await
    }

    pub fn observe(&self, task_id: &TaskId) -> Observation<Option<Task>> {
        self.observer.observe_task(task_id)
    }

    pub fn observe_list(&self, filters: &TaskFilters) -> Observation<Option<TaskPage>> {
        self.observer.observe_list(filters)
    }

    /// 打开一个列表视图，从第一页、无过滤开始
    pub fn list_view(&self) -> TaskListView {
        TaskListView::new(self.observer.clone(), TaskFilters::new(self.page_size))
    }

    /// 强制立即重读：被观测的任务与所有被观测的列表
    pub fn refresh(&self, task_id: &TaskId) {
        self.observer.refresh_task(task_id);
        self.observer.refresh_lists();
    }

    pub fn is_polling(&self, task_id: &TaskId) -> bool {
        self.observer.is_polling_task(task_id)
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifier.active()
    }

    pub fn dismiss(&self, notification_id: u64) -> bool {
        self.notifier.dismiss(notification_id)
    }

    /// 停止所有观测；之后的 observe 不再驱动轮询
    pub fn shutdown(&self) {
        self.observer.shutdown();
    }

    fn report(&self, title: &str, error: ApplicationError) -> ApplicationError {
        self.notifier
            .notify(NotificationLevel::Error, title, &error.user_message());
        error
    }
}

/// 列表视图
///
/// 持有当前过滤条件与对应的列表观测；切换条件时先订阅新 key 再释放旧 key。
pub struct TaskListView {
    observer: Arc<dyn TaskObserverPort>,
    filters: TaskFilters,
    observation: Observation<Option<TaskPage>>,
}

impl TaskListView {
    pub fn new(observer: Arc<dyn TaskObserverPort>, filters: TaskFilters) -> Self {
        let observation = observer.observe_list(&filters);
        Self {
            observer,
            filters,
            observation,
        }
    }

    pub fn filters(&self) -> &TaskFilters {
        &self.filters
    }

    pub fn set_department(&mut self, department: Option<String>) {
        let filters = self.filters.clone().with_department(department);
        self.switch(filters);
    }

    pub fn set_status(&mut self, status: Option<TaskStatus>) {
        let filters = self.filters.clone().with_status(status);
        self.switch(filters);
    }

    pub fn set_page(&mut self, page: u32) {
        let filters = self.filters.clone().with_page(page);
        self.switch(filters);
    }

    pub fn current(&self) -> Option<TaskPage> {
        self.observation.current()
    }

    /// 等待下一次列表刷新
    pub async fn changed(&mut self) -> Option<Option<TaskPage>> {
        self.observation.next().await
    }

    pub fn observation_mut(&mut self) -> &mut Observation<Option<TaskPage>> {
        &mut self.observation
    }

    fn switch(&mut self, filters: TaskFilters) {
        if filters == self.filters {
            return;
        }
        self.observation = self.observer.observe_list(&filters);
        self.filters = filters;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::RemoteError;
    use crate::infrastructure::adapters::FakeTaskGateway;
    use crate::infrastructure::events::{EventPublisher, NotificationCenter};
    use crate::infrastructure::memory::InMemoryTaskCache;
    use crate::infrastructure::worker::TaskPoller;
    use crate::domain::PollCadence;
    use std::time::Duration;
    use tokio::time::sleep;

    struct Harness {
        gateway: Arc<FakeTaskGateway>,
        cache: Arc<InMemoryTaskCache>,
        lifecycle: TaskLifecycle,
    }

    fn harness() -> Harness {
        harness_with(FakeTaskGateway::new())
    }

    fn harness_with(gateway: FakeTaskGateway) -> Harness {
        let gateway = Arc::new(gateway);
        let cache = Arc::new(InMemoryTaskCache::new());
        let events = Arc::new(EventPublisher::new());
        let poller = Arc::new(TaskPoller::new(
            PollCadence::default(),
            gateway.clone(),
            cache.clone(),
            events.clone(),
        ));
        let lifecycle = TaskLifecycle::new(
            gateway.clone(),
            cache.clone(),
            poller,
            events,
            Arc::new(NotificationCenter::new()),
        );
        Harness {
            gateway,
            cache,
            lifecycle,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_stops_polling_and_shrinks_list() {
        let h = harness();
        let keep = h.gateway.insert_with_status("invoice", TaskStatus::Processing);
        let doomed = h.gateway.insert_with_status("copywriter", TaskStatus::Processing);

        let mut list = h.lifecycle.observe_list(&TaskFilters::default());
        let _single = h.lifecycle.observe(&doomed.id);
        let page = list.wait_for(|p| p.is_some()).await.flatten().unwrap();
        assert_eq!(page.total, 2);
        sleep(Duration::from_millis(10)).await;
        assert!(h.lifecycle.is_polling(&doomed.id));

        h.lifecycle.delete(&doomed.id).await.unwrap();
        assert!(!h.lifecycle.is_polling(&doomed.id));
        assert!(h.cache.get_task(&doomed.id).is_none());

        let page = list
            .wait_for(|p| p.as_ref().map(|p| p.total) == Some(1))
            .await
            .flatten()
            .unwrap();
        assert!(page.tasks.iter().all(|t| t.id != doomed.id));
        assert_eq!(page.tasks[0].id, keep.id);

        let calls = h.gateway.get_calls(&doomed.id);
        sleep(Duration::from_secs(10)).await;
        assert_eq!(h.gateway.get_calls(&doomed.id), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_resumes_polling_at_active_interval() {
        let h = harness();
        let mut failed = Task::new("copywriter", "marketing", Params::new());
        failed.id = TaskId::from("T2");
        failed.status = TaskStatus::Failed;
        failed.error = Some("quota exceeded".to_string());
        h.gateway.insert(failed);
        let id = TaskId::from("T2");

        let mut observation = h.lifecycle.observe(&id);
        observation
            .wait_for(|t| t.as_ref().map(|t| t.status) == Some(TaskStatus::Failed))
            .await
            .unwrap();
        sleep(Duration::from_secs(10)).await;
        assert_eq!(h.gateway.get_calls(&id), 1);

        let task = h.lifecycle.retry(&id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(
            observation.current().map(|t| t.status),
            Some(TaskStatus::Pending)
        );

        sleep(Duration::from_millis(2100)).await;
        assert_eq!(h.gateway.get_calls(&id), 3);
        sleep(Duration::from_millis(2000)).await;
        assert_eq!(h.gateway.get_calls(&id), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_during_inflight_read_wins() {
        let h = harness_with(FakeTaskGateway::new().with_read_delay(Duration::from_millis(1000)));
        let failed = h.gateway.insert_with_status("copywriter", TaskStatus::Failed);

        // 第一次读取在 0ms 发出，1000ms 时带着 failed 返回
        let observation = h.lifecycle.observe(&failed.id);
        sleep(Duration::from_millis(500)).await;
        let task = h.lifecycle.retry(&failed.id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Pending);

        sleep(Duration::from_millis(600)).await;
        assert_eq!(
            h.cache.get_task(&failed.id).map(|t| t.status),
            Some(TaskStatus::Pending)
        );
        assert_eq!(observation.current().map(|t| t.status), Some(TaskStatus::Pending));
        assert!(h.lifecycle.is_polling(&failed.id));
        // 过期响应返回后立即补读一次
        assert_eq!(h.gateway.get_calls(&failed.id), 2);

        sleep(Duration::from_millis(3000)).await;
        assert_eq!(h.gateway.get_calls(&failed.id), 3);
        assert_eq!(
            h.cache.get_task(&failed.id).map(|t| t.status),
            Some(TaskStatus::Pending)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_rereads_task_and_lists() {
        let h = harness();
        let task = h.gateway.insert_with_status("invoice", TaskStatus::Processing);
        let _single = h.lifecycle.observe(&task.id);
        let _list = h.lifecycle.observe_list(&TaskFilters::default());
        sleep(Duration::from_millis(500)).await;
        assert_eq!(h.gateway.get_calls(&task.id), 1);
        assert_eq!(h.gateway.list_calls(), 1);

        h.lifecycle.refresh(&task.id);
        sleep(Duration::from_millis(10)).await;
        assert_eq!(h.gateway.get_calls(&task.id), 2);
        assert_eq!(h.gateway.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_write_failure_notifies_with_server_message() {
        let h = harness();
        h.gateway
            .fail_next_write(RemoteError::service(429, "quota exceeded"));

        let err = h.lifecycle.create("copywriter", Params::new()).await.unwrap_err();
        assert!(err.is_remote());

        let notifications = h.lifecycle.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].message, "quota exceeded");
        assert_eq!(notifications[0].level, NotificationLevel::Error);

        assert!(h.lifecycle.dismiss(notifications[0].id));
        assert!(h.lifecycle.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_without_message_is_generic() {
        let h = harness();
        h.gateway.fail_next_write(RemoteError::Timeout);
        let done = h.gateway.insert_with_status("invoice", TaskStatus::Failed);

        assert!(h.lifecycle.retry(&done.id).await.is_err());
        assert_eq!(
            h.lifecycle.notifications()[0].message,
            crate::application::error::GENERIC_FAILURE_MESSAGE
        );
    }

    #[tokio::test]
    async fn test_create_invalidates_stats() {
        let h = harness();
        h.gateway.insert_with_status("invoice", TaskStatus::Completed);
        assert_eq!(h.lifecycle.stats().await.unwrap().total, 1);

        let task = h.lifecycle.create("invoice", Params::new()).await.unwrap();
        assert_eq!(task.status, TaskStatus::Pending);

        let stats = h.lifecycle.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.pending, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_view_filter_resets_page() {
        let h = harness();
        for _ in 0..3 {
            h.gateway.insert_with_status("invoice", TaskStatus::Completed);
        }
        h.gateway.insert_with_status("copywriter", TaskStatus::Completed);

        let lifecycle = h.lifecycle.with_page_size(2);
        let mut view = lifecycle.list_view();
        view.set_page(2);
        assert_eq!(view.filters().page, 2);

        view.set_department(Some("finance".to_string()));
        assert_eq!(view.filters().page, 1);

        let page = view
            .observation_mut()
            .wait_for(|p| p.is_some())
            .await
            .flatten()
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.tasks.len(), 2);

        view.set_page(2);
        view.set_status(Some(TaskStatus::Completed));
        assert_eq!(view.filters().page, 1);
    }
}
