//! 端到端：指令 -> 追问 -> 提交 -> 轮询 -> 重试 / 删除

use std::sync::Arc;
use std::time::Duration;

use agentdesk::application::{CommandOrchestrator, LifecycleEvent, Outcome, TaskLifecycle};
use agentdesk::domain::{Params, PollCadence, Task, TaskFilters, TaskStatus};
use agentdesk::infrastructure::adapters::{FakeInterpreter, FakeTaskGateway};
use agentdesk::infrastructure::events::{EventPublisher, NotificationCenter};
use agentdesk::infrastructure::memory::InMemoryTaskCache;
use agentdesk::infrastructure::worker::TaskPoller;
use serde_json::json;
use tokio::time::sleep;

struct Desk {
    gateway: Arc<FakeTaskGateway>,
    events: Arc<EventPublisher>,
    lifecycle: Arc<TaskLifecycle>,
    orchestrator: CommandOrchestrator,
}

fn desk() -> Desk {
    let interpreter = Arc::new(FakeInterpreter::with_defaults());
    let gateway = Arc::new(FakeTaskGateway::new());
    let cache = Arc::new(InMemoryTaskCache::new());
    let events = Arc::new(EventPublisher::new());
    let poller = Arc::new(TaskPoller::new(
        PollCadence::default(),
        gateway.clone(),
        cache.clone(),
        events.clone(),
    ));
    let lifecycle = Arc::new(TaskLifecycle::new(
        gateway.clone(),
        cache,
        poller,
        events.clone(),
        Arc::new(NotificationCenter::new()),
    ));
    let orchestrator = CommandOrchestrator::new(interpreter, lifecycle.clone());
    Desk {
        gateway,
        events,
        lifecycle,
        orchestrator,
    }
}

fn status(value: &Option<Task>) -> Option<TaskStatus> {
    value.as_ref().map(|t| t.status)
}

#[tokio::test(start_paused = true)]
async fn clarified_request_is_tracked_to_completion() {
    let desk = desk();

    let Outcome::Question(question) = desk
        .orchestrator
        .submit_message("Ad copy for a spring sale")
        .await
        .unwrap()
    else {
        panic!("expected a follow-up question");
    };
    assert_eq!(question.key, "copy_type");

    let Outcome::Submitted(task) = desk.orchestrator.answer("ad").await.unwrap() else {
        panic!("expected the task to be submitted");
    };
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.input["copy_type"], json!("ad"));

    desk.gateway.script(
        &task.id,
        vec![TaskStatus::Pending, TaskStatus::Processing, TaskStatus::Completed],
    );

    let mut view = desk.orchestrator.task_view();
    view.wait_for(|t| status(t) == Some(TaskStatus::Completed))
        .await
        .unwrap();
    assert_eq!(desk.gateway.get_calls(&task.id), 3);

    sleep(Duration::from_secs(20)).await;
    assert_eq!(desk.gateway.get_calls(&task.id), 3);
}

#[tokio::test(start_paused = true)]
async fn failed_task_can_be_retried() {
    let desk = desk();
    let mut events = desk.events.subscribe();

    let Outcome::Submitted(task) = desk
        .orchestrator
        .submit_quick_action("monthly-cashflow", None)
        .await
        .unwrap()
    else {
        panic!("expected auto execution");
    };
    desk.gateway.script(&task.id, vec![TaskStatus::Failed]);

    let mut view = desk.orchestrator.task_view();
    let failed = (*view
        .wait_for(|t| status(t) == Some(TaskStatus::Failed))
        .await
        .unwrap())
    .clone()
    .unwrap();
    assert!(failed.failure_reason().is_some());

    let mut saw_failure = false;
    while let Ok(event) = events.try_recv() {
        if let LifecycleEvent::TaskFailed { task_id, error } = event {
            assert_eq!(task_id, task.id);
            assert!(error.is_some());
            saw_failure = true;
        }
    }
    assert!(saw_failure);

    let retried = desk.lifecycle.retry(&task.id).await.unwrap();
    assert_eq!(retried.status, TaskStatus::Pending);
    let calls = desk.gateway.get_calls(&task.id);

    sleep(Duration::from_millis(2100)).await;
    assert_eq!(desk.gateway.get_calls(&task.id), calls + 2);
}

#[tokio::test(start_paused = true)]
async fn deleted_task_leaves_list() {
    let desk = desk();
    let a = desk.lifecycle.create("invoice", Params::new()).await.unwrap();
    let b = desk.lifecycle.create("copywriter", Params::new()).await.unwrap();

    let mut view = desk.lifecycle.list_view();
    let page = view
        .observation_mut()
        .wait_for(|p| p.is_some())
        .await
        .flatten()
        .unwrap();
    assert_eq!(page.total, 2);

    desk.lifecycle.delete(&b.id).await.unwrap();
    let page = view
        .observation_mut()
        .wait_for(|p| p.as_ref().map(|p| p.total) == Some(1))
        .await
        .flatten()
        .unwrap();
    assert_eq!(page.tasks[0].id, a.id);

    let err = desk.lifecycle.get(&b.id).await.unwrap_err();
    assert!(matches!(
        err,
        agentdesk::application::ApplicationError::NotFound { .. }
    ));
    assert_eq!(desk.lifecycle.stats().await.unwrap().total, 1);

    let finance = desk
        .lifecycle
        .list(&TaskFilters::default().with_department(Some("finance".to_string())))
        .await
        .unwrap();
    assert_eq!(finance.total, 1);
}
