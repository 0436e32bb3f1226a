//! Event Publisher Implementation
//!
//! 生命周期事件广播

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::application::ports::{EventSinkPort, LifecycleEvent};

/// 事件发布器
pub struct EventPublisher {
    channel: broadcast::Sender<LifecycleEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { channel: tx }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅所有生命周期事件
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.channel.subscribe()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSinkPort for EventPublisher {
    fn publish(&self, event: LifecycleEvent) {
        if let Err(e) = self.channel.send(event) {
            tracing::trace!(error = %e, "Failed to publish event (no receivers)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TaskId, TaskStatus};

    #[tokio::test]
    async fn test_publish_to_subscribers() {
        let publisher = EventPublisher::new();
        let mut rx = publisher.subscribe();

        publisher.publish(LifecycleEvent::TaskUpdated {
            task_id: TaskId::from("T1"),
            status: TaskStatus::Processing,
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            LifecycleEvent::TaskUpdated {
                task_id: TaskId::from("T1"),
                status: TaskStatus::Processing,
            }
        );
    }

    #[test]
    fn test_publish_without_receivers_is_silent() {
        let publisher = EventPublisher::new();
        publisher.publish(LifecycleEvent::TaskDeleted {
            task_id: TaskId::from("T1"),
        });
    }

    #[test]
    fn test_event_wire_format() {
        let event = LifecycleEvent::TaskFailed {
            task_id: TaskId::from("T2"),
            error: Some("quota exceeded".to_string()),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "TaskFailed");
        assert_eq!(json["data"]["task_id"], "T2");
        assert_eq!(json["data"]["error"], "quota exceeded");
    }
}
