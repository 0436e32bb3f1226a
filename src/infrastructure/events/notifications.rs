//! Notification Center - 可关闭的用户通知

use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::application::ports::{Notification, NotificationLevel, NotifierPort};

/// 内存通知中心
pub struct NotificationCenter {
    next_id: AtomicU64,
    active: DashMap<u64, Notification>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            active: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifierPort for NotificationCenter {
    fn notify(&self, level: NotificationLevel, title: &str, message: &str) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.active.insert(
            id,
            Notification {
                id,
                level,
                title: title.to_string(),
                message: message.to_string(),
                created_at: Utc::now(),
            },
        );
        tracing::debug!(id = id, level = ?level, title = %title, "Notification raised");
        id
    }

    fn dismiss(&self, id: u64) -> bool {
        self.active.remove(&id).is_some()
    }

    fn active(&self) -> Vec<Notification> {
        let mut notifications: Vec<Notification> =
            self.active.iter().map(|n| n.value().clone()).collect();
        notifications.sort_by_key(|n| n.id);
        notifications
    }
}
