//! Events Layer - 生命周期事件与用户通知

mod notifications;
mod publisher;

pub use notifications::NotificationCenter;
pub use publisher::EventPublisher;
