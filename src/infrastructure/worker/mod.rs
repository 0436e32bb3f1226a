//! Worker Layer - Background Polling
//!
//! 实现 TaskPoller，按自适应节奏刷新被观测的任务与列表

mod task_poller;

pub use task_poller::TaskPoller;
