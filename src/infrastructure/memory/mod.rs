//! Memory Layer - In-Memory State Management
//!
//! 实现 TaskCache，保存任务与列表视图的进程级缓存

mod task_cache;

pub use task_cache::InMemoryTaskCache;
