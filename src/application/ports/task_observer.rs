//! Task Observer Port - 任务观测（轮询调度）抽象
//!
//! 观测以 `Observation` 守卫的形式交给调用方：
//! 同一个 key 的最后一个守卫被 drop 时，该 key 的轮询立即停止。

use tokio::sync::watch;

use crate::domain::{Task, TaskFilters, TaskId, TaskPage};

type Release = Box<dyn FnOnce() + Send + Sync>;

/// 对某个 key 的订阅
pub struct Observation<T> {
    receiver: watch::Receiver<T>,
    release: Option<Release>,
}

impl<T> Observation<T> {
    pub fn new(receiver: watch::Receiver<T>, release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            receiver,
            release: Some(Box::new(release)),
        }
    }

    /// 不驱动任何轮询的订阅（例如观测器已关闭）
    pub fn detached(receiver: watch::Receiver<T>) -> Self {
        Self {
            receiver,
            release: None,
        }
    }

    /// 底层接收端的副本（不延长观测生命周期）
    pub fn receiver(&self) -> watch::Receiver<T> {
        self.receiver.clone()
    }
}

impl<T: Clone> Observation<T> {
    /// 当前缓存值
    pub fn current(&self) -> T {
        self.receiver.borrow().clone()
    }

    /// 等待下一次变化；发送端关闭时返回 None
    pub async fn next(&mut self) -> Option<T> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// 等待满足条件的值（当前值满足时立即返回）
    pub async fn wait_for(&mut self, mut predicate: impl FnMut(&T) -> bool) -> Option<T> {
        loop {
            {
                let value = self.receiver.borrow_and_update();
                if predicate(&*value) {
                    return Some(value.clone());
                }
            }
            self.receiver.changed().await.ok()?;
        }
    }
}

impl<T> Drop for Observation<T> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// Task Observer Port
pub trait TaskObserverPort: Send + Sync {
    /// 单任务模式：立即读取，非终态每个活跃间隔读取一次，终态停止
    fn observe_task(&self, id: &TaskId) -> Observation<Option<Task>>;

    /// 列表模式：立即读取，之后按自适应间隔读取
    fn observe_list(&self, filters: &TaskFilters) -> Observation<Option<TaskPage>>;

    /// 强制立即重读该任务（排在进行中的读取之后）
    fn refresh_task(&self, id: &TaskId);

    /// 强制立即重读所有被观测的列表
    fn refresh_lists(&self);

    /// 重新启用因终态而停止的单任务轮询
    fn rearm_task(&self, id: &TaskId);

    /// 停止该任务的轮询（资源已不存在）
    fn stop_task(&self, id: &TaskId);

    /// 该任务当前是否有读取循环在运行
    fn is_polling_task(&self, id: &TaskId) -> bool;

    /// 停止所有观测
    fn shutdown(&self);
}
