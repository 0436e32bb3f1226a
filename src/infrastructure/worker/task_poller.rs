//! Task Poller - 自适应轮询调度器
//!
//! 每个被观测的 key（单个任务或一组列表过滤条件）至多一个读取循环：
//! - 订阅即立即读取一次
//! - 读取完成后按 `next_task_delay` / `next_list_delay` 计算下一次延迟
//! - 同一 key 的最后一个订阅者离开时取消循环，在途读取的结果被丢弃
//! - 读取失败保留旧缓存值，按上一次延迟继续
//!
//! 同一个循环内的读取天然串行，因此同一 key 永远不会有两个并发读取。

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{
    EventSinkPort, LifecycleEvent, Observation, ReadSeq, TaskCachePort, TaskGatewayPort,
    TaskObserverPort,
};
use crate::domain::task::polling::{next_list_delay, next_task_delay};
use crate::domain::{PollCadence, Task, TaskFilters, TaskId, TaskPage, TaskStatus};

#[derive(Debug, Default)]
struct LoopState {
    /// 读取循环是否存活
    running: bool,
    /// 本次读取期间收到了 rearm，终态时不停止
    rearm: bool,
}

/// 单个 key 的轮询槽位
struct PollSlot {
    token: CancellationToken,
    wake: Notify,
    subscribers: AtomicUsize,
    state: Mutex<LoopState>,
}

impl PollSlot {
    fn new(token: CancellationToken) -> Self {
        Self {
            token,
            wake: Notify::new(),
            subscribers: AtomicUsize::new(1),
            state: Mutex::new(LoopState {
                running: true,
                rearm: false,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, LoopState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_running(&self) -> bool {
        self.state().running
    }

    fn begin_read(&self) {
        self.state().rearm = false;
    }

    /// 终态时调用；返回 true 表示循环应退出
    fn finish(&self) -> bool {
        let mut state = self.state();
        if state.rearm {
            state.rearm = false;
            false
        } else {
            state.running = false;
            true
        }
    }

    /// 等待下一次读取：延迟到期、被唤醒或被取消（返回 false）
    async fn wait(&self, delay: Duration) -> bool {
        tokio::select! {
            _ = self.token.cancelled() => false,
            _ = self.wake.notified() => true,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

fn acquire<K: Eq + Hash + Clone>(
    map: &DashMap<K, Arc<PollSlot>>,
    key: &K,
    root: &CancellationToken,
) -> (Arc<PollSlot>, bool) {
    match map.entry(key.clone()) {
        Entry::Occupied(entry) => {
            let slot = entry.get().clone();
            slot.subscribers.fetch_add(1, Ordering::SeqCst);
            (slot, false)
        }
        Entry::Vacant(entry) => {
            let slot = Arc::new(PollSlot::new(root.child_token()));
            entry.insert(slot.clone());
            (slot, true)
        }
    }
}

fn release<K: Eq + Hash>(map: &DashMap<K, Arc<PollSlot>>, key: &K, slot: &Arc<PollSlot>) {
    // 计数在分片锁内递减，与 acquire 的递增互斥
    let removed = map.remove_if(key, |_, current| {
        Arc::ptr_eq(current, slot) && slot.subscribers.fetch_sub(1, Ordering::SeqCst) == 1
    });
    if removed.is_some() {
        slot.token.cancel();
    }
}

struct Inner {
    cadence: PollCadence,
    gateway: Arc<dyn TaskGatewayPort>,
    cache: Arc<dyn TaskCachePort>,
    events: Arc<dyn EventSinkPort>,
    root: CancellationToken,
    tasks: DashMap<TaskId, Arc<PollSlot>>,
    lists: DashMap<TaskFilters, Arc<PollSlot>>,
}

impl Inner {
    async fn run_task_loop(self: Arc<Self>, id: TaskId, slot: Arc<PollSlot>) {
        tracing::debug!(task_id = %id, "Task poll loop started");
        // 第一次读取前没有可参考的观测值
        let mut delay = self.cadence.active;

        loop {
            slot.begin_read();
            let seq = self.cache.begin_read();
            let result = tokio::select! {
                _ = slot.token.cancelled() => break,
                result = self.gateway.get_task(&id) => result,
            };
            if slot.token.is_cancelled() {
                break;
            }

            match result {
                Ok(task) => match self.apply_task(seq, task) {
                    Some(next) => delay = next,
                    None => {
                        if slot.finish() {
                            tracing::debug!(task_id = %id, "Task reached terminal status, polling stopped");
                            return;
                        }
                    }
                },
                Err(e) => {
                    tracing::warn!(task_id = %id, error = %e, "Task poll failed");
                    self.events.publish(LifecycleEvent::PollFailed {
                        key: format!("task:{}", id),
                        error: e.to_string(),
                    });
                }
            }

            if !slot.wait(delay).await {
                break;
            }
        }

        slot.state().running = false;
        tracing::debug!(task_id = %id, "Task poll loop cancelled");
    }

    /// 写入读取结果并返回下一次延迟；None 表示终态
    fn apply_task(&self, seq: ReadSeq, task: Task) -> Option<Duration> {
        let previous = self.cache.get_task(&task.id).map(|t| t.status);
        let id = task.id.clone();
        let status = task.status;
        let error = task.error.clone();
        let delay = next_task_delay(&task, &self.cadence);

        if !self.cache.put_task(seq, task) {
            // 更新的读取已先一步写入，以缓存中的值为准
            tracing::trace!(task_id = %id, seq, "Stale task read discarded");
            return self
                .cache
                .get_task(&id)
                .and_then(|current| next_task_delay(&current, &self.cadence));
        }

        if previous != Some(status) {
            self.events.publish(LifecycleEvent::TaskUpdated {
                task_id: id.clone(),
                status,
            });
            if status == TaskStatus::Failed {
                self.events.publish(LifecycleEvent::TaskFailed {
                    task_id: id.clone(),
                    error,
                });
            }
        }

        delay
    }

    async fn run_list_loop(self: Arc<Self>, filters: TaskFilters, slot: Arc<PollSlot>) {
        tracing::debug!(filters = %filters, "List poll loop started");
        let mut delay = self.cadence.idle;

        loop {
            let seq = self.cache.begin_read();
            let result = tokio::select! {
                _ = slot.token.cancelled() => break,
                result = self.gateway.list_tasks(&filters) => result,
            };
            if slot.token.is_cancelled() {
                break;
            }

            match result {
                Ok(page) => delay = self.apply_page(seq, &filters, page),
                Err(e) => {
                    tracing::warn!(filters = %filters, error = %e, "List poll failed");
                    self.events.publish(LifecycleEvent::PollFailed {
                        key: format!("list:{}", filters),
                        error: e.to_string(),
                    });
                }
            }

            if !slot.wait(delay).await {
                break;
            }
        }

        slot.state().running = false;
        self.cache.release_page(&filters);
        tracing::debug!(filters = %filters, "List poll loop cancelled");
    }

    fn apply_page(&self, seq: ReadSeq, filters: &TaskFilters, page: TaskPage) -> Duration {
        let delay = next_list_delay(&page.tasks, &self.cadence);
        let total = page.total;
        if self.cache.put_page(seq, filters, page) {
            self.events.publish(LifecycleEvent::ListUpdated {
                filters: filters.to_string(),
                total,
            });
        }
        delay
    }

    /// 确保任务循环在运行；运行中则唤醒并标记 rearm
    fn ensure_task_loop(self: &Arc<Self>, id: &TaskId) {
        let Some(slot) = self.tasks.get(id).map(|s| Arc::clone(s.value())) else {
            return;
        };
        let mut state = slot.state();
        if state.running {
            state.rearm = true;
            drop(state);
            slot.wake.notify_one();
        } else if !slot.token.is_cancelled() {
            state.running = true;
            drop(state);
            tokio::spawn(self.clone().run_task_loop(id.clone(), slot));
        }
    }
}

/// 任务轮询器
pub struct TaskPoller {
    inner: Arc<Inner>,
}

impl TaskPoller {
    pub fn new(
        cadence: PollCadence,
        gateway: Arc<dyn TaskGatewayPort>,
        cache: Arc<dyn TaskCachePort>,
        events: Arc<dyn EventSinkPort>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                cadence,
                gateway,
                cache,
                events,
                root: CancellationToken::new(),
                tasks: DashMap::new(),
                lists: DashMap::new(),
            }),
        }
    }

    pub fn cadence(&self) -> PollCadence {
        self.inner.cadence
    }

    /// 当前被观测的列表数
    pub fn observed_lists(&self) -> usize {
        self.inner.lists.len()
    }
}

impl Drop for TaskPoller {
    fn drop(&mut self) {
        self.inner.root.cancel();
    }
}

impl TaskObserverPort for TaskPoller {
    fn observe_task(&self, id: &TaskId) -> Observation<Option<Task>> {
        let receiver = self.inner.cache.subscribe_task(id);
        if self.inner.root.is_cancelled() {
            return Observation::detached(receiver);
        }

        let (slot, created) = acquire(&self.inner.tasks, id, &self.inner.root);
        if created {
            tokio::spawn(self.inner.clone().run_task_loop(id.clone(), slot.clone()));
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let id = id.clone();
        Observation::new(receiver, move || {
            if let Some(inner) = weak.upgrade() {
                release(&inner.tasks, &id, &slot);
            }
        })
    }

    fn observe_list(&self, filters: &TaskFilters) -> Observation<Option<TaskPage>> {
        let receiver = self.inner.cache.subscribe_page(filters);
        if self.inner.root.is_cancelled() {
            return Observation::detached(receiver);
        }

        let (slot, created) = acquire(&self.inner.lists, filters, &self.inner.root);
        if created {
            tokio::spawn(
                self.inner
                    .clone()
                    .run_list_loop(filters.clone(), slot.clone()),
            );
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let filters = filters.clone();
        Observation::new(receiver, move || {
            if let Some(inner) = weak.upgrade() {
                release(&inner.lists, &filters, &slot);
            }
        })
    }

    fn refresh_task(&self, id: &TaskId) {
        // 只唤醒存活的循环；终态后停止的循环要由 rearm 重启
        if let Some(slot) = self.inner.tasks.get(id) {
            if slot.is_running() {
                slot.wake.notify_one();
            }
        }
    }

    fn refresh_lists(&self) {
        for slot in self.inner.lists.iter() {
            slot.wake.notify_one();
        }
    }

    fn rearm_task(&self, id: &TaskId) {
        tracing::debug!(task_id = %id, "Rearming task polling");
        self.inner.ensure_task_loop(id);
    }

    fn stop_task(&self, id: &TaskId) {
        if let Some((_, slot)) = self.inner.tasks.remove(id) {
            slot.token.cancel();
            tracing::debug!(task_id = %id, "Task polling stopped");
        }
    }

    fn is_polling_task(&self, id: &TaskId) -> bool {
        self.inner
            .tasks
            .get(id)
            .map(|slot| slot.is_running())
            .unwrap_or(false)
    }

    fn shutdown(&self) {
        self.inner.root.cancel();
        self.inner.tasks.clear();
        self.inner.lists.clear();
        tracing::info!("Task poller shut down");
    }
}
