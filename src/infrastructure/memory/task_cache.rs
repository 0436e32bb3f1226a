//! In-Memory Task Cache Implementation

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

use crate::application::ports::{ReadSeq, TaskCachePort};
use crate::domain::{Task, TaskFilters, TaskId, TaskPage, TaskStats};

/// 单个 key 的缓存槽
struct Slot<T> {
    sender: watch::Sender<Option<T>>,
    /// 已应用的最大请求序号
    last_seq: ReadSeq,
    stale: bool,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self::starting_at(0)
    }

    /// 序号不大于 floor 的写入一律丢弃
    fn starting_at(floor: ReadSeq) -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender,
            last_seq: floor,
            stale: false,
        }
    }

    fn is_idle(&self) -> bool {
        self.sender.receiver_count() == 0
    }

    fn apply(&mut self, seq: ReadSeq, value: T) -> bool {
        if seq < self.last_seq {
            return false;
        }
        self.last_seq = seq;
        self.stale = false;
        self.sender.send_replace(Some(value));
        true
    }

    fn fresh(&self) -> Option<T>
    where
        T: Clone,
    {
        if self.stale {
            return None;
        }
        self.sender.borrow().clone()
    }
}

/// 内存任务缓存
pub struct InMemoryTaskCache {
    seq: AtomicU64,
    /// task_id -> Task
    tasks: DashMap<TaskId, Slot<Task>>,
    /// filters -> TaskPage
    ///
    /// 没有订阅者的页在观测结束或下一次失效时丢弃。
    /// 任务槽位保留到进程结束（墓碑要挡住在途读取），数量以本次会话接触过的任务为上限。
    pages: DashMap<TaskFilters, Slot<TaskPage>>,
    /// 已丢弃列表页的最大已应用序号，新建的列表页从这里起算
    page_floor: AtomicU64,
    stats: Mutex<Slot<TaskStats>>,
}

impl InMemoryTaskCache {
    pub fn new() -> Self {
        Self {
            seq: AtomicU64::new(0),
            tasks: DashMap::new(),
            pages: DashMap::new(),
            page_floor: AtomicU64::new(0),
            stats: Mutex::new(Slot::new()),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 当前保留的列表页数
    pub fn cached_pages(&self) -> usize {
        self.pages.len()
    }

    fn page_slot(&self) -> Slot<TaskPage> {
        Slot::starting_at(self.page_floor.load(Ordering::SeqCst))
    }

    /// 丢弃前记下序号，防止更早发出的读取在新槽位上生效
    fn prune_page(&self, slot: &Slot<TaskPage>) -> bool {
        if !slot.is_idle() {
            return false;
        }
        self.page_floor.fetch_max(slot.last_seq, Ordering::SeqCst);
        true
    }
}

impl Default for InMemoryTaskCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskCachePort for InMemoryTaskCache {
    fn begin_read(&self) -> ReadSeq {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn put_task(&self, seq: ReadSeq, task: Task) -> bool {
        let task_id = task.id.clone();
        let applied = self
            .tasks
            .entry(task_id.clone())
            .or_insert_with(Slot::new)
            .apply(seq, task);

        if !applied {
            tracing::debug!(task_id = %task_id, seq = seq, "Stale task read discarded");
        }
        applied
    }

    fn get_task(&self, id: &TaskId) -> Option<Task> {
        self.tasks.get(id).and_then(|slot| slot.fresh())
    }

    fn subscribe_task(&self, id: &TaskId) -> watch::Receiver<Option<Task>> {
        self.tasks
            .entry(id.clone())
            .or_insert_with(Slot::new)
            .sender
            .subscribe()
    }

    fn remove_task(&self, seq: ReadSeq, id: &TaskId) {
        let mut slot = self.tasks.entry(id.clone()).or_insert_with(Slot::new);
        slot.last_seq = slot.last_seq.max(seq);
        slot.sender.send_replace(None);
        tracing::debug!(task_id = %id, "Task removed from cache");
    }

    fn put_page(&self, seq: ReadSeq, filters: &TaskFilters, page: TaskPage) -> bool {
        let applied = self
            .pages
            .entry(filters.clone())
            .or_insert_with(|| self.page_slot())
            .apply(seq, page);

        if !applied {
            tracing::debug!(filters = %filters, seq = seq, "Stale list read discarded");
        }
        applied
    }

    fn get_page(&self, filters: &TaskFilters) -> Option<TaskPage> {
        self.pages.get(filters).and_then(|slot| slot.fresh())
    }

    fn subscribe_page(&self, filters: &TaskFilters) -> watch::Receiver<Option<TaskPage>> {
        self.pages
            .entry(filters.clone())
            .or_insert_with(|| self.page_slot())
            .sender
            .subscribe()
    }

    fn release_page(&self, filters: &TaskFilters) {
        if self
            .pages
            .remove_if(filters, |_, slot| self.prune_page(slot))
            .is_some()
        {
            tracing::trace!(filters = %filters, "Idle list view dropped");
        }
    }

    fn invalidate_lists(&self) {
        self.pages.retain(|_, slot| !self.prune_page(slot));
        for mut slot in self.pages.iter_mut() {
            slot.stale = true;
        }
        tracing::debug!(pages = self.pages.len(), "List views invalidated");
    }

    fn put_stats(&self, seq: ReadSeq, stats: TaskStats) -> bool {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(seq, stats)
    }

    fn get_stats(&self) -> Option<TaskStats> {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fresh()
    }

    fn invalidate_stats(&self) {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stale = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Params, TaskStatus};

    fn task_with(status: TaskStatus) -> Task {
        let mut task = Task::new("copywriter", "marketing", Params::new());
        task.status = status;
        task
    }

    #[test]
    fn test_request_order_wins() {
        let cache = InMemoryTaskCache::new();
        let task = task_with(TaskStatus::Processing);

        let slow_poll = cache.begin_read();
        let forced = cache.begin_read();
        assert!(forced > slow_poll);

        let mut fresh = task.clone();
        fresh.status = TaskStatus::Completed;
        assert!(cache.put_task(forced, fresh));

        // 更早发出但更晚返回的读取被丢弃
        assert!(!cache.put_task(slow_poll, task.clone()));
        assert_eq!(
            cache.get_task(&task.id).map(|t| t.status),
            Some(TaskStatus::Completed)
        );
    }

    #[test]
    fn test_tombstone_blocks_resurrection() {
        let cache = InMemoryTaskCache::new();
        let task = task_with(TaskStatus::Pending);
        let first = cache.begin_read();
        cache.put_task(first, task.clone());

        let in_flight = cache.begin_read();
        let delete = cache.begin_read();
        cache.remove_task(delete, &task.id);

        assert!(!cache.put_task(in_flight, task.clone()));
        assert!(cache.get_task(&task.id).is_none());
    }

    #[test]
    fn test_invalidate_lists_marks_stale() {
        let cache = InMemoryTaskCache::new();
        let filters = TaskFilters::default();
        let seq = cache.begin_read();
        cache.put_page(seq, &filters, TaskPage::default());
        assert!(cache.get_page(&filters).is_some());

        cache.invalidate_lists();
        assert!(cache.get_page(&filters).is_none());

        let seq = cache.begin_read();
        cache.put_page(seq, &filters, TaskPage::default());
        assert!(cache.get_page(&filters).is_some());
    }

    #[test]
    fn test_idle_pages_are_dropped() {
        let cache = InMemoryTaskCache::new();
        let watched = TaskFilters::default();
        let visited = TaskFilters::default().with_page(2);

        let rx = cache.subscribe_page(&watched);
        let old_read = cache.begin_read();
        let seq = cache.begin_read();
        cache.put_page(seq, &visited, TaskPage::default());
        assert_eq!(cache.cached_pages(), 2);

        // 仍有订阅者的页不受影响
        cache.release_page(&watched);
        assert_eq!(cache.cached_pages(), 2);

        cache.release_page(&visited);
        assert_eq!(cache.cached_pages(), 1);
        // 丢弃之前发出的读取不能在新槽位上生效
        assert!(!cache.put_page(old_read, &visited, TaskPage::default()));
        assert!(cache.get_page(&visited).is_none());

        drop(rx);
        cache.invalidate_lists();
        assert_eq!(cache.cached_pages(), 0);

        let seq = cache.begin_read();
        assert!(cache.put_page(seq, &watched, TaskPage::default()));
    }

    #[test]
    fn test_stats_invalidation() {
        let cache = InMemoryTaskCache::new();
        assert!(cache.get_stats().is_none());

        let seq = cache.begin_read();
        cache.put_stats(seq, TaskStats::default());
        assert!(cache.get_stats().is_some());

        cache.invalidate_stats();
        assert!(cache.get_stats().is_none());
    }

    #[tokio::test]
    async fn test_subscribers_see_updates() {
        let cache = InMemoryTaskCache::new();
        let task = task_with(TaskStatus::Pending);
        let mut rx = cache.subscribe_task(&task.id);
        assert!(rx.borrow().is_none());

        let seq = cache.begin_read();
        cache.put_task(seq, task.clone());
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().map(|t| t.status), Some(TaskStatus::Pending));

        let seq = cache.begin_read();
        cache.remove_task(seq, &task.id);
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
    }
}
