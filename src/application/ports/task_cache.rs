//! Task Cache Port - 任务缓存
//!
//! 进程级 keyed store：按 task id 与列表过滤条件存储。
//! 只有轮询器（读取结果）和 submit/retry/delete（强制失效）会写入。
//!
//! 每次读取在发出请求前调用 `begin_read` 领取序号；
//! 序号小于该 key 已应用序号的写入会被丢弃（以请求顺序为准，而不是响应到达顺序）。

use tokio::sync::watch;

use crate::domain::{Task, TaskFilters, TaskId, TaskPage, TaskStats};

/// 读取请求序号
pub type ReadSeq = u64;

pub trait TaskCachePort: Send + Sync {
    /// 领取一个新的请求序号（单调递增）
    fn begin_read(&self) -> ReadSeq;

    /// 写入单个任务，返回是否被应用
    fn put_task(&self, seq: ReadSeq, task: Task) -> bool;

    /// 读取单个任务
    fn get_task(&self, id: &TaskId) -> Option<Task>;

    /// 订阅单个任务
    fn subscribe_task(&self, id: &TaskId) -> watch::Receiver<Option<Task>>;

    /// 移除任务并留下墓碑，阻止更早发出的读取复活它
    fn remove_task(&self, seq: ReadSeq, id: &TaskId);

    /// 写入列表页，返回是否被应用
    fn put_page(&self, seq: ReadSeq, filters: &TaskFilters, page: TaskPage) -> bool;

    /// 读取列表页（失效或不存在时返回 None）
    fn get_page(&self, filters: &TaskFilters) -> Option<TaskPage>;

    /// 订阅列表页
    fn subscribe_page(&self, filters: &TaskFilters) -> watch::Receiver<Option<TaskPage>>;

    /// 丢弃没有订阅者的列表页（列表观测结束时调用）
    fn release_page(&self, filters: &TaskFilters);

    /// 标记所有列表页失效；没有订阅者的列表页直接丢弃
    fn invalidate_lists(&self);

    /// 写入统计视图
    fn put_stats(&self, seq: ReadSeq, stats: TaskStats) -> bool;

    /// 读取统计视图（失效或不存在时返回 None）
    fn get_stats(&self) -> Option<TaskStats>;

    /// 标记统计视图失效
    fn invalidate_stats(&self);
}
