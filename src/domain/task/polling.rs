//! 自适应轮询节奏
//!
//! 纯函数：(上一次观测) -> 下一次延迟。与定时器、网络无关。

use std::time::Duration;

use super::Task;

/// 默认活跃间隔
pub const DEFAULT_ACTIVE_INTERVAL: Duration = Duration::from_millis(2000);
/// 默认空闲间隔
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(5000);

/// 轮询节奏
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollCadence {
    /// 存在 pending/processing 任务时的间隔
    pub active: Duration,
    /// 没有活跃任务时的间隔（仅列表模式）
    pub idle: Duration,
}

impl Default for PollCadence {
    fn default() -> Self {
        Self {
            active: DEFAULT_ACTIVE_INTERVAL,
            idle: DEFAULT_IDLE_INTERVAL,
        }
    }
}

impl PollCadence {
    pub fn new(active: Duration, idle: Duration) -> Self {
        Self { active, idle }
    }
}

/// 列表模式：每次读取后重新计算
pub fn next_list_delay(tasks: &[Task], cadence: &PollCadence) -> Duration {
    if tasks.iter().any(|t| t.status.is_active()) {
        cadence.active
    } else {
        cadence.idle
    }
}

/// 单任务模式：终态返回 None（停止调度），否则固定活跃间隔
pub fn next_task_delay(task: &Task, cadence: &PollCadence) -> Option<Duration> {
    if task.status.is_terminal() {
        None
    } else {
        Some(cadence.active)
    }
}
