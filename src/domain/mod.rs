//! Domain Layer - 领域层
//!
//! 包含三个限界上下文:
//! - Interpretation Context: 自然语言指令解析结果
//! - Clarification Context: 缺失参数追问
//! - Task Context: 远端任务与轮询节奏

pub mod clarification;
pub mod interpretation;
pub mod task;

/// 参数映射（解析参数、追问答案、任务输入输出）
pub type Params = serde_json::Map<String, serde_json::Value>;

pub use clarification::{Advance, ClarificationError, ClarificationQuestion, ClarificationSession, ClarificationState};
pub use interpretation::{InterpretationError, InterpretationResult, QuickAction};
pub use task::{PollCadence, Task, TaskFilters, TaskId, TaskPage, TaskStats, TaskStatus};
