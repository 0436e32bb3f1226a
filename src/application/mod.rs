//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（Interpreter、TaskGateway、TaskCache、TaskObserver 等）
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - lifecycle: 任务生命周期门面
//! - orchestrator: 指令编排
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod lifecycle;
pub mod orchestrator;
pub mod ports;
pub mod queries;

// Re-exports
pub use commands::{
    // Interpret commands
    InterpretMessage,
    InterpretQuickAction,
    // Task commands
    DeleteTask,
    RetryTask,
    SubmitTask,
    // Handlers
    handlers::{
        DeleteTaskHandler, InterpretMessageHandler, InterpretQuickActionHandler, RetryTaskHandler,
        SubmitTaskHandler,
    },
};

pub use error::{ApplicationError, GENERIC_FAILURE_MESSAGE};
pub use lifecycle::{TaskLifecycle, TaskListView};
pub use orchestrator::{CommandOrchestrator, Outcome};

pub use ports::{
    // Events
    EventSinkPort,
    LifecycleEvent,
    Notification,
    NotificationLevel,
    NotifierPort,
    // Remote services
    InterpreterPort,
    RemoteError,
    TaskGatewayPort,
    // Cache & observation
    Observation,
    ReadSeq,
    TaskCachePort,
    TaskObserverPort,
};

pub use queries::{
    GetTask,
    GetTaskStats,
    ListQuickActions,
    ListTasks,
    // Handlers
    handlers::{GetTaskHandler, GetTaskStatsHandler, ListQuickActionsHandler, ListTasksHandler},
};
