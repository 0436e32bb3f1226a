//! agentdesk - 自然语言指令驱动的后台任务编排
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Interpretation Context: 解析结果与配对校验
//! - Clarification Context: 逐个追问的状态机
//! - Task Context: 远端任务、过滤条件、轮询节奏
//!
//! 应用层 (application/):
//! - Ports: 端口定义（Interpreter, TaskGateway, TaskCache, TaskObserver, Events）
//! - Commands: CQRS 命令处理器
//! - Queries: CQRS 查询处理器
//! - Lifecycle / Orchestrator: 任务生命周期门面与指令编排
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: HTTP 客户端（reqwest）与内存 Fake
//! - Memory: TaskCache 内存实现
//! - Worker: TaskPoller 自适应轮询
//! - Events: 事件广播与通知中心

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
