//! Fake Adapters - 内存实现的远端服务
//!
//! 测试与 `--offline` 模式共用

mod fake_interpreter;
mod fake_task_gateway;

pub use fake_interpreter::FakeInterpreter;
pub use fake_task_gateway::FakeTaskGateway;
