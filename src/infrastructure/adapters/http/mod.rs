//! HTTP Adapters - 远端 REST API 客户端

mod client;
mod interpreter_client;
mod task_client;

pub use client::{ApiClient, ApiClientConfig};
pub use interpreter_client::HttpInterpreterClient;
pub use task_client::HttpTaskGateway;
