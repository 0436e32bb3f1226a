//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod events;
mod interpreter;
mod remote;
mod task_cache;
mod task_gateway;
mod task_observer;

pub use events::{EventSinkPort, LifecycleEvent, Notification, NotificationLevel, NotifierPort};
pub use interpreter::InterpreterPort;
pub use remote::RemoteError;
pub use task_cache::{ReadSeq, TaskCachePort};
pub use task_gateway::TaskGatewayPort;
pub use task_observer::{Observation, TaskObserverPort};
