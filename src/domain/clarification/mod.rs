//! Clarification Context - 追问上下文
//!
//! 逐个收集解析结果中缺失的参数

mod errors;
mod session;

pub use errors::ClarificationError;
pub use session::{Advance, ClarificationQuestion, ClarificationSession, ClarificationState};
