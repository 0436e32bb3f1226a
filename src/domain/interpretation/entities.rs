//! Interpretation Context - Entities

use serde::{Deserialize, Deserializer, Serialize};

use super::InterpretationError;
use crate::domain::Params;

/// 一次解析的结构化结果
///
/// 不变量:
/// - `missing_info` 与 `follow_up_questions` 等长且按位置一一对应
/// - `can_auto_execute` 为 true 时 `missing_info` 为空
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpretationResult {
    pub intent: String,
    #[serde(default, deserialize_with = "clamped_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub suggested_agents: Vec<String>,
    #[serde(default)]
    pub missing_info: Vec<String>,
    #[serde(default)]
    pub follow_up_questions: Vec<String>,
    #[serde(default)]
    pub can_auto_execute: bool,
    #[serde(default)]
    pub extracted_params: Params,
    #[serde(default)]
    pub quick_action_id: Option<String>,
}

fn clamped_confidence<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.is_nan() {
        return Ok(0.0);
    }
    Ok(value.clamp(0.0, 1.0))
}

impl InterpretationResult {
    /// 边界校验：配对关系不成立时拒绝，不猜测对应关系
    pub fn validate(&self) -> Result<(), InterpretationError> {
        if self.missing_info.len() != self.follow_up_questions.len() {
            return Err(InterpretationError::Malformed {
                missing_info: self.missing_info.len(),
                follow_up_questions: self.follow_up_questions.len(),
            });
        }
        if let Some(position) = self.missing_info.iter().position(|k| k.trim().is_empty()) {
            return Err(InterpretationError::BlankKey(position));
        }
        Ok(())
    }

    pub fn needs_clarification(&self) -> bool {
        !self.missing_info.is_empty()
    }

    /// 首选的执行 agent
    pub fn primary_agent(&self) -> Option<&str> {
        self.suggested_agents
            .iter()
            .map(|a| a.as_str())
            .find(|a| !a.trim().is_empty())
    }

    /// (key, question) 对
    pub fn questions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.missing_info
            .iter()
            .map(|k| k.as_str())
            .zip(self.follow_up_questions.iter().map(|q| q.as_str()))
    }
}

/// 预定义快捷操作
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickAction {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub agent: Option<String>,
}
