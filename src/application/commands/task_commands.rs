//! Task Commands - 任务写操作命令

use crate::domain::{Params, TaskId};

/// 提交任务命令
///
/// `answers` 在 key 冲突时覆盖 `extracted_params`
#[derive(Debug, Clone)]
pub struct SubmitTask {
    pub agent_kind: String,
    pub extracted_params: Params,
    pub answers: Params,
}

impl SubmitTask {
    /// 直接以完整输入创建（无追问）
    pub fn new(agent_kind: impl Into<String>, input: Params) -> Self {
        Self {
            agent_kind: agent_kind.into(),
            extracted_params: input,
            answers: Params::new(),
        }
    }

    pub fn with_answers(mut self, answers: Params) -> Self {
        self.answers = answers;
        self
    }

    /// 合并后的任务输入
    pub fn merged_input(&self) -> Params {
        let mut input = self.extracted_params.clone();
        for (key, value) in &self.answers {
            input.insert(key.clone(), value.clone());
        }
        input
    }
}

/// 重试失败任务
#[derive(Debug, Clone)]
pub struct RetryTask {
    pub task_id: TaskId,
}

/// 删除任务
#[derive(Debug, Clone)]
pub struct DeleteTask {
    pub task_id: TaskId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_answers_take_precedence() {
        let mut extracted = Params::new();
        extracted.insert("topic".into(), json!("spring sale"));
        extracted.insert("copy_type".into(), json!("email"));

        let mut answers = Params::new();
        answers.insert("copy_type".into(), json!("ad"));

        let cmd = SubmitTask::new("copywriter", extracted).with_answers(answers);
        let input = cmd.merged_input();
        assert_eq!(input["copy_type"], json!("ad"));
        assert_eq!(input["topic"], json!("spring sale"));
        assert_eq!(input.len(), 2);
    }
}
