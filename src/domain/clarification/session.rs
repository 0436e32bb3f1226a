//! Clarification Session - 追问状态机
//!
//! Closed --open--> Asking(0) --advance--> Asking(n) --advance--> Submitting --complete--> Done
//!                      |                                              |
//!                   cancel --> Cancelled                   submission_failed --> Asking(last)

use std::collections::HashMap;

use serde_json::Value;

use super::ClarificationError;
use crate::domain::interpretation::{InterpretationError, InterpretationResult};
use crate::domain::Params;

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClarificationState {
    Closed,
    Asking(usize),
    Submitting,
    Done,
    Cancelled,
}

impl ClarificationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClarificationState::Closed => "closed",
            ClarificationState::Asking(_) => "asking",
            ClarificationState::Submitting => "submitting",
            ClarificationState::Done => "done",
            ClarificationState::Cancelled => "cancelled",
        }
    }
}

/// 当前待回答的问题
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClarificationQuestion {
    pub index: usize,
    pub total: usize,
    pub key: String,
    pub text: String,
}

/// advance() 的结果
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// 进入下一个问题
    Next(ClarificationQuestion),
    /// 全部回答完毕，合并后的答案
    Complete(Params),
}

/// 追问会话（瞬态，不持久化）
#[derive(Debug)]
pub struct ClarificationSession {
    state: ClarificationState,
    questions: Vec<String>,
    keys: Vec<String>,
    answers: HashMap<String, String>,
}

impl Default for ClarificationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ClarificationSession {
    pub fn new() -> Self {
        Self {
            state: ClarificationState::Closed,
            questions: Vec::new(),
            keys: Vec::new(),
            answers: HashMap::new(),
        }
    }

    /// 以新的解析结果打开会话
    ///
    /// 无论之前处于什么状态都会清空答案和游标。
    /// 返回 `Ok(None)` 表示无需追问（直接提交）。
    pub fn open(
        &mut self,
        result: &InterpretationResult,
    ) -> Result<Option<ClarificationQuestion>, InterpretationError> {
        self.reset();

        result.validate()?;
        if !result.needs_clarification() {
            return Ok(None);
        }

        self.keys = result.missing_info.clone();
        self.questions = result.follow_up_questions.clone();
        self.state = ClarificationState::Asking(0);

        tracing::debug!(
            intent = %result.intent,
            questions = self.questions.len(),
            "Clarification session opened"
        );
        Ok(self.current_question())
    }

    /// 记录当前问题的答案
    pub fn record_answer(&mut self, value: impl Into<String>) -> Result<(), ClarificationError> {
        let cursor = self.cursor()?;
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ClarificationError::EmptyAnswer);
        }
        self.answers.insert(self.keys[cursor].clone(), value);
        Ok(())
    }

    /// 前进到下一个问题，或在最后一个问题后进入 Submitting
    pub fn advance(&mut self) -> Result<Advance, ClarificationError> {
        let cursor = self.cursor()?;
        let key = &self.keys[cursor];
        if !self.answers.contains_key(key) {
            return Err(ClarificationError::AnswerMissing(key.clone()));
        }

        if cursor + 1 < self.questions.len() {
            self.state = ClarificationState::Asking(cursor + 1);
            // cursor 在范围内
            let next = self.question_at(cursor + 1);
            return Ok(Advance::Next(next));
        }

        self.state = ClarificationState::Submitting;
        let answers: Params = self
            .answers
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        Ok(Advance::Complete(answers))
    }

    /// 取消：仅在 Asking 状态生效，丢弃所有答案
    pub fn cancel(&mut self) -> bool {
        if !matches!(self.state, ClarificationState::Asking(_)) {
            return false;
        }
        self.reset();
        self.state = ClarificationState::Cancelled;
        tracing::debug!("Clarification session cancelled");
        true
    }

    /// 提交成功
    pub fn complete(&mut self) -> Result<(), ClarificationError> {
        if self.state != ClarificationState::Submitting {
            return Err(ClarificationError::NotSubmitting(self.state.as_str()));
        }
        self.reset();
        self.state = ClarificationState::Done;
        Ok(())
    }

    /// 提交失败：回到最后一个问题，保留答案以便用户重新提交
    pub fn submission_failed(&mut self) -> Result<ClarificationQuestion, ClarificationError> {
        if self.state != ClarificationState::Submitting {
            return Err(ClarificationError::NotSubmitting(self.state.as_str()));
        }
        let last = self.questions.len() - 1;
        self.state = ClarificationState::Asking(last);
        Ok(self.question_at(last))
    }

    pub fn state(&self) -> ClarificationState {
        self.state
    }

    pub fn answers(&self) -> &HashMap<String, String> {
        &self.answers
    }

    pub fn current_question(&self) -> Option<ClarificationQuestion> {
        match self.state {
            ClarificationState::Asking(cursor) => Some(self.question_at(cursor)),
            _ => None,
        }
    }

    fn cursor(&self) -> Result<usize, ClarificationError> {
        match self.state {
            ClarificationState::Asking(cursor) => Ok(cursor),
            other => Err(ClarificationError::NotAsking(other.as_str())),
        }
    }

    fn question_at(&self, index: usize) -> ClarificationQuestion {
        ClarificationQuestion {
            index,
            total: self.questions.len(),
            key: self.keys[index].clone(),
            text: self.questions[index].clone(),
        }
    }

    fn reset(&mut self) {
        self.state = ClarificationState::Closed;
        self.questions.clear();
        self.keys.clear();
        self.answers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interpretation(pairs: &[(&str, &str)]) -> InterpretationResult {
        InterpretationResult {
            intent: "create_invoice".to_string(),
            confidence: 0.8,
            suggested_agents: vec!["invoice".to_string()],
            missing_info: pairs.iter().map(|(k, _)| k.to_string()).collect(),
            follow_up_questions: pairs.iter().map(|(_, q)| q.to_string()).collect(),
            can_auto_execute: pairs.is_empty(),
            extracted_params: Params::new(),
            quick_action_id: None,
        }
    }

    #[test]
    fn test_n_questions_need_n_answers() {
        let mut session = ClarificationSession::new();
        let first = session
            .open(&interpretation(&[
                ("client_name", "Who is the client?"),
                ("amount", "What is the amount?"),
                ("due_date", "When is it due?"),
            ]))
            .unwrap()
            .unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(first.total, 3);

        session.record_answer("Acme").unwrap();
        match session.advance().unwrap() {
            Advance::Next(q) => assert_eq!(q.key, "amount"),
            other => panic!("unexpected {:?}", other),
        }

        session.record_answer("1200").unwrap();
        assert!(matches!(session.advance().unwrap(), Advance::Next(_)));
        assert_eq!(session.state(), ClarificationState::Asking(2));

        session.record_answer("2024-04-01").unwrap();
        match session.advance().unwrap() {
            Advance::Complete(answers) => {
                assert_eq!(answers.len(), 3);
                assert_eq!(answers["client_name"], "Acme");
                assert_eq!(answers["due_date"], "2024-04-01");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(session.state(), ClarificationState::Submitting);
    }

    #[test]
    fn test_advance_without_answer_keeps_cursor() {
        let mut session = ClarificationSession::new();
        session
            .open(&interpretation(&[("tone", "Which tone?"), ("length", "How long?")]))
            .unwrap();

        let err = session.advance().unwrap_err();
        assert_eq!(err, ClarificationError::AnswerMissing("tone".to_string()));
        assert_eq!(session.state(), ClarificationState::Asking(0));

        assert_eq!(session.record_answer("   "), Err(ClarificationError::EmptyAnswer));
        assert!(session.advance().is_err());
        assert_eq!(session.state(), ClarificationState::Asking(0));
    }

    #[test]
    fn test_reopen_resets_prior_session() {
        let mut session = ClarificationSession::new();
        session
            .open(&interpretation(&[("a", "A?"), ("b", "B?")]))
            .unwrap();
        session.record_answer("first").unwrap();
        session.advance().unwrap();
        assert_eq!(session.state(), ClarificationState::Asking(1));

        let question = session
            .open(&interpretation(&[("c", "C?")]))
            .unwrap()
            .unwrap();
        assert_eq!(question.key, "c");
        assert_eq!(session.state(), ClarificationState::Asking(0));
        assert!(session.answers().is_empty());
    }

    #[test]
    fn test_empty_missing_info_bypasses() {
        let mut session = ClarificationSession::new();
        assert_eq!(session.open(&interpretation(&[])).unwrap(), None);
        assert_eq!(session.state(), ClarificationState::Closed);
        assert!(session.record_answer("x").is_err());
    }

    #[test]
    fn test_malformed_fails_closed() {
        let mut session = ClarificationSession::new();
        session.open(&interpretation(&[("a", "A?")])).unwrap();
        session.record_answer("kept?").unwrap();

        let mut bad = interpretation(&[("x", "X?")]);
        bad.follow_up_questions.clear();
        assert!(session.open(&bad).is_err());
        assert_eq!(session.state(), ClarificationState::Closed);
        assert!(session.answers().is_empty());
        assert!(session.current_question().is_none());
    }

    #[test]
    fn test_cancel_discards_answers() {
        let mut session = ClarificationSession::new();
        session.open(&interpretation(&[("a", "A?"), ("b", "B?")])).unwrap();
        session.record_answer("1").unwrap();

        assert!(session.cancel());
        assert_eq!(session.state(), ClarificationState::Cancelled);
        assert!(session.answers().is_empty());
        assert!(!session.cancel());
    }

    #[test]
    fn test_submission_failure_returns_to_last_question() {
        let mut session = ClarificationSession::new();
        session.open(&interpretation(&[("a", "A?"), ("b", "B?")])).unwrap();
        session.record_answer("1").unwrap();
        session.advance().unwrap();
        session.record_answer("2").unwrap();
        session.advance().unwrap();

        let question = session.submission_failed().unwrap();
        assert_eq!(question.key, "b");
        assert_eq!(session.answers().len(), 2);
        assert!(matches!(session.advance().unwrap(), Advance::Complete(_)));

        session.complete().unwrap();
        assert_eq!(session.state(), ClarificationState::Done);
        assert!(session.complete().is_err());
    }
}
