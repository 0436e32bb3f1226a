//! Fake Interpreter - 基于关键词规则的解析器
//!
//! 用于测试和离线模式，不调用任何远端服务

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::application::ports::{InterpreterPort, RemoteError};
use crate::domain::{InterpretationResult, Params, QuickAction};

struct Rule {
    keyword: String,
    result: InterpretationResult,
}

/// Fake Interpreter
///
/// 按添加顺序匹配第一个包含关键词（不区分大小写）的规则
pub struct FakeInterpreter {
    rules: Mutex<Vec<Rule>>,
    quick_actions: Mutex<Vec<(QuickAction, InterpretationResult)>>,
    pending_failure: Mutex<Option<RemoteError>>,
    calls: AtomicUsize,
}

impl FakeInterpreter {
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            quick_actions: Mutex::new(Vec::new()),
            pending_failure: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// 预置常见业务规则（离线模式使用）
    pub fn with_defaults() -> Self {
        let interpreter = Self::new();
        interpreter.add_rule(
            "ad copy",
            Self::clarifying("create_copy", "copywriter", &[("copy_type", "What type of copy?")]),
        );
        interpreter.add_rule(
            "invoice",
            Self::clarifying(
                "create_invoice",
                "invoice",
                &[
                    ("client_name", "Who is the client?"),
                    ("amount", "What is the amount?"),
                ],
            ),
        );
        interpreter.add_rule(
            "social",
            Self::clarifying("create_social_post", "social", &[("platform", "Which platform?")]),
        );
        interpreter.add_rule("cashflow", Self::auto("forecast_cashflow", "cashflow", Params::new()));

        let mut month = Params::new();
        month.insert("period".into(), serde_json::json!("current_month"));
        interpreter.add_quick_action(
            QuickAction {
                id: "monthly-cashflow".to_string(),
                label: "Monthly cashflow".to_string(),
                description: Some("Forecast this month's cashflow".to_string()),
                department: Some("finance".to_string()),
                agent: Some("cashflow".to_string()),
            },
            Self::auto("forecast_cashflow", "cashflow", month),
        );
        interpreter.add_quick_action(
            QuickAction {
                id: "new-invoice".to_string(),
                label: "New invoice".to_string(),
                description: None,
                department: Some("finance".to_string()),
                agent: Some("invoice".to_string()),
            },
            Self::clarifying("create_invoice", "invoice", &[("client_name", "Who is the client?")]),
        );
        interpreter
    }

    /// 构造需要追问的解析结果
    pub fn clarifying(intent: &str, agent: &str, questions: &[(&str, &str)]) -> InterpretationResult {
        InterpretationResult {
            intent: intent.to_string(),
            confidence: 0.8,
            suggested_agents: vec![agent.to_string()],
            missing_info: questions.iter().map(|(k, _)| k.to_string()).collect(),
            follow_up_questions: questions.iter().map(|(_, q)| q.to_string()).collect(),
            can_auto_execute: false,
            extracted_params: Params::new(),
            quick_action_id: None,
        }
    }

    /// 构造可直接执行的解析结果
    pub fn auto(intent: &str, agent: &str, params: Params) -> InterpretationResult {
        InterpretationResult {
            intent: intent.to_string(),
            confidence: 0.95,
            suggested_agents: vec![agent.to_string()],
            missing_info: Vec::new(),
            follow_up_questions: Vec::new(),
            can_auto_execute: true,
            extracted_params: params,
            quick_action_id: None,
        }
    }

    pub fn add_rule(&self, keyword: &str, result: InterpretationResult) {
        lock(&self.rules).push(Rule {
            keyword: keyword.to_lowercase(),
            result,
        });
    }

    pub fn add_quick_action(&self, action: QuickAction, result: InterpretationResult) {
        lock(&self.quick_actions).push((action, result));
    }

    /// 下一次调用返回指定错误
    pub fn fail_next(&self, error: RemoteError) {
        *lock(&self.pending_failure) = Some(error);
    }

    /// 已收到的解析请求数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn begin_call(&self) -> Result<(), RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match lock(&self.pending_failure).take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Default for FakeInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl InterpreterPort for FakeInterpreter {
    async fn interpret(&self, message: &str) -> Result<InterpretationResult, RemoteError> {
        self.begin_call()?;
        tokio::task::yield_now().await;

        let lowered = message.to_lowercase();
        let matched = lock(&self.rules)
            .iter()
            .find(|rule| lowered.contains(&rule.keyword))
            .map(|rule| rule.result.clone());

        let result = matched.unwrap_or_else(|| InterpretationResult {
            intent: "unknown".to_string(),
            confidence: 0.1,
            suggested_agents: Vec::new(),
            missing_info: Vec::new(),
            follow_up_questions: Vec::new(),
            can_auto_execute: false,
            extracted_params: Params::new(),
            quick_action_id: None,
        });

        tracing::debug!(intent = %result.intent, "FakeInterpreter: interpreted message");
        Ok(result)
    }

    async fn interpret_quick_action(
        &self,
        action_id: &str,
        params: Option<Params>,
    ) -> Result<InterpretationResult, RemoteError> {
        self.begin_call()?;
        tokio::task::yield_now().await;

        let mut result = lock(&self.quick_actions)
            .iter()
            .find(|(action, _)| action.id == action_id)
            .map(|(_, result)| result.clone())
            .ok_or_else(|| RemoteError::NotFound(format!("quick action {}", action_id)))?;

        if let Some(params) = params {
            result.extracted_params.extend(params);
        }
        result.quick_action_id = Some(action_id.to_string());
        Ok(result)
    }

    async fn quick_actions(&self) -> Result<Vec<QuickAction>, RemoteError> {
        Ok(lock(&self.quick_actions)
            .iter()
            .map(|(action, _)| action.clone())
            .collect())
    }
}
