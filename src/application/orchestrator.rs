//! Command Orchestrator - 指令到任务的端到端编排
//!
//! message -> interpretation -> {直接执行 | 确认 | 逐个追问} -> submission -> 跟踪任务
//!
//! 新的指令总是丢弃之前的解析结果和追问会话；
//! 仍在途中的旧解析返回后按代号判定为过期并丢弃。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

use crate::application::commands::handlers::{InterpretMessageHandler, InterpretQuickActionHandler};
use crate::application::commands::{InterpretMessage, InterpretQuickAction, SubmitTask};
use crate::application::error::ApplicationError;
use crate::application::lifecycle::TaskLifecycle;
use crate::application::ports::InterpreterPort;
use crate::domain::{
    Advance, ClarificationQuestion, ClarificationSession, ClarificationState, InterpretationResult,
    Params, Task,
};

/// 一次交互的结果
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// 任务已创建并开始跟踪
    Submitted(Task),
    /// 需要回答的下一个问题
    Question(ClarificationQuestion),
    /// 信息齐全但不允许自动执行，等待 `confirm()`
    NeedsConfirmation(InterpretationResult),
}

#[derive(Default)]
struct State {
    session: ClarificationSession,
    current: Option<InterpretationResult>,
}

/// 指令编排器
pub struct CommandOrchestrator {
    interpret_handler: InterpretMessageHandler,
    quick_action_handler: InterpretQuickActionHandler,
    lifecycle: Arc<TaskLifecycle>,
    state: AsyncMutex<State>,
    generation: AtomicU64,
    interpretation: watch::Sender<Option<InterpretationResult>>,
    task_view: Arc<watch::Sender<Option<Task>>>,
    tracker: Mutex<Option<JoinHandle<()>>>,
}

impl CommandOrchestrator {
    pub fn new(interpreter: Arc<dyn InterpreterPort>, lifecycle: Arc<TaskLifecycle>) -> Self {
        let (interpretation, _) = watch::channel(None);
        let (task_view, _) = watch::channel(None);
        Self {
            interpret_handler: InterpretMessageHandler::new(interpreter.clone()),
            quick_action_handler: InterpretQuickActionHandler::new(interpreter),
            lifecycle,
            state: AsyncMutex::new(State::default()),
            generation: AtomicU64::new(0),
            interpretation,
            task_view: Arc::new(task_view),
            tracker: Mutex::new(None),
        }
    }

    /// 当前解析结果
    pub fn interpretation(&self) -> watch::Receiver<Option<InterpretationResult>> {
        self.interpretation.subscribe()
    }

    /// 当前跟踪任务的最新状态
    pub fn task_view(&self) -> watch::Receiver<Option<Task>> {
        self.task_view.subscribe()
    }

    pub fn lifecycle(&self) -> &Arc<TaskLifecycle> {
        &self.lifecycle
    }

    pub async fn current_question(&self) -> Option<ClarificationQuestion> {
        self.state.lock().await.session.current_question()
    }

    pub async fn clarification_state(&self) -> ClarificationState {
        self.state.lock().await.session.state()
    }

    /// 解析自由文本指令
    pub async fn submit_message(&self, message: &str) -> Result<Outcome, ApplicationError> {
        let generation = self.begin().await;
        let result = self
            .interpret_handler
            .handle(InterpretMessage::new(message))
            .await?;
        self.proceed(generation, result).await
    }

    /// 解析快捷操作
    pub async fn submit_quick_action(
        &self,
        action_id: &str,
        params: Option<Params>,
    ) -> Result<Outcome, ApplicationError> {
        let generation = self.begin().await;
        let result = self
            .quick_action_handler
            .handle(InterpretQuickAction::new(action_id, params))
            .await?;
        self.proceed(generation, result).await
    }

    /// 回答当前问题；最后一个问题回答后直接提交
    pub async fn answer(&self, value: &str) -> Result<Outcome, ApplicationError> {
        let mut state = self.state.lock().await;
        state.session.record_answer(value)?;

        // 先构造提交命令再推进游标，失败时会话仍停在当前问题
        let cmd = state
            .current
            .as_ref()
            .ok_or_else(|| ApplicationError::internal("Clarification without interpretation"))
            .and_then(submission)?;

        let answers = match state.session.advance()? {
            Advance::Next(question) => return Ok(Outcome::Question(question)),
            Advance::Complete(answers) => answers,
        };
        let cmd = cmd.with_answers(answers);

        match self.lifecycle.submit(cmd).await {
            Ok(task) => {
                state.session.complete()?;
                self.finish(&mut state, &task);
                Ok(Outcome::Submitted(task))
            }
            Err(e) => {
                // 答案保留，用户可以重新提交
                state.session.submission_failed()?;
                Err(e)
            }
        }
    }

    /// 确认执行信息齐全但未标记自动执行的解析结果
    pub async fn confirm(&self) -> Result<Outcome, ApplicationError> {
        let mut state = self.state.lock().await;
        let result = match (&state.current, state.session.state()) {
            (Some(result), ClarificationState::Closed) if !result.needs_clarification() => {
                result.clone()
            }
            _ => return Err(ApplicationError::invalid_state("Nothing to confirm")),
        };

        let task = self.lifecycle.submit(submission(&result)?).await?;
        self.finish(&mut state, &task);
        Ok(Outcome::Submitted(task))
    }

    /// 取消追问；在途解析结果将被丢弃
    pub async fn cancel(&self) -> bool {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().await;
        let cancelled = state.session.cancel();
        state.current = None;
        self.interpretation.send_replace(None);
        cancelled
    }

    /// 新指令开始：清空会话和解析结果，返回本次代号
    async fn begin(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.state.lock().await;
        *state = State::default();
        self.interpretation.send_replace(None);
        generation
    }

    async fn proceed(
        &self,
        generation: u64,
        result: InterpretationResult,
    ) -> Result<Outcome, ApplicationError> {
        let mut state = self.state.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(intent = %result.intent, "Discarding superseded interpretation");
            return Err(ApplicationError::invalid_state(
                "Interpretation superseded by a newer command",
            ));
        }

        // 无法路由到 agent 的结果不进入追问，会话保持 Closed
        if result.primary_agent().is_none() {
            tracing::debug!(intent = %result.intent, "Interpretation has no suggested agent");
            return Err(ApplicationError::validation("No agent suggested for this request"));
        }

        self.interpretation.send_replace(Some(result.clone()));

        if let Some(question) = state.session.open(&result)? {
            state.current = Some(result);
            return Ok(Outcome::Question(question));
        }

        if !result.can_auto_execute {
            state.current = Some(result.clone());
            return Ok(Outcome::NeedsConfirmation(result));
        }

        let task = self.lifecycle.submit(submission(&result)?).await?;
        self.finish(&mut state, &task);
        Ok(Outcome::Submitted(task))
    }

    /// 提交成功：丢弃解析结果并开始跟踪新任务
    fn finish(&self, state: &mut State, task: &Task) {
        state.current = None;
        self.interpretation.send_replace(None);
        self.track(task);
    }

    fn track(&self, task: &Task) {
        self.task_view.send_replace(Some(task.clone()));

        let mut observation = self.lifecycle.observe(&task.id);
        let sender = self.task_view.clone();
        let handle = tokio::spawn(async move {
            while let Some(value) = observation.next().await {
                sender.send_replace(value);
            }
        });

        let previous = self
            .tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        tracing::debug!(task_id = %task.id, "Tracking task");
    }
}

impl Drop for CommandOrchestrator {
    fn drop(&mut self) {
        if let Some(handle) = self
            .tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

fn submission(result: &InterpretationResult) -> Result<SubmitTask, ApplicationError> {
    let agent = result
        .primary_agent()
        .ok_or_else(|| ApplicationError::validation("No agent suggested for this request"))?;
    Ok(SubmitTask::new(agent, result.extracted_params.clone()))
}
