use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast::error::RecvError;

use agentdesk::application::ports::InterpreterPort;
use agentdesk::application::queries::handlers::ListQuickActionsHandler;
use agentdesk::application::queries::ListQuickActions;
use agentdesk::application::{
    ApplicationError, CommandOrchestrator, LifecycleEvent, Outcome, TaskLifecycle,
};
use agentdesk::domain::{Params, Task, TaskFilters, TaskId, TaskPage, TaskStatus};
use agentdesk::infrastructure::events::EventPublisher;

/// 运行期组件
pub struct Services {
    pub interpreter: Arc<dyn InterpreterPort>,
    pub lifecycle: Arc<TaskLifecycle>,
    pub orchestrator: Arc<CommandOrchestrator>,
    pub events: Arc<EventPublisher>,
}

#[derive(Debug, Parser)]
#[command(name = "agentdesk", about = "Turn plain-language requests into tracked background tasks")]
pub struct Cli {
    /// 配置文件路径（默认搜索 agentdesk.toml / agentdesk.local.toml）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// 使用内存中的解析器和任务服务
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interpret a request, answer follow-up questions, then follow the task
    Run(RunArgs),
    /// Run a predefined quick action
    Quick(QuickArgs),
    /// List available quick actions
    Actions,
    /// List tasks
    List(ListArgs),
    /// Follow a task until it finishes
    Watch(TaskArgs),
    /// Retry a failed task
    Retry(TaskArgs),
    /// Delete a task
    Delete(TaskArgs),
    /// Show aggregate task statistics
    Stats,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[arg(value_name = "MESSAGE", required = true)]
    message: Vec<String>,
    /// Submit without waiting for the task to finish
    #[arg(long)]
    detach: bool,
}

#[derive(Debug, Args)]
struct QuickArgs {
    action_id: String,
    /// key=value, value parsed as JSON when possible
    #[arg(short = 'p', long = "param")]
    params: Vec<String>,
    #[arg(long)]
    detach: bool,
}

#[derive(Debug, Args)]
struct ListArgs {
    #[arg(long)]
    department: Option<String>,
    #[arg(long)]
    status: Option<TaskStatus>,
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long)]
    page_size: Option<u32>,
    /// Keep the list refreshed until interrupted
    #[arg(long)]
    watch: bool,
}

#[derive(Debug, Args)]
struct TaskArgs {
    id: String,
}

impl Cli {
    pub async fn run(self, services: &Services) -> anyhow::Result<()> {
        match self.command {
            Command::Run(args) => {
                let message = args.message.join(" ");
                let outcome = services.orchestrator.submit_message(&message).await;
                converse(services, outcome, args.detach).await
            }
            Command::Quick(args) => {
                let params = parse_params(&args.params)?;
                let params = (!params.is_empty()).then_some(params);
                let outcome = services
                    .orchestrator
                    .submit_quick_action(&args.action_id, params)
                    .await;
                converse(services, outcome, args.detach).await
            }
            Command::Actions => {
                let handler = ListQuickActionsHandler::new(services.interpreter.clone());
                for action in handler.handle(ListQuickActions).await? {
                    println!(
                        "{:<24} {}{}",
                        action.id,
                        action.label,
                        action
                            .description
                            .map(|d| format!(" - {}", d))
                            .unwrap_or_default()
                    );
                }
                Ok(())
            }
            Command::List(args) => list(services, args).await,
            Command::Watch(args) => {
                let id = TaskId::from(args.id);
                let task = services.lifecycle.get(&id).await?;
                print_task(&task);
                if !task.is_terminal() {
                    follow(services, &id).await?;
                }
                Ok(())
            }
            Command::Retry(args) => {
                let id = TaskId::from(args.id);
                let task = services.lifecycle.retry(&id).await?;
                print_task(&task);
                Ok(())
            }
            Command::Delete(args) => {
                let id = TaskId::from(args.id);
                services.lifecycle.delete(&id).await?;
                println!("Deleted {}", id);
                Ok(())
            }
            Command::Stats => {
                let stats = services.lifecycle.stats().await?;
                println!(
                    "total {}  pending {}  processing {}  completed {}  failed {}",
                    stats.total, stats.pending, stats.processing, stats.completed, stats.failed
                );
                Ok(())
            }
        }
    }
}

/// 追问循环：逐个提问直到任务提交
async fn converse(
    services: &Services,
    mut outcome: Result<Outcome, ApplicationError>,
    detach: bool,
) -> anyhow::Result<()> {
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match outcome {
            Ok(Outcome::Submitted(task)) => {
                println!("Task {} created ({})", task.id, task.agent);
                if detach {
                    return Ok(());
                }
                return follow(services, &task.id).await;
            }
            Ok(Outcome::Question(question)) => {
                println!("[{}/{}] {}", question.index + 1, question.total, question.text);
                let Some(answer) = prompt(&mut stdin).await? else {
                    services.orchestrator.cancel().await;
                    bail!("Cancelled");
                };
                outcome = services.orchestrator.answer(&answer).await;
            }
            Ok(Outcome::NeedsConfirmation(result)) => {
                println!(
                    "Intent: {} (agent: {}, confidence {:.0}%)",
                    result.intent,
                    result.primary_agent().unwrap_or("none"),
                    result.confidence * 100.0
                );
                println!("Proceed? [y/N]");
                let answer = prompt(&mut stdin).await?.unwrap_or_default();
                if !answer.trim().eq_ignore_ascii_case("y") {
                    services.orchestrator.cancel().await;
                    println!("Not submitted");
                    return Ok(());
                }
                outcome = services.orchestrator.confirm().await;
            }
            Err(e) => {
                // 空答案或提交失败时会话仍停在当前问题，答案保留
                if let Some(question) = services.orchestrator.current_question().await {
                    println!("{}", e.user_message());
                    outcome = Ok(Outcome::Question(question));
                    continue;
                }
                return Err(anyhow::anyhow!(e.user_message()));
            }
        }
    }
}

async fn prompt(stdin: &mut Lines<BufReader<Stdin>>) -> anyhow::Result<Option<String>> {
    // None 表示 EOF
    stdin.next_line().await.context("Failed to read stdin")
}

/// 跟踪单个任务直到终态
async fn follow(services: &Services, id: &TaskId) -> anyhow::Result<()> {
    let mut events = services.events.subscribe();
    let mut observation = services.lifecycle.observe(id);
    let mut last = observation.current().map(|t| t.status);
    let mut events_open = true;

    loop {
        tokio::select! {
            value = observation.next() => {
                let Some(value) = value else { return Ok(()) };
                let Some(task) = value else {
                    println!("Task {} no longer exists", id);
                    return Ok(());
                };
                if last != Some(task.status) {
                    last = Some(task.status);
                    print_task(&task);
                }
                if task.is_terminal() {
                    return Ok(());
                }
            }
            event = events.recv(), if events_open => match event {
                Ok(LifecycleEvent::PollFailed { error, .. }) => {
                    eprintln!("(refresh failed: {}, retrying)", error);
                }
                Err(RecvError::Closed) => events_open = false,
                _ => {}
            }
        }
    }
}

async fn list(services: &Services, args: ListArgs) -> anyhow::Result<()> {
    let mut filters = match args.page_size {
        Some(size) => TaskFilters::new(size),
        None => TaskFilters::new(services.lifecycle.page_size()),
    };
    filters = filters
        .with_department(args.department)
        .with_status(args.status)
        .with_page(args.page);

    if !args.watch {
        let page = services.lifecycle.list(&filters).await?;
        print_page(&page);
        return Ok(());
    }

    let mut observation = services.lifecycle.observe_list(&filters);
    while let Some(page) = observation.next().await {
        if let Some(page) = page {
            print_page(&page);
        }
    }
    Ok(())
}

fn print_task(task: &Task) {
    println!(
        "{}  {:<10} {:<12} {}",
        task.id,
        task.status,
        task.agent,
        task.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    match task.status {
        TaskStatus::Completed => {
            if let Some(output) = &task.output {
                println!("{}", serde_json::Value::Object(output.clone()));
            }
        }
        TaskStatus::Failed => {
            println!(
                "Failed: {} (retry with `agentdesk retry {}`)",
                task.failure_reason().unwrap_or("unknown error"),
                task.id
            );
        }
        _ => {}
    }
}

fn print_page(page: &TaskPage) {
    println!(
        "Page {} ({} per page), {} task(s) total",
        page.page, page.per_page, page.total
    );
    for task in &page.tasks {
        println!(
            "{}  {:<10} {:<12} {}",
            task.id, task.status, task.agent, task.department
        );
    }
}

fn parse_params(raw: &[String]) -> anyhow::Result<Params> {
    let mut params = Params::new();
    for pair in raw {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Invalid parameter '{}', expected key=value", pair);
        };
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        params.insert(key.trim().to_string(), value);
    }
    Ok(params)
}
