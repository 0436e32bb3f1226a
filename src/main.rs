//! agentdesk - 自然语言指令驱动的后台任务控制台
//!
//! - Domain: interpretation/, clarification/, task/
//! - Application: commands, queries, ports, lifecycle, orchestrator
//! - Infrastructure: adapters (http/fake), memory, worker, events

mod cli;

use clap::Parser;
use std::sync::Arc;

use agentdesk::application::ports::{InterpreterPort, TaskGatewayPort};
use agentdesk::application::{CommandOrchestrator, TaskLifecycle};
use agentdesk::config::{load_config, load_config_from_path, print_config, AppConfig};
use agentdesk::infrastructure::adapters::{
    ApiClient, FakeInterpreter, FakeTaskGateway, HttpInterpreterClient, HttpTaskGateway,
};
use agentdesk::infrastructure::events::{EventPublisher, NotificationCenter};
use agentdesk::infrastructure::memory::InMemoryTaskCache;
use agentdesk::infrastructure::worker::TaskPoller;

use cli::{Cli, Services};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = match cli.config.as_deref() {
        Some(path) => load_config_from_path(Some(path)),
        None => load_config(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);
    print_config(&config);

    let services = build_services(&config, cli.offline)?;

    // Ctrl-C 时停止所有轮询
    let lifecycle = services.lifecycle.clone();
    let result = tokio::select! {
        result = cli.run(&services) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
            Ok(())
        }
    };
    lifecycle.shutdown();
    result
}

fn init_tracing(config: &AppConfig) {
    let log_filter = format!("warn,agentdesk={}", config.log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    // 日志写 stderr，stdout 留给命令输出
    if config.log.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn build_services(config: &AppConfig, offline: bool) -> anyhow::Result<Services> {
    let (interpreter, gateway): (Arc<dyn InterpreterPort>, Arc<dyn TaskGatewayPort>) = if offline {
        tracing::info!("Offline mode: using in-memory interpreter and task service");
        (
            Arc::new(FakeInterpreter::with_defaults()),
            Arc::new(FakeTaskGateway::auto_progress()),
        )
    } else {
        let api = ApiClient::new(config.api.client_config())?;
        (
            Arc::new(HttpInterpreterClient::from_api(api.clone())),
            Arc::new(HttpTaskGateway::from_api(api)),
        )
    };

    let cache = InMemoryTaskCache::new().arc();
    let events = EventPublisher::new().arc();
    let notifier = NotificationCenter::new().arc();
    let poller = Arc::new(TaskPoller::new(
        config.polling.cadence(),
        gateway.clone(),
        cache.clone(),
        events.clone(),
    ));

    let lifecycle = Arc::new(
        TaskLifecycle::new(gateway, cache, poller, events.clone(), notifier)
            .with_page_size(config.polling.page_size),
    );
    let orchestrator = Arc::new(CommandOrchestrator::new(
        interpreter.clone(),
        lifecycle.clone(),
    ));

    Ok(Services {
        interpreter,
        lifecycle,
        orchestrator,
        events,
    })
}
