//! HTTP Task Gateway - 调用远端任务服务
//!
//! 外部 API:
//! POST   {base}/api/tasks               {"agent": "...", "input": {...}}
//! GET    {base}/api/tasks?page=&perPage=&department=&status=
//! GET    {base}/api/tasks/{id}
//! POST   {base}/api/tasks/{id}/retry
//! DELETE {base}/api/tasks/{id}
//! GET    {base}/api/tasks/stats

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;

use super::ApiClient;
use crate::application::ports::{RemoteError, TaskGatewayPort};
use crate::domain::{Params, Task, TaskFilters, TaskId, TaskPage, TaskStats};

#[derive(Debug, Serialize)]
struct CreateTaskRequest<'a> {
    agent: &'a str,
    input: Params,
}

/// 列表查询参数
fn list_query(filters: &TaskFilters) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("page", filters.page.to_string()),
        ("perPage", filters.page_size.to_string()),
    ];
    if let Some(department) = &filters.department {
        query.push(("department", department.clone()));
    }
    if let Some(status) = &filters.status {
        query.push(("status", status.as_str().to_string()));
    }
    query
}

/// HTTP 任务网关
pub struct HttpTaskGateway {
    api: ApiClient,
}

impl HttpTaskGateway {
    pub fn from_api(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl TaskGatewayPort for HttpTaskGateway {
    async fn create_task(&self, agent_kind: &str, input: Params) -> Result<Task, RemoteError> {
        let url = self.api.url(&["api", "tasks"])?;
        tracing::debug!(url = %url, agent = %agent_kind, "Sending create task request");

        let builder = self.api.request(Method::POST, url).json(&CreateTaskRequest {
            agent: agent_kind,
            input,
        });
        self.api.send_json(builder).await
    }

    async fn list_tasks(&self, filters: &TaskFilters) -> Result<TaskPage, RemoteError> {
        let url = self.api.url(&["api", "tasks"])?;
        let builder = self
            .api
            .request(Method::GET, url)
            .query(&list_query(filters));
        self.api.send_json(builder).await
    }

    async fn get_task(&self, id: &TaskId) -> Result<Task, RemoteError> {
        let url = self.api.url(&["api", "tasks", id.as_str()])?;
        let builder = self.api.request(Method::GET, url);
        self.api.send_json(builder).await
    }

    async fn retry_task(&self, id: &TaskId) -> Result<Task, RemoteError> {
        let url = self.api.url(&["api", "tasks", id.as_str(), "retry"])?;
        tracing::debug!(url = %url, task_id = %id, "Sending retry request");
        let builder = self.api.request(Method::POST, url);
        self.api.send_json(builder).await
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), RemoteError> {
        let url = self.api.url(&["api", "tasks", id.as_str()])?;
        tracing::debug!(url = %url, task_id = %id, "Sending delete request");
        let builder = self.api.request(Method::DELETE, url);
        self.api.send_empty(builder).await
    }

    async fn task_stats(&self) -> Result<TaskStats, RemoteError> {
        let url = self.api.url(&["api", "tasks", "stats"])?;
        let builder = self.api.request(Method::GET, url);
        self.api.send_json(builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskStatus;

    #[test]
    fn test_list_query_minimal() {
        let query = list_query(&TaskFilters::new(25).with_page(3));
        assert_eq!(
            query,
            vec![("page", "3".to_string()), ("perPage", "25".to_string())]
        );
    }

    #[test]
    fn test_list_query_with_filters() {
        let filters = TaskFilters::new(10)
            .with_department(Some("finance".to_string()))
            .with_status(Some(TaskStatus::Failed));
        let query = list_query(&filters);
        assert!(query.contains(&("department", "finance".to_string())));
        assert!(query.contains(&("status", "failed".to_string())));
        assert!(query.contains(&("page", "1".to_string())));
    }
}
