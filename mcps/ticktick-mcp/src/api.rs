//! Typed TickTick open API calls
//!
//! Thin layer over [`AuthenticatedClient`]: builds request paths and bodies,
//! and decodes responses into the models below. Token refresh is handled by
//! the client.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use ticktick_auth::{AuthError, AuthenticatedClient};

/// Errors from TickTick API calls
#[derive(Error, Debug)]
pub enum ApiError {
    /// Authentication, transport or upstream status failure
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Upstream answered 2xx with an unexpected body shape
    #[error("unexpected response from TickTick: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// A TickTick project (list)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub view_mode: Option<String>,
    #[serde(default)]
    pub closed: Option<bool>,
    #[serde(default)]
    pub kind: Option<String>,
}

/// A checklist entry inside a task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// 1 when checked
    #[serde(default)]
    pub status: Option<i64>,
}

/// A TickTick task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub priority: Option<i64>,
    /// 2 when completed
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub items: Vec<ChecklistItem>,
}

/// Project together with its tasks (`/project/{id}/data`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProjectData {
    #[serde(default)]
    pub project: Option<Project>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// Body for `POST /task`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    pub priority: i64,
    pub is_all_day: bool,
}

/// Body for `POST /task/{id}`; unset fields are left unchanged upstream
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub id: String,
    pub project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

/// Body for `POST /project`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    pub color: String,
    pub view_mode: String,
    pub kind: String,
}

/// Body for `POST /project/{id}`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// TickTick REST API
pub struct TickTickApi {
    client: AuthenticatedClient,
}

impl TickTickApi {
    pub fn new(client: AuthenticatedClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &AuthenticatedClient {
        &self.client
    }

    // ------------------------------------------------------------------------
    // Projects
    // ------------------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn get_projects(&self) -> ApiResult<Vec<Project>> {
        decode(self.client.get("/project").await?)
    }

    #[instrument(skip(self))]
    pub async fn get_project(&self, project_id: &str) -> ApiResult<Project> {
        decode(self.client.get(&format!("/project/{}", project_id)).await?)
    }

    #[instrument(skip(self))]
    pub async fn get_project_data(&self, project_id: &str) -> ApiResult<ProjectData> {
        decode(self.client.get(&format!("/project/{}/data", project_id)).await?)
    }

    #[instrument(skip(self, project), fields(name = %project.name))]
    pub async fn create_project(&self, project: &NewProject) -> ApiResult<Project> {
        let body = serde_json::to_value(project)?;
        decode(self.client.post("/project", Some(&body)).await?)
    }

    #[instrument(skip(self, update))]
    pub async fn update_project(&self, project_id: &str, update: &ProjectUpdate) -> ApiResult<Project> {
        let body = serde_json::to_value(update)?;
        decode(
            self.client
                .post(&format!("/project/{}", project_id), Some(&body))
                .await?,
        )
    }

    #[instrument(skip(self))]
    pub async fn delete_project(&self, project_id: &str) -> ApiResult<()> {
        self.client.delete(&format!("/project/{}", project_id)).await?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn get_task(&self, project_id: &str, task_id: &str) -> ApiResult<Task> {
        decode(
            self.client
                .get(&format!("/project/{}/task/{}", project_id, task_id))
                .await?,
        )
    }

    #[instrument(skip(self, task), fields(project_id = %task.project_id))]
    pub async fn create_task(&self, task: &NewTask) -> ApiResult<Task> {
        let body = serde_json::to_value(task)?;
        decode(self.client.post("/task", Some(&body)).await?)
    }

    #[instrument(skip(self, update), fields(task_id = %update.id))]
    pub async fn update_task(&self, update: &TaskUpdate) -> ApiResult<Task> {
        let body = serde_json::to_value(update)?;
        decode(
            self.client
                .post(&format!("/task/{}", update.id), Some(&body))
                .await?,
        )
    }

    #[instrument(skip(self))]
    pub async fn complete_task(&self, project_id: &str, task_id: &str) -> ApiResult<()> {
        self.client
            .post(
                &format!("/project/{}/task/{}/complete", project_id, task_id),
                None,
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_task(&self, project_id: &str, task_id: &str) -> ApiResult<()> {
        self.client
            .delete(&format!("/project/{}/task/{}", project_id, task_id))
            .await?;
        Ok(())
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> ApiResult<T> {
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use ticktick_auth::{Credentials, TokenExchanger};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_for(server: &MockServer) -> TickTickApi {
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        let creds = Credentials {
            client_id: Some("abc".to_string()),
            client_secret: Some("xyz".to_string()),
            access_token: Some("AT1".to_string()),
            refresh_token: Some("RT1".to_string()),
        };
        let exchanger =
            TokenExchanger::new(http.clone(), format!("{}/oauth/token", server.uri()), &creds);
        let client =
            AuthenticatedClient::new(http, format!("{}/open/v1", server.uri()), &creds, exchanger, None)
                .unwrap();
        TickTickApi::new(client)
    }

    #[tokio::test]
    async fn test_get_projects_decodes_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/open/v1/project"))
            .and(header("Authorization", "Bearer AT1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "p1", "name": "Inbox", "color": "#F18181", "viewMode": "list", "closed": false, "kind": "TASK"},
                {"id": "p2", "name": "Work"}
            ])))
            .mount(&server)
            .await;

        let projects = api_for(&server).get_projects().await.unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].view_mode.as_deref(), Some("list"));
        assert_eq!(projects[0].closed, Some(false));
        assert_eq!(projects[1].color, None);
    }

    #[tokio::test]
    async fn test_get_project_data_decodes_tasks() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/open/v1/project/p1/data"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "project": {"id": "p1", "name": "Inbox"},
                "tasks": [{"id": "t1", "projectId": "p1", "title": "Milk", "items": [{"title": "2%", "status": 1}]}],
                "columns": []
            })))
            .mount(&server)
            .await;

        let data = api_for(&server).get_project_data("p1").await.unwrap();
        assert_eq!(data.project.unwrap().name.as_deref(), Some("Inbox"));
        assert_eq!(data.tasks[0].items[0].status, Some(1));
    }

    #[tokio::test]
    async fn test_create_task_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/open/v1/task"))
            .and(body_json(json!({
                "title": "Milk",
                "projectId": "p1",
                "dueDate": "2024-01-15T09:00:00+0000",
                "priority": 3,
                "isAllDay": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "t1", "projectId": "p1", "title": "Milk", "priority": 3
            })))
            .expect(1)
            .mount(&server)
            .await;

        let task = api_for(&server)
            .create_task(&NewTask {
                title: "Milk".to_string(),
                project_id: "p1".to_string(),
                content: None,
                start_date: None,
                due_date: Some("2024-01-15T09:00:00+0000".to_string()),
                priority: 3,
                is_all_day: false,
            })
            .await
            .unwrap();
        assert_eq!(task.id.as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn test_update_task_sends_only_set_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/open/v1/task/t1"))
            .and(body_json(json!({"id": "t1", "projectId": "p1", "title": "Oat milk"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "t1", "title": "Oat milk"})))
            .expect(1)
            .mount(&server)
            .await;

        let update = TaskUpdate {
            id: "t1".to_string(),
            project_id: "p1".to_string(),
            title: Some("Oat milk".to_string()),
            ..Default::default()
        };
        let task = api_for(&server).update_task(&update).await.unwrap();
        assert_eq!(task.title.as_deref(), Some("Oat milk"));
    }

    #[tokio::test]
    async fn test_complete_and_delete_accept_empty_bodies() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/open/v1/project/p1/task/t1/complete"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/open/v1/project/p1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);
        api.complete_task("p1", "t1").await.unwrap();
        api.delete_project("p1").await.unwrap();
    }

    #[tokio::test]
    async fn test_unexpected_shape_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/open/v1/project"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"not": "a list"})))
            .mount(&server)
            .await;

        let result = api_for(&server).get_projects().await;
        assert!(matches!(result, Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/open/v1/project/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let result = api_for(&server).get_project("missing").await;
        match result {
            Err(ApiError::Auth(e)) => assert_eq!(e.status(), Some(404)),
            other => panic!("expected upstream error, got {:?}", other),
        }
    }
}
