//! MCP Server implementation
//!
//! This module defines the main MCP server that exposes TickTick projects
//! and tasks as tools. Handler implementations are in the handlers module.

use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError,
};

use crate::api::TickTickApi;
use crate::handlers;
use crate::params::*;

/// The main TickTick MCP Server
#[derive(Clone)]
pub struct TickTickMcpServer {
    api: Arc<TickTickApi>,
    tool_router: ToolRouter<Self>,
}

// ============================================================================
// Project Tools
// ============================================================================

#[tool_router(router = project_tool_router)]
impl TickTickMcpServer {
    #[tool(description = "Get all projects from TickTick")]
    async fn get_projects(
        &self,
        Parameters(_): Parameters<EmptyParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::get_projects(&self.api).await
    }

    #[tool(description = "Get details about a specific project")]
    async fn get_project(
        &self,
        Parameters(params): Parameters<ProjectIdParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::get_project(&self.api, params).await
    }

    #[tool(description = "Get all tasks in a specific project")]
    async fn get_project_tasks(
        &self,
        Parameters(params): Parameters<ProjectIdParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::get_project_tasks(&self.api, params).await
    }

    #[tool(description = "Create a new project in TickTick")]
    async fn create_project(
        &self,
        Parameters(params): Parameters<CreateProjectParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::create_project(&self.api, params).await
    }

    #[tool(description = "Update the name, color or view mode of an existing project")]
    async fn update_project(
        &self,
        Parameters(params): Parameters<UpdateProjectParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::update_project(&self.api, params).await
    }

    #[tool(description = "Delete a project")]
    async fn delete_project(
        &self,
        Parameters(params): Parameters<ProjectIdParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::delete_project(&self.api, params).await
    }
}

// ============================================================================
// Task Tools
// ============================================================================

#[tool_router(router = task_tool_router)]
impl TickTickMcpServer {
    #[tool(description = "Get details about a specific task")]
    async fn get_task(
        &self,
        Parameters(params): Parameters<TaskRefParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::get_task(&self.api, params).await
    }

    #[tool(description = "Create a new task in TickTick")]
    async fn create_task(
        &self,
        Parameters(params): Parameters<CreateTaskParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::create_task(&self.api, params).await
    }

    #[tool(description = "Update an existing task in TickTick")]
    async fn update_task(
        &self,
        Parameters(params): Parameters<UpdateTaskParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::update_task(&self.api, params).await
    }

    #[tool(description = "Mark a task as complete")]
    async fn complete_task(
        &self,
        Parameters(params): Parameters<TaskRefParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::complete_task(&self.api, params).await
    }

    #[tool(description = "Delete a task")]
    async fn delete_task(
        &self,
        Parameters(params): Parameters<TaskRefParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::delete_task(&self.api, params).await
    }
}

// ============================================================================
// Router Composition & Server Initialization
// ============================================================================

impl TickTickMcpServer {
    pub fn new(api: TickTickApi) -> Self {
        Self {
            api: Arc::new(api),
            tool_router: Self::project_tool_router() + Self::task_tool_router(),
        }
    }

    pub fn api(&self) -> &TickTickApi {
        &self.api
    }
}

// ============================================================================
// Server Handler Implementation
// ============================================================================

#[tool_handler]
impl rmcp::ServerHandler for TickTickMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "TickTick MCP Server - provides tools for listing, creating, updating, \
                 completing and deleting TickTick projects and tasks. Dates use ISO \
                 format YYYY-MM-DDThh:mm:ss+0000; priorities are 0 (None), 1 (Low), \
                 3 (Medium) or 5 (High)."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::ServerHandler;
    use ticktick_auth::{AuthenticatedClient, Credentials, TokenExchanger};

    fn server() -> TickTickMcpServer {
        let http = reqwest::Client::new();
        let creds = Credentials {
            access_token: Some("AT1".to_string()),
            ..Default::default()
        };
        let exchanger = TokenExchanger::new(http.clone(), "http://127.0.0.1:1/oauth/token", &creds);
        let client =
            AuthenticatedClient::new(http, "http://127.0.0.1:1/open/v1", &creds, exchanger, None)
                .unwrap();
        TickTickMcpServer::new(TickTickApi::new(client))
    }

    #[test]
    fn test_all_tools_registered() {
        let tools = server().tool_router.list_all();
        let mut names: Vec<&str> = tools.iter().map(|t| t.name.as_ref()).collect();
        names.sort();

        assert_eq!(
            names,
            vec![
                "complete_task",
                "create_project",
                "create_task",
                "delete_project",
                "delete_task",
                "get_project",
                "get_project_tasks",
                "get_projects",
                "get_task",
                "update_project",
                "update_task",
            ]
        );
    }

    #[test]
    fn test_server_info_enables_tools() {
        let info = server().get_info();
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.unwrap().contains("TickTick"));
    }
}
