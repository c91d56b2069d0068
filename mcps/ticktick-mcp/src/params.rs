//! Parameter types for TickTick MCP tools

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Empty parameters for tools that take no arguments
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct EmptyParams {}

// ============================================================================
// Project Parameters
// ============================================================================

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ProjectIdParams {
    #[schemars(description = "ID of the project")]
    pub project_id: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateProjectParams {
    #[schemars(description = "Project name")]
    pub name: String,

    #[schemars(description = "Color code in hex format (default: #F18181)")]
    pub color: Option<String>,

    #[schemars(description = "View mode: one of list, kanban, timeline (default: list)")]
    pub view_mode: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct UpdateProjectParams {
    #[schemars(description = "ID of the project to update")]
    pub project_id: String,

    #[schemars(description = "New project name")]
    pub name: Option<String>,

    #[schemars(description = "New color code in hex format")]
    pub color: Option<String>,

    #[schemars(description = "New view mode: one of list, kanban, timeline")]
    pub view_mode: Option<String>,
}

// ============================================================================
// Task Parameters
// ============================================================================

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TaskRefParams {
    #[schemars(description = "ID of the project")]
    pub project_id: String,

    #[schemars(description = "ID of the task")]
    pub task_id: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateTaskParams {
    #[schemars(description = "Task title")]
    pub title: String,

    #[schemars(description = "ID of the project to add the task to")]
    pub project_id: String,

    #[schemars(description = "Task description/content")]
    pub content: Option<String>,

    #[schemars(description = "Start date in ISO format YYYY-MM-DDThh:mm:ss+0000")]
    pub start_date: Option<String>,

    #[schemars(description = "Due date in ISO format YYYY-MM-DDThh:mm:ss+0000")]
    pub due_date: Option<String>,

    #[schemars(description = "Priority level: 0 (None), 1 (Low), 3 (Medium), 5 (High). Default 0")]
    pub priority: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct UpdateTaskParams {
    #[schemars(description = "ID of the task to update")]
    pub task_id: String,

    #[schemars(description = "ID of the project the task belongs to")]
    pub project_id: String,

    #[schemars(description = "New task title")]
    pub title: Option<String>,

    #[schemars(description = "New task description/content")]
    pub content: Option<String>,

    #[schemars(description = "New start date in ISO format YYYY-MM-DDThh:mm:ss+0000")]
    pub start_date: Option<String>,

    #[schemars(description = "New due date in ISO format YYYY-MM-DDThh:mm:ss+0000")]
    pub due_date: Option<String>,

    #[schemars(description = "New priority level: 0 (None), 1 (Low), 3 (Medium), 5 (High)")]
    pub priority: Option<i64>,
}
