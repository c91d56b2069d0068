//! Handler implementations for TickTick MCP tools
//!
//! Each handler validates its parameters, calls the API and renders the
//! result as text. Invalid input is rejected with an invalid-params error;
//! upstream failures become error tool results so the session keeps going.

use chrono::DateTime;
use rmcp::{
    model::{CallToolResult, Content},
    ErrorData as McpError,
};
use tracing::error;

use crate::api::{ApiError, NewProject, NewTask, ProjectUpdate, TaskUpdate, TickTickApi};
use crate::format::{format_project, format_project_list, format_task, format_task_list};
use crate::params::*;

/// Priorities TickTick accepts
pub const VALID_PRIORITIES: [i64; 4] = [0, 1, 3, 5];
/// View modes TickTick accepts
pub const VALID_VIEW_MODES: [&str; 3] = ["list", "kanban", "timeline"];
/// Color used for new projects when none is given
pub const DEFAULT_PROJECT_COLOR: &str = "#F18181";
/// View mode used for new projects when none is given
pub const DEFAULT_VIEW_MODE: &str = "list";
/// Kind sent for new projects
const DEFAULT_PROJECT_KIND: &str = "TASK";

// ============================================================================
// Result Helpers
// ============================================================================

pub fn text_success(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

pub fn invalid_params(message: impl Into<String>) -> McpError {
    McpError::invalid_params(message.into(), None)
}

/// Error tool result for a failed upstream call
fn upstream_error(action: &str, e: ApiError) -> CallToolResult {
    error!("Error {}: {}", action, e);
    CallToolResult::error(vec![Content::text(format!("Error {}: {}", action, e))])
}

// ============================================================================
// Validation
// ============================================================================

pub fn validate_priority(priority: i64) -> Result<i64, McpError> {
    if VALID_PRIORITIES.contains(&priority) {
        Ok(priority)
    } else {
        Err(invalid_params(
            "Invalid priority. Must be 0 (None), 1 (Low), 3 (Medium), or 5 (High).",
        ))
    }
}

/// Accepts `YYYY-MM-DDThh:mm:ss+0000`, `+00:00` offsets and `Z`
pub fn validate_date(field: &str, value: &str) -> Result<(), McpError> {
    let valid = DateTime::parse_from_rfc3339(value).is_ok()
        || DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z").is_ok()
        || DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z").is_ok();

    if valid {
        Ok(())
    } else {
        Err(invalid_params(format!(
            "Invalid {} format. Use ISO format: YYYY-MM-DDThh:mm:ss+0000",
            field
        )))
    }
}

pub fn validate_view_mode(view_mode: &str) -> Result<(), McpError> {
    if VALID_VIEW_MODES.contains(&view_mode) {
        Ok(())
    } else {
        Err(invalid_params(
            "Invalid view_mode. Must be one of: list, kanban, timeline.",
        ))
    }
}

fn require(field: &str, value: &str) -> Result<(), McpError> {
    if value.trim().is_empty() {
        Err(invalid_params(format!("{} cannot be empty", field)))
    } else {
        Ok(())
    }
}

/// Empty strings count as "not provided"
fn provided(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn validated_date(field: &str, value: Option<String>) -> Result<Option<String>, McpError> {
    let value = provided(value);
    if let Some(date) = &value {
        validate_date(field, date)?;
    }
    Ok(value)
}

// ============================================================================
// Project Handlers
// ============================================================================

pub async fn get_projects(api: &TickTickApi) -> Result<CallToolResult, McpError> {
    match api.get_projects().await {
        Ok(projects) => Ok(text_success(format_project_list(&projects))),
        Err(e) => Ok(upstream_error("fetching projects", e)),
    }
}

pub async fn get_project(
    api: &TickTickApi,
    params: ProjectIdParams,
) -> Result<CallToolResult, McpError> {
    require("project_id", &params.project_id)?;

    match api.get_project(&params.project_id).await {
        Ok(project) => Ok(text_success(format_project(&project))),
        Err(e) => Ok(upstream_error("fetching project", e)),
    }
}

pub async fn get_project_tasks(
    api: &TickTickApi,
    params: ProjectIdParams,
) -> Result<CallToolResult, McpError> {
    require("project_id", &params.project_id)?;

    let data = match api.get_project_data(&params.project_id).await {
        Ok(data) => data,
        Err(e) => return Ok(upstream_error("fetching project data", e)),
    };

    let name = data
        .project
        .as_ref()
        .and_then(|p| p.name.clone())
        .unwrap_or_else(|| params.project_id.clone());

    Ok(text_success(format_task_list(&name, &data.tasks)))
}

pub async fn create_project(
    api: &TickTickApi,
    params: CreateProjectParams,
) -> Result<CallToolResult, McpError> {
    require("name", &params.name)?;

    let view_mode = provided(params.view_mode).unwrap_or_else(|| DEFAULT_VIEW_MODE.to_string());
    validate_view_mode(&view_mode)?;

    let project = NewProject {
        name: params.name,
        color: provided(params.color).unwrap_or_else(|| DEFAULT_PROJECT_COLOR.to_string()),
        view_mode,
        kind: DEFAULT_PROJECT_KIND.to_string(),
    };

    match api.create_project(&project).await {
        Ok(created) => Ok(text_success(format!(
            "Project created successfully:\n\n{}",
            format_project(&created)
        ))),
        Err(e) => Ok(upstream_error("creating project", e)),
    }
}

pub async fn update_project(
    api: &TickTickApi,
    params: UpdateProjectParams,
) -> Result<CallToolResult, McpError> {
    require("project_id", &params.project_id)?;

    let update = ProjectUpdate {
        name: provided(params.name),
        color: provided(params.color),
        view_mode: provided(params.view_mode),
        kind: None,
    };
    if let Some(view_mode) = &update.view_mode {
        validate_view_mode(view_mode)?;
    }
    if update.name.is_none() && update.color.is_none() && update.view_mode.is_none() {
        return Err(invalid_params(
            "Nothing to update. Provide at least one of: name, color, view_mode.",
        ));
    }

    match api.update_project(&params.project_id, &update).await {
        Ok(project) => Ok(text_success(format!(
            "Project updated successfully:\n\n{}",
            format_project(&project)
        ))),
        Err(e) => Ok(upstream_error("updating project", e)),
    }
}

pub async fn delete_project(
    api: &TickTickApi,
    params: ProjectIdParams,
) -> Result<CallToolResult, McpError> {
    require("project_id", &params.project_id)?;

    match api.delete_project(&params.project_id).await {
        Ok(()) => Ok(text_success(format!(
            "Project {} deleted successfully.",
            params.project_id
        ))),
        Err(e) => Ok(upstream_error("deleting project", e)),
    }
}

// ============================================================================
// Task Handlers
// ============================================================================

pub async fn get_task(api: &TickTickApi, params: TaskRefParams) -> Result<CallToolResult, McpError> {
    require("project_id", &params.project_id)?;
    require("task_id", &params.task_id)?;

    match api.get_task(&params.project_id, &params.task_id).await {
        Ok(task) => Ok(text_success(format_task(&task))),
        Err(e) => Ok(upstream_error("fetching task", e)),
    }
}

pub async fn create_task(
    api: &TickTickApi,
    params: CreateTaskParams,
) -> Result<CallToolResult, McpError> {
    require("title", &params.title)?;
    require("project_id", &params.project_id)?;
    let priority = validate_priority(params.priority.unwrap_or(0))?;

    let task = NewTask {
        title: params.title,
        project_id: params.project_id,
        content: provided(params.content),
        start_date: validated_date("start_date", params.start_date)?,
        due_date: validated_date("due_date", params.due_date)?,
        priority,
        is_all_day: false,
    };

    match api.create_task(&task).await {
        Ok(created) => Ok(text_success(format!(
            "Task created successfully:\n\n{}",
            format_task(&created)
        ))),
        Err(e) => Ok(upstream_error("creating task", e)),
    }
}

pub async fn update_task(
    api: &TickTickApi,
    params: UpdateTaskParams,
) -> Result<CallToolResult, McpError> {
    require("task_id", &params.task_id)?;
    require("project_id", &params.project_id)?;
    let priority = params.priority.map(validate_priority).transpose()?;

    let update = TaskUpdate {
        id: params.task_id,
        project_id: params.project_id,
        title: provided(params.title),
        content: provided(params.content),
        priority,
        start_date: validated_date("start_date", params.start_date)?,
        due_date: validated_date("due_date", params.due_date)?,
    };

    match api.update_task(&update).await {
        Ok(task) => Ok(text_success(format!(
            "Task updated successfully:\n\n{}",
            format_task(&task)
        ))),
        Err(e) => Ok(upstream_error("updating task", e)),
    }
}

pub async fn complete_task(
    api: &TickTickApi,
    params: TaskRefParams,
) -> Result<CallToolResult, McpError> {
    require("project_id", &params.project_id)?;
    require("task_id", &params.task_id)?;

    match api.complete_task(&params.project_id, &params.task_id).await {
        Ok(()) => Ok(text_success(format!(
            "Task {} marked as complete.",
            params.task_id
        ))),
        Err(e) => Ok(upstream_error("completing task", e)),
    }
}

pub async fn delete_task(
    api: &TickTickApi,
    params: TaskRefParams,
) -> Result<CallToolResult, McpError> {
    require("project_id", &params.project_id)?;
    require("task_id", &params.task_id)?;

    match api.delete_task(&params.project_id, &params.task_id).await {
        Ok(()) => Ok(text_success(format!(
            "Task {} deleted successfully.",
            params.task_id
        ))),
        Err(e) => Ok(upstream_error("deleting task", e)),
    }
}
