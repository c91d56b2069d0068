//! Human-readable rendering of projects and tasks for tool output

use std::fmt::Write;

use crate::api::{Project, Task};

/// Display name for a TickTick priority value
pub fn priority_label(priority: i64) -> String {
    match priority {
        0 => "None".to_string(),
        1 => "Low".to_string(),
        3 => "Medium".to_string(),
        5 => "High".to_string(),
        other => other.to_string(),
    }
}

pub fn format_task(task: &Task) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Title: {}", task.title.as_deref().unwrap_or("No title"));
    let _ = writeln!(out, "Project ID: {}", task.project_id.as_deref().unwrap_or("None"));

    if let Some(start) = task.start_date.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(out, "Start Date: {}", start);
    }
    if let Some(due) = task.due_date.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(out, "Due Date: {}", due);
    }

    let _ = writeln!(out, "Priority: {}", priority_label(task.priority.unwrap_or(0)));

    let status = if task.status == Some(2) { "Completed" } else { "Active" };
    let _ = writeln!(out, "Status: {}", status);

    if let Some(content) = task.content.as_deref().filter(|s| !s.is_empty()) {
        let _ = write!(out, "\nContent:\n{}\n", content);
    }

    if !task.items.is_empty() {
        let _ = write!(out, "\nSubtasks ({}):\n", task.items.len());
        for (i, item) in task.items.iter().enumerate() {
            let mark = if item.status == Some(1) { "✓" } else { "□" };
            let _ = writeln!(
                out,
                "{}. [{}] {}",
                i + 1,
                mark,
                item.title.as_deref().unwrap_or("No title")
            );
        }
    }

    out
}

pub fn format_project(project: &Project) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Name: {}", project.name.as_deref().unwrap_or("No name"));
    let _ = writeln!(out, "ID: {}", project.id.as_deref().unwrap_or("No ID"));

    if let Some(color) = project.color.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(out, "Color: {}", color);
    }
    if let Some(view_mode) = project.view_mode.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(out, "View Mode: {}", view_mode);
    }
    if let Some(closed) = project.closed {
        let _ = writeln!(out, "Closed: {}", if closed { "Yes" } else { "No" });
    }
    if let Some(kind) = project.kind.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(out, "Kind: {}", kind);
    }

    out
}

pub fn format_project_list(projects: &[Project]) -> String {
    if projects.is_empty() {
        return "No projects found.".to_string();
    }

    let mut out = format!("Found {} projects:\n\n", projects.len());
    for (i, project) in projects.iter().enumerate() {
        let _ = write!(out, "Project {}:\n{}\n", i + 1, format_project(project));
    }
    out
}

/// Tasks of one project; `project_name` falls back to the id upstream
pub fn format_task_list(project_name: &str, tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return format!("No tasks found in project '{}'.", project_name);
    }

    let mut out = format!("Found {} tasks in project '{}':\n\n", tasks.len(), project_name);
    for (i, task) in tasks.iter().enumerate() {
        let _ = write!(out, "Task {}:\n{}\n", i + 1, format_task(task));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ChecklistItem;

    fn sample_task() -> Task {
        Task {
            id: Some("t1".to_string()),
            project_id: Some("p1".to_string()),
            title: Some("Buy milk".to_string()),
            content: Some("Whole, not skim".to_string()),
            start_date: None,
            due_date: Some("2024-01-15T09:00:00+0000".to_string()),
            priority: Some(3),
            status: Some(0),
            items: vec![
                ChecklistItem {
                    title: Some("Find store".to_string()),
                    status: Some(1),
                    ..Default::default()
                },
                ChecklistItem {
                    title: Some("Pay".to_string()),
                    status: Some(0),
                    ..Default::default()
                },
            ],
        }
    }

    #[test]
    fn test_format_task() {
        let text = format_task(&sample_task());
        assert_eq!(
            text,
            "Title: Buy milk\n\
             Project ID: p1\n\
             Due Date: 2024-01-15T09:00:00+0000\n\
             Priority: Medium\n\
             Status: Active\n\
             \n\
             Content:\n\
             Whole, not skim\n\
             \n\
             Subtasks (2):\n\
             1. [✓] Find store\n\
             2. [□] Pay\n"
        );
    }

    #[test]
    fn test_format_task_defaults() {
        let task = Task {
            status: Some(2),
            ..Default::default()
        };
        let text = format_task(&task);
        assert!(text.contains("Title: No title\n"));
        assert!(text.contains("Project ID: None\n"));
        assert!(text.contains("Priority: None\n"));
        assert!(text.contains("Status: Completed\n"));
        assert!(!text.contains("Subtasks"));
    }

    #[test]
    fn test_priority_labels() {
        assert_eq!(priority_label(0), "None");
        assert_eq!(priority_label(1), "Low");
        assert_eq!(priority_label(5), "High");
        assert_eq!(priority_label(4), "4");
    }

    #[test]
    fn test_format_project() {
        let project = Project {
            id: Some("p1".to_string()),
            name: Some("Inbox".to_string()),
            color: Some("#F18181".to_string()),
            view_mode: Some("kanban".to_string()),
            closed: Some(true),
            kind: Some("TASK".to_string()),
        };
        assert_eq!(
            format_project(&project),
            "Name: Inbox\nID: p1\nColor: #F18181\nView Mode: kanban\nClosed: Yes\nKind: TASK\n"
        );

        let bare = Project::default();
        assert_eq!(format_project(&bare), "Name: No name\nID: No ID\n");
    }

    #[test]
    fn test_lists() {
        assert_eq!(format_project_list(&[]), "No projects found.");

        let projects = vec![Project {
            name: Some("Inbox".to_string()),
            id: Some("p1".to_string()),
            ..Default::default()
        }];
        let text = format_project_list(&projects);
        assert!(text.starts_with("Found 1 projects:\n\nProject 1:\nName: Inbox\n"));

        assert_eq!(
            format_task_list("Inbox", &[]),
            "No tasks found in project 'Inbox'."
        );
        let text = format_task_list("Inbox", &[sample_task()]);
        assert!(text.starts_with("Found 1 tasks in project 'Inbox':\n\nTask 1:\nTitle: Buy milk\n"));
    }
}
