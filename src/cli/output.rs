use std::fmt::Display;

use chrono::{DateTime, TimeZone, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::io::recovery::RecoveryEntry;
use crate::model::category::CategoryMeta;
use crate::model::task::{Priority, Task};
use crate::model::view::{Group, GroupView};
use crate::ops::group::FilterMode;
use crate::ops::reminder::Reminder;
use crate::util::time::format_timestamp;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskJson {
    pub id: u64,
    pub text: String,
    pub category: String,
    pub priority: Priority,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    pub done: bool,
    pub overdue: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<SubtaskJson>,
}

#[derive(Serialize)]
pub struct SubtaskJson {
    /// 1-based, as accepted by `dk toggle`
    pub index: usize,
    pub text: String,
    pub done: bool,
}

#[derive(Serialize)]
pub struct GroupJson {
    pub category: String,
    pub color: String,
    pub icon: String,
    pub tasks: Vec<TaskJson>,
}

#[derive(Serialize)]
pub struct ViewJson {
    pub archived: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterMode>,
    pub groups: Vec<GroupJson>,
}

#[derive(Serialize)]
pub struct CategoryJson {
    pub name: String,
    pub color: String,
    pub icon: String,
}

#[derive(Serialize)]
pub struct ReminderJson {
    pub task: u64,
    pub at: String,
    pub title: String,
    pub body: String,
}

#[derive(Serialize)]
pub struct RecoveryJson {
    pub timestamp: String,
    pub category: String,
    pub description: String,
    pub fields: IndexMap<String, String>,
    pub body: String,
}

#[derive(Serialize)]
pub struct AddedJson {
    pub task: TaskJson,
    pub reminder: Option<ReminderJson>,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn task_to_json(task: &Task, now: DateTime<Utc>) -> TaskJson {
    TaskJson {
        id: task.id.0,
        text: task.text.clone(),
        category: task.category.clone(),
        priority: task.priority,
        created_at: format_timestamp(&task.created_at),
        due_date: task.due_date.as_ref().map(format_timestamp),
        completed_at: task.completed_at.as_ref().map(format_timestamp),
        done: task.done,
        overdue: is_overdue(task, now),
        subtasks: task
            .subtasks
            .iter()
            .enumerate()
            .map(|(i, s)| SubtaskJson {
                index: i + 1,
                text: s.text.clone(),
                done: s.done,
            })
            .collect(),
    }
}

pub fn group_to_json(group: &Group<'_>, now: DateTime<Utc>) -> GroupJson {
    GroupJson {
        category: group.category.clone(),
        color: group.meta.color.clone(),
        icon: group.meta.icon.clone(),
        tasks: group.entries.iter().map(|e| task_to_json(e.task, now)).collect(),
    }
}

pub fn view_to_json(
    view: &GroupView<'_>,
    archived: bool,
    filter: Option<FilterMode>,
    now: DateTime<Utc>,
) -> ViewJson {
    ViewJson {
        archived,
        filter,
        groups: view.groups.iter().map(|g| group_to_json(g, now)).collect(),
    }
}

pub fn reminder_to_json(reminder: &Reminder) -> ReminderJson {
    ReminderJson {
        task: reminder.task.0,
        at: format_timestamp(&reminder.at),
        title: reminder.title.clone(),
        body: reminder.body.clone(),
    }
}

pub fn recovery_entry_to_json(entry: &RecoveryEntry) -> RecoveryJson {
    RecoveryJson {
        timestamp: format_timestamp(&entry.timestamp),
        category: entry.category.to_string(),
        description: entry.description.clone(),
        fields: entry.fields.iter().cloned().collect(),
        body: entry.body.clone(),
    }
}

pub fn category_to_json(name: &str, meta: &CategoryMeta) -> CategoryJson {
    CategoryJson {
        name: name.to_string(),
        color: meta.color.clone(),
        icon: meta.icon.clone(),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// Active, with a due date strictly in the past
fn is_overdue(task: &Task, now: DateTime<Utc>) -> bool {
    !task.is_archived() && task.due_date.is_some_and(|due| due < now)
}

fn format_local<Tz: TimeZone>(at: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    at.with_timezone(tz).format("%Y-%m-%d %H:%M").to_string()
}

/// One-line summary: checkbox, id, text, then priority, due date and
/// subtask progress when there is something to say.
pub fn format_task_line<Tz: TimeZone>(task: &Task, now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    let check = if task.is_archived() { 'x' } else { ' ' };
    let mut line = format!("[{}] #{} {}", check, task.id.0, task.text);

    if task.priority != Priority::Medium {
        line.push_str(&format!("  !{}", task.priority));
    }
    if let Some(due) = &task.due_date {
        line.push_str(&format!("  due {}", format_local(due, &now.timezone())));
        if is_overdue(task, now.with_timezone(&Utc)) {
            line.push_str(" (overdue)");
        }
    }
    if !task.subtasks.is_empty() {
        let done = task.subtasks.iter().filter(|s| s.done).count();
        line.push_str(&format!("  [{}/{}]", done, task.subtasks.len()));
    }
    line
}

pub fn format_group_header(group: &Group<'_>) -> String {
    format!("== {} ==", label(&group.category, &group.meta))
}

fn label(name: &str, meta: &CategoryMeta) -> String {
    if meta.icon.is_empty() {
        name.to_string()
    } else {
        format!("{} {}", meta.icon, name)
    }
}

/// A whole view, groups separated by blank lines
pub fn format_view<Tz: TimeZone>(view: &GroupView<'_>, now: &DateTime<Tz>) -> Vec<String>
where
    Tz::Offset: Display,
{
    if view.is_empty() {
        return vec!["no tasks".to_string()];
    }
    let mut lines = Vec::new();
    for (i, group) in view.groups.iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        lines.push(format_group_header(group));
        for entry in &group.entries {
            lines.push(format_task_line(entry.task, now));
        }
    }
    lines
}

/// Detailed task view
pub fn format_task_detail<Tz: TimeZone>(task: &Task, now: &DateTime<Tz>) -> Vec<String>
where
    Tz::Offset: Display,
{
    let tz = now.timezone();
    let check = if task.is_archived() { 'x' } else { ' ' };
    let mut lines = vec![
        format!("[{}] #{} {}", check, task.id.0, task.text),
        format!("category: {}", task.category),
        format!("priority: {}", task.priority),
        format!("created: {}", format_local(&task.created_at, &tz)),
    ];
    if let Some(due) = &task.due_date {
        let mut due_line = format!("due: {}", format_local(due, &tz));
        if is_overdue(task, now.with_timezone(&Utc)) {
            due_line.push_str(" (overdue)");
        }
        lines.push(due_line);
    }
    if let Some(completed) = &task.completed_at {
        lines.push(format!("completed: {}", format_local(completed, &tz)));
    }

    if !task.subtasks.is_empty() {
        lines.push(String::new());
        lines.push("subtasks:".to_string());
        for (i, sub) in task.subtasks.iter().enumerate() {
            let check = if sub.done { 'x' } else { ' ' };
            lines.push(format!("  {}. [{}] {}", i + 1, check, sub.text));
        }
    }
    lines
}

pub fn format_category_line(name: &str, meta: &CategoryMeta) -> String {
    format!("{}  {}", meta.color, label(name, meta))
}

pub fn format_reminder<Tz: TimeZone>(reminder: &Reminder, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    format!(
        "reminder for #{} at {}",
        reminder.task.0,
        format_local(&reminder.at, tz)
    )
}
