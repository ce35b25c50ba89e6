use chrono::{DateTime, Utc};

use super::StoreError;
use crate::model::category::CategoryRegistry;
use crate::model::store::TaskStore;
use crate::model::task::{Priority, Subtask, Task, TaskId};

/// User input for a new task
#[derive(Debug, Clone)]
pub struct NewTask {
    pub text: String,
    pub category: String,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// Append a new active task. `category` must already be registered.
/// Returns a copy of the stored task.
pub fn add_task(
    store: &mut TaskStore,
    categories: &CategoryRegistry,
    input: NewTask,
    now: DateTime<Utc>,
) -> Result<Task, StoreError> {
    let text = input.text.trim();
    if text.is_empty() {
        return Err(StoreError::Validation("task text cannot be empty".into()));
    }
    if !categories.contains(&input.category) {
        return Err(StoreError::Validation(format!(
            "unknown category '{}'",
            input.category
        )));
    }

    let id = store.allocate_id();
    let task = Task::new(
        id,
        text.to_string(),
        input.category,
        input.priority,
        now,
        input.due_date,
    );
    store.active.push(task.clone());
    Ok(task)
}

/// Append a subtask to an active task. Returns its index.
pub fn add_subtask(store: &mut TaskStore, id: TaskId, text: &str) -> Result<usize, StoreError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(StoreError::Validation("subtask text cannot be empty".into()));
    }
    let task = store.find_mut(id).ok_or(StoreError::NotFound(id))?;
    task.subtasks.push(Subtask::new(text));
    Ok(task.subtasks.len() - 1)
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// Archive an active task: out of the active sequence, stamped, appended to
/// the archive. Returns the archived task.
pub fn complete_task(
    store: &mut TaskStore,
    id: TaskId,
    now: DateTime<Utc>,
) -> Result<Task, StoreError> {
    let idx = store.position(id).ok_or(StoreError::NotFound(id))?;
    let mut task = store.active.remove(idx);
    task.archive(now);
    store.archived.push(task.clone());
    Ok(task)
}

/// Remove an active task for good. Returns the removed task.
pub fn delete_task(store: &mut TaskStore, id: TaskId) -> Result<Task, StoreError> {
    let idx = store.position(id).ok_or(StoreError::NotFound(id))?;
    Ok(store.active.remove(idx))
}

/// Flip one subtask of an active task. Returns the subtask's new state.
pub fn toggle_subtask(store: &mut TaskStore, id: TaskId, index: usize) -> Result<bool, StoreError> {
    let task = store.find_mut(id).ok_or(StoreError::NotFound(id))?;
    let len = task.subtasks.len();
    let sub = task
        .subtasks
        .get_mut(index)
        .ok_or(StoreError::Range { task: id, index, len })?;
    sub.done = !sub.done;
    Ok(sub.done)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn input(text: &str, category: &str) -> NewTask {
        NewTask {
            text: text.into(),
            category: category.into(),
            priority: Priority::Medium,
            due_date: None,
        }
    }

    fn sample_store() -> (TaskStore, CategoryRegistry) {
        let reg = CategoryRegistry::seeded();
        let mut store = TaskStore::default();
        add_task(&mut store, &reg, input("Write report", "Work"), now()).unwrap();
        add_task(&mut store, &reg, input("Buy milk", "Errands"), now()).unwrap();
        add_task(&mut store, &reg, input("Call mom", "Personal"), now()).unwrap();
        (store, reg)
    }

    // --- Creation ---

    #[test]
    fn test_add_task_appends_active() {
        let (mut store, reg) = sample_store();
        let due = now() + chrono::Duration::hours(3);
        let task = add_task(
            &mut store,
            &reg,
            NewTask {
                text: "  Fix bike  ".into(),
                category: "Personal".into(),
                priority: Priority::High,
                due_date: Some(due),
            },
            now(),
        )
        .unwrap();

        assert_eq!(task.id, TaskId(4));
        assert_eq!(task.text, "Fix bike");
        assert_eq!(task.created_at, now());
        assert_eq!(task.due_date, Some(due));
        assert!(!task.done);
        assert!(task.completed_at.is_none());
        assert!(task.subtasks.is_empty());
        assert_eq!(store.active.last(), Some(&task));
    }

    #[test]
    fn test_add_task_rejects_empty_text() {
        let (mut store, reg) = sample_store();
        let before = store.clone();
        let err = add_task(&mut store, &reg, input("   ", "Work"), now()).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(store, before);
    }

    #[test]
    fn test_add_task_rejects_unknown_category() {
        let (mut store, reg) = sample_store();
        let before = store.clone();
        let err = add_task(&mut store, &reg, input("Plant tulips", "Garden"), now()).unwrap_err();
        assert_eq!(err, StoreError::Validation("unknown category 'Garden'".into()));
        // Rejected input does not burn an id
        assert_eq!(store, before);
    }

    #[test]
    fn test_add_subtask() {
        let (mut store, _) = sample_store();
        assert_eq!(add_subtask(&mut store, TaskId(1), "outline").unwrap(), 0);
        assert_eq!(add_subtask(&mut store, TaskId(1), "draft").unwrap(), 1);
        let task = store.find(TaskId(1)).unwrap();
        assert_eq!(task.subtasks[1].text, "draft");
        assert!(!task.subtasks[1].done);
        assert!(add_subtask(&mut store, TaskId(1), "").is_err());
        assert_eq!(
            add_subtask(&mut store, TaskId(99), "x"),
            Err(StoreError::NotFound(TaskId(99)))
        );
    }

    // --- Transitions ---

    #[test]
    fn test_complete_moves_to_archive_once() {
        let (mut store, _) = sample_store();
        let later = now() + chrono::Duration::minutes(5);
        let done = complete_task(&mut store, TaskId(2), later).unwrap();

        assert!(done.done);
        assert_eq!(done.completed_at, Some(later));
        assert!(store.find(TaskId(2)).is_none());
        assert_eq!(
            store.archived.iter().filter(|t| t.id == TaskId(2)).count(),
            1
        );
        assert_eq!(store.active.len(), 2);
    }

    #[test]
    fn test_complete_twice_is_not_found() {
        let (mut store, _) = sample_store();
        complete_task(&mut store, TaskId(1), now()).unwrap();
        let before = store.clone();
        assert_eq!(
            complete_task(&mut store, TaskId(1), now()),
            Err(StoreError::NotFound(TaskId(1)))
        );
        assert_eq!(store, before);
    }

    #[test]
    fn test_archive_is_append_only() {
        let (mut store, _) = sample_store();
        complete_task(&mut store, TaskId(3), now()).unwrap();
        complete_task(&mut store, TaskId(1), now()).unwrap();
        let order: Vec<TaskId> = store.archived.iter().map(|t| t.id).collect();
        assert_eq!(order, vec![TaskId(3), TaskId(1)]);
    }

    #[test]
    fn test_delete_task() {
        let (mut store, _) = sample_store();
        complete_task(&mut store, TaskId(3), now()).unwrap();
        let archived_before = store.archived.clone();
        let active_before = store.active.len();

        let removed = delete_task(&mut store, TaskId(1)).unwrap();
        assert_eq!(removed.text, "Write report");
        assert_eq!(store.active.len(), active_before - 1);
        assert_eq!(store.archived, archived_before);
    }

    #[test]
    fn test_delete_archived_is_not_found() {
        let (mut store, _) = sample_store();
        complete_task(&mut store, TaskId(3), now()).unwrap();
        assert_eq!(
            delete_task(&mut store, TaskId(3)),
            Err(StoreError::NotFound(TaskId(3)))
        );
        assert_eq!(store.archived.len(), 1);
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let (mut store, reg) = sample_store();
        delete_task(&mut store, TaskId(3)).unwrap();
        let task = add_task(&mut store, &reg, input("New", "Work"), now()).unwrap();
        assert_eq!(task.id, TaskId(4));
    }

    #[test]
    fn test_toggle_subtask() {
        let (mut store, _) = sample_store();
        add_subtask(&mut store, TaskId(1), "outline").unwrap();
        add_subtask(&mut store, TaskId(1), "draft").unwrap();

        assert_eq!(toggle_subtask(&mut store, TaskId(1), 1), Ok(true));
        let task = store.find(TaskId(1)).unwrap();
        assert!(!task.subtasks[0].done);
        assert!(task.subtasks[1].done);
        // Parent untouched
        assert!(!task.done);
        assert!(task.completed_at.is_none());

        assert_eq!(toggle_subtask(&mut store, TaskId(1), 1), Ok(false));
    }

    #[test]
    fn test_toggle_subtask_out_of_range() {
        let (mut store, _) = sample_store();
        add_subtask(&mut store, TaskId(2), "oat milk").unwrap();
        let before = store.clone();
        assert_eq!(
            toggle_subtask(&mut store, TaskId(2), 1),
            Err(StoreError::Range {
                task: TaskId(2),
                index: 1,
                len: 1
            })
        );
        assert_eq!(store, before);
    }

    #[test]
    fn test_toggle_subtask_on_archived_task() {
        let (mut store, _) = sample_store();
        add_subtask(&mut store, TaskId(2), "oat milk").unwrap();
        complete_task(&mut store, TaskId(2), now()).unwrap();
        assert_eq!(
            toggle_subtask(&mut store, TaskId(2), 0),
            Err(StoreError::NotFound(TaskId(2)))
        );
    }
}
