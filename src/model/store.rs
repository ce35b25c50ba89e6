use std::collections::HashSet;

use super::category::CategoryRegistry;
use super::task::{Task, TaskId};

/// The authoritative task collections.
///
/// `active` is the canonical display order (reorderable); `archived` is
/// append-only in completion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStore {
    pub active: Vec<Task>,
    pub archived: Vec<Task>,
    /// Next id to hand out. Always greater than every id in either sequence.
    pub next_id: u64,
}

impl Default for TaskStore {
    fn default() -> Self {
        TaskStore {
            active: Vec::new(),
            archived: Vec::new(),
            next_id: 1,
        }
    }
}

impl TaskStore {
    /// Active task by id
    pub fn find(&self, id: TaskId) -> Option<&Task> {
        self.active.iter().find(|t| t.id == id)
    }

    /// Archived task by id
    pub fn find_archived(&self, id: TaskId) -> Option<&Task> {
        self.archived.iter().find(|t| t.id == id)
    }

    /// Position of an active task in the canonical sequence
    pub fn position(&self, id: TaskId) -> Option<usize> {
        self.active.iter().position(|t| t.id == id)
    }

    pub(crate) fn find_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.active.iter_mut().find(|t| t.id == id)
    }

    /// Hand out the next id.
    pub(crate) fn allocate_id(&mut self) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Highest id present in either sequence
    pub fn max_id(&self) -> u64 {
        self.active
            .iter()
            .chain(self.archived.iter())
            .map(|t| t.id.0)
            .max()
            .unwrap_or(0)
    }

    /// Give every record without an id a fresh one, after raising `next_id`
    /// above every id already present. Returns how many were assigned.
    pub(crate) fn assign_missing_ids(&mut self) -> usize {
        self.next_id = self.next_id.max(self.max_id() + 1);
        let mut assigned = 0;
        for task in self.active.iter_mut().chain(self.archived.iter_mut()) {
            if !task.id.is_assigned() {
                task.id = TaskId(self.next_id);
                self.next_id += 1;
                assigned += 1;
            }
        }
        assigned
    }

    /// Remove active records whose id is also archived and return their ids.
    /// A completion saved only halfway leaves the task in both sequences;
    /// the archived copy is the one kept.
    pub(crate) fn drop_archived_duplicates(&mut self) -> Vec<TaskId> {
        let archived: HashSet<TaskId> = self.archived.iter().map(|t| t.id).collect();
        let mut dropped = Vec::new();
        self.active.retain(|t| {
            if archived.contains(&t.id) {
                dropped.push(t.id);
                false
            } else {
                true
            }
        });
        dropped
    }

    /// Active tasks filed under `category`, in canonical order
    pub fn in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Task> + 'a {
        self.active.iter().filter(move |t| t.category == category)
    }
}

/// Everything that is persisted: the task store plus the category registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub tasks: TaskStore,
    pub categories: CategoryRegistry,
}
