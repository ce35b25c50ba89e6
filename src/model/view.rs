use serde::Serialize;

use super::category::CategoryMeta;
use super::task::Task;

/// One task in a group, with its index in the sequence that was grouped.
/// Renderers address mutations by `task.id`; `index` is kept for callers
/// that work positionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GroupEntry<'a> {
    pub index: usize,
    pub task: &'a Task,
}

/// All tasks of one category that passed the filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group<'a> {
    pub category: String,
    pub meta: CategoryMeta,
    pub entries: Vec<GroupEntry<'a>>,
}

/// Derived, throwaway grouping of tasks by category. Groups appear in order
/// of first occurrence in the grouped sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GroupView<'a> {
    pub groups: Vec<Group<'a>>,
}

impl<'a> GroupView<'a> {
    pub fn get(&self, category: &str) -> Option<&Group<'a>> {
        self.groups.iter().find(|g| g.category == category)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.category.as_str())
    }

    /// Total number of tasks across all groups
    pub fn task_count(&self) -> usize {
        self.groups.iter().map(|g| g.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
