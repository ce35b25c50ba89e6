pub mod category_ops;
pub mod group;
pub mod reminder;
pub mod reorder;
pub mod task_ops;

use crate::model::task::TaskId;

/// Rejection of a mutation. Whatever the variant, the store is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Missing or malformed user input
    #[error("invalid input: {0}")]
    Validation(String),
    /// The task is not in the collection the operation expects
    #[error("task not found: {0}")]
    NotFound(TaskId),
    #[error("subtask {index} out of range: task {task} has {len} subtask(s)")]
    Range { task: TaskId, index: usize, len: usize },
    /// A reorder payload that does not match the category's current tasks
    #[error("stale reorder for category '{category}': {detail}")]
    InvariantViolation { category: String, detail: String },
}
