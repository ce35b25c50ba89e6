use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::StoreError;
use crate::model::store::TaskStore;
use crate::model::task::{Task, TaskId};

/// Where a reordered category's tasks go in the active sequence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReorderPlacement {
    /// Back into the slots the category already occupied
    #[default]
    InPlace,
    /// After every task of the other categories
    Append,
}

/// Rebuild the active sequence with `category`'s tasks in `order`.
///
/// `order` must name exactly the category's active tasks, each once. Anything
/// else means the caller was looking at a stale view, and nothing changes.
/// Tasks of other categories keep their relative order under either placement.
pub fn reorder_category(
    store: &mut TaskStore,
    category: &str,
    order: &[TaskId],
    placement: ReorderPlacement,
) -> Result<(), StoreError> {
    check_permutation(store, category, order)?;

    let layout: Vec<bool> = store.active.iter().map(|t| t.category == category).collect();
    let (mut moved, others): (Vec<Task>, Vec<Task>) = std::mem::take(&mut store.active)
        .into_iter()
        .partition(|t| t.category == category);

    let rank: HashMap<TaskId, usize> = order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    moved.sort_by_key(|t| rank.get(&t.id).copied().unwrap_or(usize::MAX));

    store.active = match placement {
        ReorderPlacement::Append => {
            let mut out = others;
            out.extend(moved);
            out
        }
        ReorderPlacement::InPlace => {
            let mut moved = moved.into_iter();
            let mut others = others.into_iter();
            layout
                .into_iter()
                .filter_map(|in_category| {
                    if in_category {
                        moved.next()
                    } else {
                        others.next()
                    }
                })
                .collect()
        }
    };
    Ok(())
}

/// Stale-view guard: `order` is a permutation of the category's task ids.
fn check_permutation(store: &TaskStore, category: &str, order: &[TaskId]) -> Result<(), StoreError> {
    let violation = |detail: String| StoreError::InvariantViolation {
        category: category.to_string(),
        detail,
    };

    let current: Vec<TaskId> = store.in_category(category).map(|t| t.id).collect();
    let current_set: HashSet<TaskId> = current.iter().copied().collect();

    let mut seen = HashSet::with_capacity(order.len());
    for id in order {
        if !current_set.contains(id) {
            return Err(violation(format!("task {} is not in this category", id)));
        }
        if !seen.insert(*id) {
            return Err(violation(format!("task {} is listed twice", id)));
        }
    }
    if let Some(missing) = current.iter().find(|id| !seen.contains(*id)) {
        return Err(violation(format!("task {} is missing from the new order", missing)));
    }
    Ok(())
}
