use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::model::category::CategoryRegistry;
use crate::model::task::{Priority, Task};
use crate::model::view::{Group, GroupEntry, GroupView};

/// Which active tasks a view shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    All,
    /// Due on the current calendar date
    Today,
    /// Due strictly before the current instant
    Overdue,
    /// Priority is high
    High,
}

impl FilterMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterMode::All => "all",
            FilterMode::Today => "today",
            FilterMode::Overdue => "overdue",
            FilterMode::High => "high",
        }
    }

    /// Whether `task` passes this filter at `now`. Calendar dates are taken
    /// in `now`'s time zone. A task with no due date never matches `today`
    /// or `overdue`.
    pub fn matches<Tz: TimeZone>(self, task: &Task, now: &DateTime<Tz>) -> bool {
        match self {
            FilterMode::All => true,
            FilterMode::Today => task.due_date.is_some_and(|due| {
                due.with_timezone(&now.timezone()).date_naive() == now.date_naive()
            }),
            FilterMode::Overdue => task.due_date.is_some_and(|due| due < *now),
            FilterMode::High => task.priority == Priority::High,
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(FilterMode::All),
            "today" => Ok(FilterMode::Today),
            "overdue" => Ok(FilterMode::Overdue),
            "high" => Ok(FilterMode::High),
            other => Err(format!(
                "unknown filter '{}' (expected: all, today, overdue, high)",
                other
            )),
        }
    }
}

/// Filter `tasks` and partition the survivors by category.
///
/// Each entry keeps its index into `tasks`. Groups are ordered by first
/// occurrence, entries by their order in `tasks`. Pure: the same inputs
/// always give an equal view.
pub fn group_tasks<'a, Tz: TimeZone>(
    tasks: &'a [Task],
    filter: FilterMode,
    registry: &CategoryRegistry,
    now: &DateTime<Tz>,
) -> GroupView<'a> {
    let mut view = GroupView::default();
    for (index, task) in tasks.iter().enumerate() {
        if !filter.matches(task, now) {
            continue;
        }
        let entry = GroupEntry { index, task };
        match view.groups.iter_mut().find(|g| g.category == task.category) {
            Some(group) => group.entries.push(entry),
            None => view.groups.push(Group {
                category: task.category.clone(),
                meta: registry.resolve(&task.category),
                entries: vec![entry],
            }),
        }
    }
    view
}
