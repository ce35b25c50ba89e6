use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::time::{optional_timestamp, timestamp};

/// Stable task identity, handed out from the store's sequence and never reused.
///
/// `0` is reserved for records written before ids existed; the gateway
/// replaces it on load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
    pub const UNASSIGNED: TaskId = TaskId(0);

    pub fn is_assigned(self) -> bool {
        self != Self::UNASSIGNED
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = String;

    /// Accepts `12` or `#12`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches('#');
        match digits.parse::<u64>() {
            Ok(0) | Err(_) => Err(format!("invalid task id '{}'", s)),
            Ok(n) => Ok(TaskId(n)),
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" | "med" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!(
                "unknown priority '{}' (expected: low, medium, high)",
                other
            )),
        }
    }
}

/// A checklist item under a task. Toggling it never touches the parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

impl Subtask {
    pub fn new(text: impl Into<String>) -> Self {
        Subtask {
            text: text.into(),
            done: false,
        }
    }
}

/// A task, active or archived.
///
/// Active tasks have `done == false` and no `completed_at`; archived tasks
/// have both set. The store keeps the two populations in separate sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub id: TaskId,
    pub text: String,
    pub category: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "optional_timestamp")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, with = "optional_timestamp")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

impl Task {
    /// A fresh active task.
    pub fn new(
        id: TaskId,
        text: String,
        category: String,
        priority: Priority,
        created_at: DateTime<Utc>,
        due_date: Option<DateTime<Utc>>,
    ) -> Self {
        Task {
            id,
            text,
            category,
            priority,
            created_at,
            due_date,
            completed_at: None,
            done: false,
            subtasks: Vec::new(),
        }
    }

    pub fn is_archived(&self) -> bool {
        self.done
    }

    /// Move into the archived state. One-way.
    pub(crate) fn archive(&mut self, at: DateTime<Utc>) {
        self.done = true;
        self.completed_at = Some(at);
    }
}
