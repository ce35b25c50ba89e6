use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::task::{Task, TaskId};

pub const REMINDER_TITLE: &str = "Task Due";

/// Notification permission as reported by the environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    /// Not decided yet; a request may grant it
    #[default]
    Prompt,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Granted => "granted",
            Permission::Denied => "denied",
            Permission::Prompt => "prompt",
        }
    }
}

/// Something that can show a notification to the user.
pub trait Notifier: Send + Sync {
    fn permission(&self) -> Permission;
    /// Ask for permission. Must not block on the user's answer.
    fn request_permission(&self);
    fn fire(&self, title: &str, body: &str);
}

/// Deferred work handed to a [`Schedule`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// The environment's one-shot timer: run `job` once at `at`.
pub trait Schedule: Send + Sync {
    fn schedule(&self, at: DateTime<Utc>, job: Job);
}

/// A reminder that has been (or would be) armed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reminder {
    pub task: TaskId,
    pub at: DateTime<Utc>,
    pub title: String,
    pub body: String,
}

/// The reminder for `task`, if its due instant is strictly after `now` and
/// at most `horizon` away.
pub fn plan_reminder(task: &Task, now: DateTime<Utc>, horizon: Duration) -> Option<Reminder> {
    let due = task.due_date?;
    let delay = due - now;
    if delay <= Duration::zero() || delay > horizon {
        return None;
    }
    Some(Reminder {
        task: task.id,
        at: due,
        title: REMINDER_TITLE.to_string(),
        body: format!("{} is due now!", task.text),
    })
}

/// Plan and, when due soon enough, schedule the reminder for `task`.
///
/// If permission has not been granted a request is issued and scheduling
/// goes ahead anyway; permission is checked again when the job runs. The job
/// owns a copy of the message, never the task.
pub fn arm_reminder(
    task: &Task,
    now: DateTime<Utc>,
    horizon: Duration,
    schedule: &dyn Schedule,
    notifier: &Arc<dyn Notifier>,
) -> Option<Reminder> {
    let reminder = plan_reminder(task, now, horizon)?;

    if notifier.permission() != Permission::Granted {
        tracing::debug!(task = %task.id, "requesting notification permission");
        notifier.request_permission();
    }

    let notifier = Arc::clone(notifier);
    let job_reminder = reminder.clone();
    schedule.schedule(
        reminder.at,
        Box::new(move || {
            deliver(&*notifier, &job_reminder);
        }),
    );

    tracing::info!(task = %task.id, at = %reminder.at, "reminder armed");
    Some(reminder)
}

/// Fire `reminder` if the notifier is allowed to show it right now.
pub fn deliver(notifier: &dyn Notifier, reminder: &Reminder) -> bool {
    if notifier.permission() != Permission::Granted {
        tracing::info!(task = %reminder.task, "reminder dropped: notifications not permitted");
        return false;
    }
    notifier.fire(&reminder.title, &reminder.body);
    true
}
