use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Duration, Local, TimeZone, Utc};

use crate::io::config_io::{self, ConfigError};
use crate::io::store_io::{self, DirStore, KeyValueStore, StorageError};
use crate::model::category::{CategoryMeta, CategoryRegistry};
use crate::model::config::Config;
use crate::model::store::{Snapshot, TaskStore};
use crate::model::task::{Task, TaskId};
use crate::model::view::GroupView;
use crate::ops::group::{FilterMode, group_tasks};
use crate::ops::reminder::{Notifier, Reminder, Schedule, arm_reminder};
use crate::ops::task_ops::NewTask;
use crate::ops::{StoreError, category_ops, reorder, task_ops};

/// Source of the current instant
pub type Clock = fn() -> DateTime<Utc>;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// The task tracker: a loaded snapshot bound to its backend and to the
/// environment's timer and notifier.
///
/// Every mutation runs on a working copy of the snapshot. The copy replaces
/// the live snapshot only after it has been saved, so a rejected or unsaved
/// mutation leaves the tracker exactly as it was.
pub struct Tracker<S: KeyValueStore> {
    backend: S,
    snapshot: Snapshot,
    config: Config,
    schedule: Arc<dyn Schedule>,
    notifier: Arc<dyn Notifier>,
    clock: Clock,
}

impl Tracker<DirStore> {
    /// Open the tracker stored in `data_dir`, reading its config.toml.
    pub fn open_dir(
        data_dir: &Path,
        schedule: Arc<dyn Schedule>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, TrackerError> {
        let config = config_io::read_config(data_dir)?;
        Tracker::open(DirStore::new(data_dir), config, schedule, notifier)
    }
}

impl<S: KeyValueStore> Tracker<S> {
    pub fn open(
        backend: S,
        config: Config,
        schedule: Arc<dyn Schedule>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, TrackerError> {
        let snapshot = store_io::load_snapshot(&backend)?;
        tracing::debug!(
            active = snapshot.tasks.active.len(),
            archived = snapshot.tasks.archived.len(),
            "snapshot loaded"
        );
        Ok(Tracker {
            backend,
            snapshot,
            config,
            schedule,
            notifier,
            clock: Utc::now,
        })
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.snapshot.tasks
    }

    pub fn categories(&self) -> &CategoryRegistry {
        &self.snapshot.categories
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Active or archived task by id
    pub fn find(&self, id: TaskId) -> Option<&Task> {
        self.snapshot
            .tasks
            .find(id)
            .or_else(|| self.snapshot.tasks.find_archived(id))
    }

    fn horizon(&self) -> Duration {
        Duration::hours(i64::from(self.config.reminders.horizon_hours))
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// Active tasks grouped by category, "today" taken in local time.
    pub fn view(&self, filter: FilterMode) -> GroupView<'_> {
        self.view_at(filter, &self.now().with_timezone(&Local))
    }

    pub fn view_at<Tz: TimeZone>(&self, filter: FilterMode, now: &DateTime<Tz>) -> GroupView<'_> {
        group_tasks(&self.snapshot.tasks.active, filter, &self.snapshot.categories, now)
    }

    /// Archived tasks grouped by category, unfiltered.
    pub fn archive_view(&self) -> GroupView<'_> {
        group_tasks(
            &self.snapshot.tasks.archived,
            FilterMode::All,
            &self.snapshot.categories,
            &self.now(),
        )
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Add a task and arm its reminder if it is due within the horizon.
    pub fn add_task(&mut self, input: NewTask) -> Result<(Task, Option<Reminder>), TrackerError> {
        let now = self.now();
        let task = self.commit("add", |snap| {
            task_ops::add_task(&mut snap.tasks, &snap.categories, input, now)
        })?;
        let reminder = arm_reminder(&task, now, self.horizon(), &*self.schedule, &self.notifier);
        Ok((task, reminder))
    }

    pub fn add_subtask(&mut self, id: TaskId, text: &str) -> Result<usize, TrackerError> {
        self.commit("add_subtask", |snap| task_ops::add_subtask(&mut snap.tasks, id, text))
    }

    pub fn complete_task(&mut self, id: TaskId) -> Result<Task, TrackerError> {
        let now = self.now();
        self.commit("complete", |snap| task_ops::complete_task(&mut snap.tasks, id, now))
    }

    pub fn delete_task(&mut self, id: TaskId) -> Result<Task, TrackerError> {
        self.commit("delete", |snap| task_ops::delete_task(&mut snap.tasks, id))
    }

    pub fn toggle_subtask(&mut self, id: TaskId, index: usize) -> Result<bool, TrackerError> {
        self.commit("toggle", |snap| task_ops::toggle_subtask(&mut snap.tasks, id, index))
    }

    pub fn add_category(
        &mut self,
        name: &str,
        color: &str,
        icon: &str,
    ) -> Result<Option<CategoryMeta>, TrackerError> {
        self.commit("add_category", |snap| {
            category_ops::add_category(&mut snap.categories, name, color, icon)
        })
    }

    /// Reorder one category's active tasks, placed per `display.reorder`.
    pub fn reorder(&mut self, category: &str, order: &[TaskId]) -> Result<(), TrackerError> {
        let placement = self.config.display.reorder;
        self.commit("reorder", |snap| {
            reorder::reorder_category(&mut snap.tasks, category, order, placement)
        })
    }

    /// Write the current snapshot as-is.
    pub fn save(&mut self) -> Result<(), TrackerError> {
        store_io::save_snapshot(&mut self.backend, &self.snapshot)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reminders
    // -----------------------------------------------------------------------

    /// Arm reminders for every active task inside the horizon.
    pub fn arm_all(&self) -> Vec<Reminder> {
        let now = self.now();
        let horizon = self.horizon();
        self.snapshot
            .tasks
            .active
            .iter()
            .filter_map(|t| arm_reminder(t, now, horizon, &*self.schedule, &self.notifier))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Commit
    // -----------------------------------------------------------------------

    fn commit<T>(
        &mut self,
        op: &'static str,
        apply: impl FnOnce(&mut Snapshot) -> Result<T, StoreError>,
    ) -> Result<T, TrackerError> {
        let mut working = self.snapshot.clone();
        let out = match apply(&mut working) {
            Ok(out) => out,
            Err(e) => {
                tracing::debug!(op, error = %e, "mutation rejected");
                return Err(e.into());
            }
        };
        store_io::save_snapshot(&mut self.backend, &working)?;
        self.snapshot = working;
        tracing::debug!(op, "mutation saved");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::store_io::MemoryStore;
    use crate::model::task::Priority;
    use crate::ops::reminder::Permission;
    use crate::ops::reminder::testing::{RecordingNotifier, RecordingSchedule};
    use crate::ops::reorder::ReorderPlacement;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    struct Harness {
        schedule: Arc<RecordingSchedule>,
        notifier: Arc<RecordingNotifier>,
    }

    impl Harness {
        fn new() -> Self {
            Harness {
                schedule: Arc::new(RecordingSchedule::default()),
                notifier: Arc::new(RecordingNotifier::new(Permission::Granted)),
            }
        }

        fn open<S: KeyValueStore>(&self, backend: S, config: Config) -> Tracker<S> {
            Tracker::open(backend, config, self.schedule.clone(), self.notifier.clone())
                .unwrap()
                .with_clock(fixed_now)
        }
    }

    fn new_task(text: &str, category: &str, due: Option<DateTime<Utc>>) -> NewTask {
        NewTask {
            text: text.into(),
            category: category.into(),
            priority: Priority::Medium,
            due_date: due,
        }
    }

    /// Backend whose writes to one key always fail
    #[derive(Default)]
    struct FailingStore {
        inner: MemoryStore,
        fail_key: Option<&'static str>,
    }

    impl KeyValueStore for FailingStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.fail_key == Some(key) {
                return Err(StorageError::WriteError {
                    path: key.into(),
                    source: std::io::Error::other("disk full"),
                });
            }
            self.inner.set(key, value)
        }
    }

    #[test]
    fn add_then_complete_archives_once() {
        let h = Harness::new();
        let mut tracker = h.open(MemoryStore::default(), Config::default());
        let (task, _) = tracker.add_task(new_task("Buy milk", "Errands", None)).unwrap();

        let archived = tracker.complete_task(task.id).unwrap();
        assert!(archived.done);
        assert_eq!(archived.completed_at, Some(fixed_now()));
        assert!(tracker.tasks().active.is_empty());
        assert_eq!(tracker.tasks().archived.len(), 1);
        assert_eq!(tracker.find(task.id), Some(&archived));

        // Completing again finds nothing in active
        let err = tracker.complete_task(task.id).unwrap_err();
        assert!(matches!(err, TrackerError::Store(StoreError::NotFound(_))));
        assert_eq!(tracker.tasks().archived.len(), 1);
    }

    #[test]
    fn mutations_are_persisted() {
        let h = Harness::new();
        let mut tracker = h.open(MemoryStore::default(), Config::default());
        let (a, _) = tracker.add_task(new_task("a", "Work", None)).unwrap();
        tracker.add_task(new_task("b", "Personal", None)).unwrap();
        tracker.add_subtask(a.id, "step").unwrap();
        tracker.toggle_subtask(a.id, 0).unwrap();
        tracker.add_category("Garden", "#00AA00", "🌱").unwrap();

        let expected = tracker.snapshot().clone();
        let backend = tracker.backend().clone();
        let reopened = h.open(backend, Config::default());
        assert_eq!(reopened.snapshot(), &expected);
        assert!(reopened.tasks().active[0].subtasks[0].done);
        assert_eq!(reopened.categories().get("Garden").unwrap().color, "#00aa00");
    }

    #[test]
    fn delete_leaves_archive_alone() {
        let h = Harness::new();
        let mut tracker = h.open(MemoryStore::default(), Config::default());
        let (a, _) = tracker.add_task(new_task("a", "Work", None)).unwrap();
        let (b, _) = tracker.add_task(new_task("b", "Work", None)).unwrap();
        tracker.complete_task(a.id).unwrap();

        tracker.delete_task(b.id).unwrap();
        assert!(tracker.tasks().active.is_empty());
        assert_eq!(tracker.tasks().archived.len(), 1);
        assert!(tracker.delete_task(a.id).is_err());
    }

    #[test]
    fn rejected_mutation_saves_nothing() {
        let h = Harness::new();
        let mut tracker = h.open(MemoryStore::default(), Config::default());
        let err = tracker.add_task(new_task("x", "Nope", None)).unwrap_err();
        assert!(matches!(err, TrackerError::Store(StoreError::Validation(_))));
        assert!(tracker.backend().entries.is_empty());
        assert!(h.schedule.len() == 0);
    }

    #[test]
    fn failed_save_keeps_previous_state() {
        let h = Harness::new();
        let mut tracker = h.open(FailingStore::default(), Config::default());
        let (a, _) = tracker.add_task(new_task("a", "Work", None)).unwrap();
        let before = tracker.snapshot().clone();

        tracker.backend.fail_key = Some("archived");
        let err = tracker.complete_task(a.id).unwrap_err();
        assert!(matches!(err, TrackerError::Storage(StorageError::WriteError { .. })));
        assert_eq!(tracker.snapshot(), &before);

        tracker.backend.fail_key = None;
        tracker.complete_task(a.id).unwrap();
        assert_eq!(tracker.tasks().archived.len(), 1);
    }

    #[test]
    fn add_arms_reminder_inside_horizon() {
        let h = Harness::new();
        let mut tracker = h.open(MemoryStore::default(), Config::default());

        let soon = fixed_now() + Duration::hours(2);
        let (_, reminder) = tracker.add_task(new_task("Call mom", "Personal", Some(soon))).unwrap();
        assert_eq!(reminder.map(|r| r.at), Some(soon));

        let (_, none) = tracker
            .add_task(new_task("Later", "Personal", Some(fixed_now() + Duration::hours(48))))
            .unwrap();
        assert!(none.is_none());
        assert_eq!(h.schedule.times(), vec![soon]);

        h.schedule.run_all();
        assert_eq!(
            h.notifier.fired(),
            vec![("Task Due".to_string(), "Call mom is due now!".to_string())]
        );
    }

    #[test]
    fn horizon_comes_from_config() {
        let h = Harness::new();
        let mut config = Config::default();
        config.reminders.horizon_hours = 1;
        let mut tracker = h.open(MemoryStore::default(), config);
        let (_, r) = tracker
            .add_task(new_task("x", "Work", Some(fixed_now() + Duration::hours(2))))
            .unwrap();
        assert!(r.is_none());
        assert_eq!(h.schedule.len(), 0);
    }

    #[test]
    fn arm_all_covers_active_tasks_only() {
        let h = Harness::new();
        let mut tracker = h.open(MemoryStore::default(), Config::default());
        let due = Some(fixed_now() + Duration::hours(3));
        let (a, _) = tracker.add_task(new_task("a", "Work", due)).unwrap();
        tracker.add_task(new_task("b", "Work", due)).unwrap();
        tracker.add_task(new_task("c", "Work", None)).unwrap();
        tracker.complete_task(a.id).unwrap();

        let fresh = Harness::new();
        let reopened = fresh.open(tracker.backend().clone(), Config::default());
        let armed = reopened.arm_all();
        assert_eq!(armed.len(), 1);
        assert_eq!(armed[0].body, "b is due now!");
        assert_eq!(fresh.schedule.len(), 1);
    }

    #[test]
    fn reorder_uses_configured_placement() {
        let h = Harness::new();
        for (placement, expected) in [
            (ReorderPlacement::InPlace, ["C", "B", "A"]),
            (ReorderPlacement::Append, ["B", "C", "A"]),
        ] {
            let mut config = Config::default();
            config.display.reorder = placement;
            let mut tracker = h.open(MemoryStore::default(), config);
            let (a, _) = tracker.add_task(new_task("A", "Work", None)).unwrap();
            tracker.add_task(new_task("B", "Personal", None)).unwrap();
            let (c, _) = tracker.add_task(new_task("C", "Work", None)).unwrap();

            tracker.reorder("Work", &[c.id, a.id]).unwrap();
            let texts: Vec<&str> = tracker.tasks().active.iter().map(|t| t.text.as_str()).collect();
            assert_eq!(texts, expected);
        }
    }

    #[test]
    fn stale_reorder_is_rejected() {
        let h = Harness::new();
        let mut tracker = h.open(MemoryStore::default(), Config::default());
        let (a, _) = tracker.add_task(new_task("A", "Work", None)).unwrap();
        let (b, _) = tracker.add_task(new_task("B", "Work", None)).unwrap();
        let before = tracker.snapshot().clone();

        let err = tracker.reorder("Work", &[b.id]).unwrap_err();
        assert!(matches!(err, TrackerError::Store(StoreError::InvariantViolation { .. })));
        let err = tracker.reorder("Work", &[b.id, a.id, TaskId(99)]).unwrap_err();
        assert!(matches!(err, TrackerError::Store(StoreError::InvariantViolation { .. })));
        assert_eq!(tracker.snapshot(), &before);
    }

    #[test]
    fn views_group_active_and_archived() {
        let h = Harness::new();
        let mut tracker = h.open(MemoryStore::default(), Config::default());
        let overdue = Some(fixed_now() - Duration::days(2));
        let (a, _) = tracker.add_task(new_task("a", "Work", overdue)).unwrap();
        tracker.add_task(new_task("b", "Errands", None)).unwrap();
        tracker.add_task(new_task("c", "Work", None)).unwrap();
        tracker.complete_task(a.id).unwrap();

        let active = tracker.view_at(FilterMode::All, &fixed_now());
        let cats: Vec<&str> = active.categories().collect();
        assert_eq!(cats, vec!["Errands", "Work"]);

        let archive = tracker.archive_view();
        assert_eq!(archive.task_count(), 1);
        assert_eq!(archive.groups[0].category, "Work");
        assert!(archive.groups[0].entries[0].task.done);

        assert!(tracker.view_at(FilterMode::Overdue, &fixed_now()).is_empty());
    }
}
