mod init;
pub use init::cmd_init;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::lock::FileLock;
use crate::io::notify::{TerminalNotifier, ThreadSchedule};
use crate::io::recovery;
use crate::io::store_io::DirStore;
use crate::model::task::{Priority, TaskId};
use crate::ops::StoreError;
use crate::ops::group::FilterMode;
use crate::ops::reminder::Permission;
use crate::ops::task_ops::NewTask;
use crate::tracker::Tracker;
use crate::util::time::parse_due;

type CmdResult = Result<(), Box<dyn Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let data_dir = config_io::resolve_data_dir(cli.data_dir.as_deref())?;
    tracing::debug!(data_dir = %data_dir.display(), "resolved data directory");

    match cli.command {
        Commands::Init => cmd_init(&data_dir, json),

        // Read commands
        Commands::List(args) => cmd_list(&data_dir, args, json),
        Commands::Archive => cmd_archive(&data_dir, json),
        Commands::Show(args) => cmd_show(&data_dir, args, json),
        Commands::Category(CategoryCmd { action }) => match action {
            None | Some(CategoryAction::List) => cmd_category_list(&data_dir, json),
            Some(CategoryAction::Add(args)) => cmd_category_add(&data_dir, args, json),
        },

        // Write commands
        Commands::Add(args) => cmd_add(&data_dir, args, json),
        Commands::Done(args) => cmd_done(&data_dir, args, json),
        Commands::Rm(args) => cmd_rm(&data_dir, args, json),
        Commands::Sub(args) => cmd_sub(&data_dir, args, json),
        Commands::Toggle(args) => cmd_toggle(&data_dir, args, json),
        Commands::Reorder(args) => cmd_reorder(&data_dir, args, json),

        Commands::Remind => cmd_remind(&data_dir, json),
        Commands::Recovery(cmd) => cmd_recovery(&data_dir, cmd, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A tracker opened under the data directory lock. Dropping it releases
/// the lock.
struct Session {
    tracker: Tracker<DirStore>,
    notifier: Arc<TerminalNotifier<std::io::Stdout>>,
    schedule: Arc<ThreadSchedule>,
    data_dir: PathBuf,
    _lock: FileLock,
}

impl Session {
    fn open(data_dir: &Path) -> Result<Self, Box<dyn Error>> {
        let lock = FileLock::acquire_default(data_dir)?;
        let config = config_io::read_config(data_dir)?;
        let notifier = Arc::new(TerminalNotifier::stdout(config.notifications.permission));
        let schedule = Arc::new(ThreadSchedule::new());
        let tracker = Tracker::open(
            DirStore::new(data_dir),
            config,
            schedule.clone(),
            notifier.clone(),
        )?;
        Ok(Session {
            tracker,
            notifier,
            schedule,
            data_dir: data_dir.to_path_buf(),
            _lock: lock,
        })
    }

    /// Remember a permission granted while arming reminders.
    fn persist_grant(&self) {
        if !self.notifier.granted_on_request() {
            return;
        }
        if let Err(e) = config_io::save_permission(&self.data_dir, Permission::Granted) {
            tracing::warn!(error = %e, "could not save notification permission");
        }
    }
}

fn parse_id(s: &str) -> Result<TaskId, Box<dyn Error>> {
    Ok(s.parse::<TaskId>()?)
}

fn local_now(now: DateTime<Utc>) -> DateTime<Local> {
    now.with_timezone(&Local)
}

fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(data_dir: &Path, args: ListArgs, json: bool) -> CmdResult {
    let session = Session::open(data_dir)?;
    let tracker = &session.tracker;
    let filter = match args.filter {
        Some(f) => f.parse::<FilterMode>()?,
        None => tracker.config().display.default_filter,
    };
    let now = tracker.now();
    let view = tracker.view(filter);

    if json {
        print_json(&view_to_json(&view, false, Some(filter), now))
    } else {
        print_lines(&format_view(&view, &local_now(now)));
        Ok(())
    }
}

fn cmd_archive(data_dir: &Path, json: bool) -> CmdResult {
    let session = Session::open(data_dir)?;
    let tracker = &session.tracker;
    let now = tracker.now();
    let view = tracker.archive_view();

    if json {
        print_json(&view_to_json(&view, true, None, now))
    } else {
        print_lines(&format_view(&view, &local_now(now)));
        Ok(())
    }
}

fn cmd_show(data_dir: &Path, args: IdArg, json: bool) -> CmdResult {
    let id = parse_id(&args.id)?;
    let session = Session::open(data_dir)?;
    let tracker = &session.tracker;
    let task = tracker.find(id).ok_or(StoreError::NotFound(id))?;
    let now = tracker.now();

    if json {
        print_json(&task_to_json(task, now))
    } else {
        print_lines(&format_task_detail(task, &local_now(now)));
        Ok(())
    }
}

fn cmd_category_list(data_dir: &Path, json: bool) -> CmdResult {
    let session = Session::open(data_dir)?;
    let categories = session.tracker.categories();

    if json {
        let list: Vec<CategoryJson> = categories
            .iter()
            .map(|(name, meta)| category_to_json(name, meta))
            .collect();
        print_json(&list)
    } else {
        for (name, meta) in categories.iter() {
            println!("{}", format_category_line(name, meta));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_add(data_dir: &Path, args: AddArgs, json: bool) -> CmdResult {
    let priority = args.priority.parse::<Priority>()?;
    let mut session = Session::open(data_dir)?;
    let now = session.tracker.now();
    let due_date = match args.due.as_deref() {
        Some(s) => Some(parse_due(s, now).ok_or_else(|| format!("invalid due date '{}'", s))?),
        None => None,
    };

    let (task, reminder) = session.tracker.add_task(NewTask {
        text: args.text,
        category: args.category,
        priority,
        due_date,
    })?;
    session.persist_grant();

    if json {
        print_json(&AddedJson {
            task: task_to_json(&task, now),
            reminder: reminder.as_ref().map(reminder_to_json),
        })
    } else {
        println!("{}", task.id);
        if let Some(r) = &reminder {
            println!("{} (delivered while `dk remind` runs)", format_reminder(r, &Local));
        }
        Ok(())
    }
}

fn cmd_done(data_dir: &Path, args: IdArg, json: bool) -> CmdResult {
    let id = parse_id(&args.id)?;
    let mut session = Session::open(data_dir)?;
    let task = session.tracker.complete_task(id)?;

    if json {
        print_json(&task_to_json(&task, session.tracker.now()))
    } else {
        println!("#{} done", task.id);
        Ok(())
    }
}

fn cmd_rm(data_dir: &Path, args: IdArg, json: bool) -> CmdResult {
    let id = parse_id(&args.id)?;
    let mut session = Session::open(data_dir)?;
    let task = session.tracker.delete_task(id)?;

    match serde_json::to_string_pretty(&task) {
        Ok(body) => recovery::log_task_deletion(data_dir, &format!("#{}", task.id), &task.category, &body),
        Err(e) => tracing::warn!(error = %e, "could not log deleted task"),
    }

    if json {
        print_json(&task_to_json(&task, session.tracker.now()))
    } else {
        println!("#{} deleted", task.id);
        Ok(())
    }
}

fn cmd_sub(data_dir: &Path, args: SubArgs, json: bool) -> CmdResult {
    let id = parse_id(&args.id)?;
    let mut session = Session::open(data_dir)?;
    let index = session.tracker.add_subtask(id, &args.text)?;

    if json {
        print_json(&serde_json::json!({ "id": id.0, "index": index + 1 }))
    } else {
        println!("#{}.{}", id, index + 1);
        Ok(())
    }
}

fn cmd_toggle(data_dir: &Path, args: ToggleArgs, json: bool) -> CmdResult {
    let id = parse_id(&args.id)?;
    let index = args
        .index
        .checked_sub(1)
        .ok_or("subtask numbers start at 1")?;
    let mut session = Session::open(data_dir)?;
    let done = session.tracker.toggle_subtask(id, index)?;

    if json {
        print_json(&serde_json::json!({ "id": id.0, "index": args.index, "done": done }))
    } else {
        let state = if done { "done" } else { "not done" };
        println!("#{}.{} {}", id, args.index, state);
        Ok(())
    }
}

fn cmd_reorder(data_dir: &Path, args: ReorderArgs, json: bool) -> CmdResult {
    let ids = args
        .ids
        .iter()
        .map(|s| parse_id(s))
        .collect::<Result<Vec<_>, _>>()?;
    let mut session = Session::open(data_dir)?;
    session.tracker.reorder(&args.category, &ids)?;

    let tracker = &session.tracker;
    let now = tracker.now();
    let view = tracker.view(FilterMode::All);
    let group = view.get(&args.category);

    if json {
        let groups: Vec<GroupJson> = group.iter().map(|g| group_to_json(g, now)).collect();
        print_json(&groups)
    } else {
        if let Some(g) = group {
            println!("{}", format_group_header(g));
            for entry in &g.entries {
                println!("{}", format_task_line(entry.task, &local_now(now)));
            }
        }
        Ok(())
    }
}

fn cmd_category_add(data_dir: &Path, args: CategoryAddArgs, json: bool) -> CmdResult {
    let mut session = Session::open(data_dir)?;
    let previous = session
        .tracker
        .add_category(&args.name, &args.color, &args.icon)?;
    let name = args.name.trim();

    if json {
        let meta = session.tracker.categories().resolve(name);
        print_json(&category_to_json(name, &meta))
    } else {
        let verb = if previous.is_some() { "updated" } else { "added" };
        println!("{} category {}", verb, name);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Reminders
// ---------------------------------------------------------------------------

/// Arm reminders for active tasks due within the horizon, release the lock,
/// then wait in the foreground until every reminder has fired.
fn cmd_remind(data_dir: &Path, json: bool) -> CmdResult {
    let session = Session::open(data_dir)?;
    let armed = session.tracker.arm_all();
    session.persist_grant();
    let horizon = session.tracker.config().reminders.horizon_hours;
    let schedule = Arc::clone(&session.schedule);
    drop(session);

    if json {
        let list: Vec<ReminderJson> = armed.iter().map(reminder_to_json).collect();
        print_json(&list)?;
    } else if armed.is_empty() {
        println!("no reminders due within {}h", horizon);
    } else {
        for r in &armed {
            println!("{}", format_reminder(r, &Local));
        }
    }

    tracing::info!(count = armed.len(), "waiting for reminders");
    schedule.wait();
    Ok(())
}

// ---------------------------------------------------------------------------
// Recovery log
// ---------------------------------------------------------------------------

const RECOVERY_DEFAULT_LIMIT: usize = 10;

/// Show recent recovery log entries, newest first. Reads the log only, so
/// no lock is taken.
fn cmd_recovery(data_dir: &Path, cmd: RecoveryCmd, json: bool) -> CmdResult {
    let path = recovery::recovery_log_path(data_dir);
    if let Some(RecoveryAction::Path) = cmd.action {
        if json {
            return print_json(&serde_json::json!({ "path": path.display().to_string() }));
        }
        println!("{}", path.display());
        return Ok(());
    }

    let limit = cmd.limit.unwrap_or(RECOVERY_DEFAULT_LIMIT);
    let entries = recovery::read_recovery_entries(data_dir, Some(limit));

    if json {
        let list: Vec<RecoveryJson> = entries.iter().map(recovery_entry_to_json).collect();
        print_json(&list)
    } else if entries.is_empty() {
        println!("recovery log is empty");
        Ok(())
    } else {
        for entry in &entries {
            print!("{}", entry.to_markdown());
        }
        Ok(())
    }
}
