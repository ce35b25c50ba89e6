use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dk", about = concat!("docket v", env!("CARGO_PKG_VERSION"), " - tasks by category, with reminders"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use a different data directory
    #[arg(long = "data-dir", global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log debug events to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data directory, config.toml and the default categories
    Init,
    /// Add a task
    Add(AddArgs),
    /// Complete a task (moves it to the archive)
    Done(IdArg),
    /// Permanently delete an active task
    Rm(IdArg),
    /// Add a subtask
    Sub(SubArgs),
    /// Toggle a subtask done/undone
    Toggle(ToggleArgs),
    /// List active tasks grouped by category
    List(ListArgs),
    /// List completed tasks grouped by category
    Archive,
    /// Show task details
    Show(IdArg),
    /// Set the order of one category's tasks
    Reorder(ReorderArgs),
    /// Category management
    Category(CategoryCmd),
    /// Arm reminders for tasks due soon and wait for them to fire
    Remind,
    /// View the recovery log
    Recovery(RecoveryCmd),
}

// ---------------------------------------------------------------------------
// Task args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Task text
    pub text: String,
    /// Category (must exist)
    #[arg(short, long, default_value = "General")]
    pub category: String,
    /// Priority: low, medium, high
    #[arg(short, long, default_value = "medium")]
    pub priority: String,
    /// Due date: RFC 3339, YYYY-MM-DDTHH:MM (local time), or +N[s|m|h|d]
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Args)]
pub struct IdArg {
    /// Task ID
    pub id: String,
}

#[derive(Args)]
pub struct SubArgs {
    /// Task ID
    pub id: String,
    /// Subtask text
    pub text: String,
}

#[derive(Args)]
pub struct ToggleArgs {
    /// Task ID
    pub id: String,
    /// Subtask number (1-based, as shown by `dk show`)
    pub index: usize,
}

#[derive(Args)]
pub struct ListArgs {
    /// all, today, overdue, high (default from config)
    #[arg(long)]
    pub filter: Option<String>,
}

#[derive(Args)]
pub struct ReorderArgs {
    /// Category to reorder
    pub category: String,
    /// Every task ID in the category, in the new order
    #[arg(required = true)]
    pub ids: Vec<String>,
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct CategoryCmd {
    #[command(subcommand)]
    pub action: Option<CategoryAction>,
}

#[derive(Subcommand)]
pub enum CategoryAction {
    /// List categories (default)
    List,
    /// Add a category, or replace an existing one's color and icon
    Add(CategoryAddArgs),
}

#[derive(Args)]
pub struct CategoryAddArgs {
    /// Category name
    pub name: String,
    /// Color as #RRGGBB
    pub color: String,
    /// Icon shown before the name
    #[arg(long, default_value = "")]
    pub icon: String,
}

// ---------------------------------------------------------------------------
// Recovery log
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RecoveryCmd {
    #[command(subcommand)]
    pub action: Option<RecoveryAction>,
    /// Maximum number of entries to show (default: 10)
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Subcommand)]
pub enum RecoveryAction {
    /// Print the absolute path to the recovery log
    Path,
}
