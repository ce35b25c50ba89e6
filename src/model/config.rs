use serde::{Deserialize, Serialize};

use crate::ops::group::FilterMode;
use crate::ops::reminder::Permission;
use crate::ops::reorder::ReorderPlacement;

/// Configuration from config.toml. Every field has a default, so a missing
/// or empty file is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub reminders: ReminderConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Reminders are armed only for tasks due within this many hours
    #[serde(default = "default_horizon_hours")]
    pub horizon_hours: u32,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        ReminderConfig {
            horizon_hours: default_horizon_hours(),
        }
    }
}

fn default_horizon_hours() -> u32 {
    24
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub permission: Permission,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Filter used by `dk list` when none is given
    #[serde(default)]
    pub default_filter: FilterMode,
    /// Where a reordered category's tasks land in the active sequence
    #[serde(default)]
    pub reorder: ReorderPlacement,
}
