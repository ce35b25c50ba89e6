use std::fs;
use std::path::{Path, PathBuf};

use crate::io::recovery::atomic_write;
use crate::model::config::Config;
use crate::ops::reminder::Permission;

pub const CONFIG_FILE: &str = "config.toml";

/// Written by `dk init`. Every value shown is the default.
pub const CONFIG_TEMPLATE: &str = r#"# docket configuration

[reminders]
# Reminders are armed only for tasks due within this many hours
horizon_hours = 24

[notifications]
# granted | denied | prompt (a reminder request from prompt grants it)
permission = "prompt"

[display]
# Filter used by `dk list` when none is given: all | today | overdue | high
default_filter = "all"
# Where a reordered category lands: in_place | append
reorder = "in_place"
"#;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config.toml: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("could not edit config.toml: {0}")]
    EditError(#[from] toml_edit::TomlError),
    #[error("no data directory: set DOCKET_DIR or HOME")]
    NoDataDir,
}

// ---------------------------------------------------------------------------
// Data directory
// ---------------------------------------------------------------------------

/// Resolve the data directory: explicit flag, then `$DOCKET_DIR`, then
/// `$XDG_DATA_HOME/docket`, then `$HOME/.local/share/docket`.
pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    resolve_data_dir_with(explicit, |key| std::env::var_os(key).filter(|v| !v.is_empty()))
}

fn resolve_data_dir_with(
    explicit: Option<&Path>,
    env: impl Fn(&str) -> Option<std::ffi::OsString>,
) -> Result<PathBuf, ConfigError> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    if let Some(dir) = env("DOCKET_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = env("XDG_DATA_HOME") {
        return Ok(PathBuf::from(xdg).join("docket"));
    }
    env("HOME")
        .map(|home| PathBuf::from(home).join(".local/share/docket"))
        .ok_or(ConfigError::NoDataDir)
}

// ---------------------------------------------------------------------------
// Reading and editing
// ---------------------------------------------------------------------------

/// Read config.toml. A missing file is the default configuration.
pub fn read_config(data_dir: &Path) -> Result<Config, ConfigError> {
    let path = data_dir.join(CONFIG_FILE);
    match fs::read_to_string(&path) {
        Ok(text) => Ok(toml::from_str(&text)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(ConfigError::ReadError { path, source: e }),
    }
}

/// Read config.toml as a toml_edit document for round-trip-safe edits.
/// A missing file reads as the template.
pub fn read_config_document(data_dir: &Path) -> Result<toml_edit::DocumentMut, ConfigError> {
    let path = data_dir.join(CONFIG_FILE);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => CONFIG_TEMPLATE.to_string(),
        Err(e) => return Err(ConfigError::ReadError { path, source: e }),
    };
    Ok(text.parse()?)
}

/// Write the document back, preserving comments and formatting.
pub fn write_config(data_dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ConfigError> {
    let path = data_dir.join(CONFIG_FILE);
    fs::create_dir_all(data_dir)
        .and_then(|()| atomic_write(&path, doc.to_string().as_bytes()))
        .map_err(|e| ConfigError::WriteError { path, source: e })
}

/// Write the template unless a config already exists. Returns whether it wrote.
pub fn write_default_config(data_dir: &Path) -> Result<bool, ConfigError> {
    let path = data_dir.join(CONFIG_FILE);
    if path.exists() {
        return Ok(false);
    }
    fs::create_dir_all(data_dir)
        .and_then(|()| atomic_write(&path, CONFIG_TEMPLATE.as_bytes()))
        .map_err(|e| ConfigError::WriteError { path, source: e })?;
    Ok(true)
}

/// Set `[notifications] permission` in the document
pub fn set_permission(doc: &mut toml_edit::DocumentMut, permission: Permission) {
    if !doc.contains_key("notifications") {
        doc["notifications"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    doc["notifications"]["permission"] = toml_edit::value(permission.as_str());
}

/// Persist a permission decision to config.toml.
pub fn save_permission(data_dir: &Path, permission: Permission) -> Result<(), ConfigError> {
    let mut doc = read_config_document(data_dir)?;
    set_permission(&mut doc, permission);
    write_config(data_dir, &doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::group::FilterMode;
    use std::ffi::OsString;
    use tempfile::TempDir;

    #[test]
    fn template_parses_to_defaults() {
        let config: Config = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn missing_file_is_default() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(read_config(tmp.path()).unwrap(), Config::default());
    }

    #[test]
    fn reads_written_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            "[display]\ndefault_filter = \"high\"\n",
        )
        .unwrap();
        let config = read_config(tmp.path()).unwrap();
        assert_eq!(config.display.default_filter, FilterMode::High);
        assert_eq!(config.reminders.horizon_hours, 24);
    }

    #[test]
    fn bad_toml_is_an_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "[display\n").unwrap();
        assert!(matches!(read_config(tmp.path()), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn write_default_only_once() {
        let tmp = TempDir::new().unwrap();
        assert!(write_default_config(tmp.path()).unwrap());
        fs::write(tmp.path().join(CONFIG_FILE), "[reminders]\nhorizon_hours = 2\n").unwrap();
        assert!(!write_default_config(tmp.path()).unwrap());
        assert_eq!(read_config(tmp.path()).unwrap().reminders.horizon_hours, 2);
    }

    #[test]
    fn save_permission_keeps_comments() {
        let tmp = TempDir::new().unwrap();
        write_default_config(tmp.path()).unwrap();
        save_permission(tmp.path(), Permission::Granted).unwrap();

        let text = fs::read_to_string(tmp.path().join(CONFIG_FILE)).unwrap();
        assert!(text.contains("permission = \"granted\""));
        assert!(text.contains("# Reminders are armed only"));
        let config = read_config(tmp.path()).unwrap();
        assert_eq!(config.notifications.permission, Permission::Granted);
    }

    #[test]
    fn set_permission_adds_missing_table() {
        let mut doc: toml_edit::DocumentMut = "[reminders]\nhorizon_hours = 3\n".parse().unwrap();
        set_permission(&mut doc, Permission::Denied);
        let config: Config = toml::from_str(&doc.to_string()).unwrap();
        assert_eq!(config.notifications.permission, Permission::Denied);
        assert_eq!(config.reminders.horizon_hours, 3);
    }

    #[test]
    fn data_dir_resolution_order() {
        let env = |pairs: &'static [(&'static str, &'static str)]| {
            move |key: &str| {
                pairs
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| OsString::from(v))
            }
        };
        let all = &[
            ("DOCKET_DIR", "/d"),
            ("XDG_DATA_HOME", "/x"),
            ("HOME", "/h"),
        ];

        let explicit = resolve_data_dir_with(Some(Path::new("/e")), env(all)).unwrap();
        assert_eq!(explicit, PathBuf::from("/e"));
        assert_eq!(resolve_data_dir_with(None, env(all)).unwrap(), PathBuf::from("/d"));
        assert_eq!(
            resolve_data_dir_with(None, env(&[("XDG_DATA_HOME", "/x"), ("HOME", "/h")])).unwrap(),
            PathBuf::from("/x/docket")
        );
        assert_eq!(
            resolve_data_dir_with(None, env(&[("HOME", "/h")])).unwrap(),
            PathBuf::from("/h/.local/share/docket")
        );
        assert!(matches!(
            resolve_data_dir_with(None, env(&[])),
            Err(ConfigError::NoDataDir)
        ));
    }
}
