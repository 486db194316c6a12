use std::path::PathBuf;

use dirs_next::{config_dir, home_dir};

pub fn expand_tilde(path: &str) -> PathBuf {
    let p = path.trim();
    let home = || home_dir().unwrap_or_else(|| PathBuf::from("~"));
    if p == "~" {
        return home();
    }
    if let Some(rest) = p.strip_prefix("~/").or_else(|| p.strip_prefix("~\\")) {
        return home().join(rest);
    }
    PathBuf::from(p)
}

/// Resolve a configuration file location.
///
/// A non-empty value of `override_var` wins (tilde-expanded). Otherwise the
/// file lives at `<config_dir>/<app>/<file_name>`, falling back to the current
/// directory when the platform has no config directory.
pub fn config_path(override_var: &str, app: &str, file_name: &str) -> PathBuf {
    if let Ok(path) = std::env::var(override_var)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }
    config_dir().unwrap_or_else(|| PathBuf::from(".")).join(app).join(file_name)
}
