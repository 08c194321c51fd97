use std::path::{Path, PathBuf};

const BASE_DIR_ENV: &str = "TANGO_NOTEBOOK_DIR";
const BASE_DIR_NAME: &str = ".tango-notebook";

/// `$TANGO_NOTEBOOK_DIR`, else `~/.tango-notebook`, else `.tango-notebook`.
pub fn base_dir() -> PathBuf {
    if let Some(dir) = base_dir_override() {
        return dir;
    }
    home_join(BASE_DIR_NAME).unwrap_or_else(|| PathBuf::from(BASE_DIR_NAME))
}

/// Resolves a configured path: `~` expands to the home directory and relative
/// paths hang off `base`.
pub(crate) fn resolve_in(base: &Path, value: &str) -> Option<PathBuf> {
    let path = normalize_dir(value)?;
    if path.is_absolute() {
        Some(path)
    } else {
        Some(base.join(path))
    }
}

fn base_dir_override() -> Option<PathBuf> {
    std::env::var(BASE_DIR_ENV)
        .ok()
        .and_then(|value| normalize_dir(&value))
}

fn home_join(suffix: &str) -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(suffix))
        }
    })
}

fn normalize_dir(value: &str) -> Option<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let expanded = expand_tilde(trimmed);
    Some(normalize_path(PathBuf::from(expanded)))
}

fn normalize_path(path: PathBuf) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        normalized.push(component.as_os_str());
    }
    normalized
}

fn expand_tilde(value: &str) -> String {
    if value == "~" || value.starts_with("~/") {
        if let Ok(home) = std::env::var("HOME") {
            let home = home.trim();
            if home.is_empty() {
                return value.to_string();
            }
            if value == "~" {
                return home.to_string();
            }
            return format!("{}{}", home, &value[1..]);
        }
    }
    value.to_string()
}
