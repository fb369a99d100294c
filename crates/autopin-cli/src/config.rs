//! Settings vault – reads/writes `~/.autopin/settings.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use autopin_runtime::WatchdogSettings;
use autopin_types::AutopinError;

/// Return the path to `~/.autopin/settings.toml`.
pub fn settings_path() -> PathBuf {
    settings_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the settings path relative to the given home directory.
pub(crate) fn settings_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".autopin").join("settings.toml")
}

/// Load settings from `path`, then apply `AUTOPIN_*` overrides.  Returns
/// `None` if the file does not exist.
pub fn load_from(path: &Path) -> Result<Option<WatchdogSettings>, AutopinError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        AutopinError::Settings(format!("Failed to read {}: {e}", path.display()))
    })?;
    let mut settings: WatchdogSettings = toml::from_str(&raw)
        .map_err(|e| AutopinError::Settings(format!("Failed to parse {}: {e}", path.display())))?;
    settings.apply_env_overrides();
    Ok(Some(settings))
}

/// Save `settings` to `path`, creating the parent directory if necessary.
pub fn save_to(settings: &WatchdogSettings, path: &Path) -> Result<(), AutopinError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            AutopinError::Settings(format!("Failed to create settings directory: {e}"))
        })?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(|e| {
                AutopinError::Settings(format!("Failed to set directory permissions: {e}"))
            })?;
        }
    }
    let raw = toml::to_string_pretty(settings)
        .map_err(|e| AutopinError::Settings(format!("Failed to serialize settings: {e}")))?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(|e| {
                AutopinError::Settings(format!("Failed to write {}: {e}", path.display()))
            })?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| AutopinError::Settings(format!("Failed to write {}: {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use autopin_hal::EntryPolicy;

    #[test]
    fn settings_path_points_to_autopin_dir() {
        let p = settings_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".autopin"));
        assert!(p.to_string_lossy().ends_with("settings.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = settings_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn roundtrip_settings() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = settings_path_for_home(&dir.path().to_string_lossy());
        let settings = WatchdogSettings {
            entry_policy: EntryPolicy::Skip,
            bus_capacity: 32,
        };

        save_to(&settings, &path).expect("save");
        let loaded = load_from(&path).expect("load ok").expect("some");

        assert_eq!(loaded.entry_policy, EntryPolicy::Skip);
        assert_eq!(loaded.bus_capacity, 32);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "bus_capacity = 8\n").expect("write");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.bus_capacity, 8);
        assert_eq!(loaded.entry_policy, EntryPolicy::Proceed);
    }

    #[test]
    fn malformed_file_is_a_settings_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "entry_policy = 42\n").expect("write");

        assert!(matches!(load_from(&path), Err(AutopinError::Settings(_))));
    }

    #[cfg(unix)]
    #[test]
    fn settings_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = settings_path_for_home(&dir.path().to_string_lossy());

        save_to(&WatchdogSettings::default(), &path).expect("save");

        let file_mode = std::fs::metadata(&path).expect("file metadata").permissions().mode();
        assert_eq!(file_mode & 0o777, 0o600);
        let dir_meta = std::fs::metadata(path.parent().unwrap()).expect("dir metadata");
        assert_eq!(dir_meta.permissions().mode() & 0o777, 0o700);
    }
}
