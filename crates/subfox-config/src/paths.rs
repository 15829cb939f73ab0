use std::{env, path::PathBuf};

/// Overrides the application data directory.
pub const HOME_ENV: &str = "SUBFOX_HOME";

const DATA_DIR_NAME: &str = ".subfox";

/// `$SUBFOX_HOME` when set, `~/.subfox` otherwise.
pub fn app_data_dir() -> PathBuf {
    if let Some(dir) = env::var_os(HOME_ENV).filter(|value| !value.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}
