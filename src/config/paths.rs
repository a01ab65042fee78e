use std::env;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::types::ClientError;

pub(super) const CONFIG_PATH_ENV: &str = "CARESRE_CONFIG";

/// Get the path to the config.json file
/// Looks for config.json in the app directory (parent of the bin folder)
pub(super) fn get_config_path() -> Result<PathBuf, ClientError> {
    if let Ok(custom) = env::var(CONFIG_PATH_ENV) {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            debug!(path = %trimmed, "Using config path from environment");
            return Ok(PathBuf::from(trimmed));
        }
    }

    // Executable is at: app_root/bin/caresre
    // Config should be at: app_root/config.json
    if let Ok(exe_path) = env::current_exe() {
        debug!(path = %exe_path.display(), "Executable path detected");

        if let Some(app_root) = exe_path.parent().and_then(|bin_dir| bin_dir.parent()) {
            let config_path = app_root.join("config.json");
            debug!(path = %config_path.display(), "Looking for config");
            return Ok(config_path);
        }
    }

    warn!("Using fallback: looking for config.json in current directory");
    env::current_dir()
        .map(|dir| dir.join("config.json"))
        .map_err(|err| ClientError::Config(format!("Failed to determine config path: {err}")))
}
