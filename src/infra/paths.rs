// src/infra/paths.rs — Config path management
//
// FITDASH_HOME overrides everything. Otherwise config lives in ~/.fitdash/.

use std::path::PathBuf;

/// Returns the FITDASH_HOME override, if set.
fn fitdash_home() -> Option<PathBuf> {
    std::env::var_os("FITDASH_HOME").map(PathBuf::from)
}

/// Configuration directory: $FITDASH_HOME/ or ~/.fitdash/
pub fn config_dir() -> PathBuf {
    if let Some(home) = fitdash_home() {
        return home;
    }
    match directories::BaseDirs::new() {
        Some(base) => base.home_dir().join(".fitdash"),
        // No resolvable home (e.g. stripped container env): use the cwd
        None => PathBuf::from(".fitdash"),
    }
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}
