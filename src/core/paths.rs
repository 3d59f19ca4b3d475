use std::path::{Path, PathBuf};

use tracing::debug;

/// Subdirectory name used under the temp and home directories.
const APP_DIR_NAME: &str = "precoview";

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

/// Candidate directories for the data file, in preference order: a `files`
/// directory beside the executable, a `files` directory under the working
/// directory, an app directory under temp, an app directory under home, and
/// finally the bare temp directory.
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(exe) = std::env::current_exe()
        && let Some(parent) = exe.parent()
    {
        dirs.push(parent.join("files"));
    }
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.join("files"));
    }
    dirs.push(std::env::temp_dir().join(APP_DIR_NAME));
    if let Some(home) = home_dir() {
        dirs.push(home.join(APP_DIR_NAME));
    }
    dirs.push(std::env::temp_dir());
    dirs
}

/// A directory is usable when it exists or can be created, and a zero-byte
/// write/delete probe succeeds in it.
pub fn probe_dir(dir: &Path) -> bool {
    if !dir.exists() && std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let probe = dir.join(".write_probe.tmp");
    match std::fs::File::create(&probe) {
        Ok(file) => {
            drop(file);
            std::fs::remove_file(&probe).is_ok()
        }
        Err(_) => false,
    }
}

/// Resolve the directory the data file is stored in. The first candidate
/// passing the probe wins; the bare temp directory is the last resort even
/// when its own probe fails.
pub fn resolve_data_dir() -> PathBuf {
    for dir in candidate_dirs() {
        if probe_dir(&dir) {
            debug!("Using data directory: {}", dir.display());
            return dir;
        }
        debug!("Data directory rejected: {}", dir.display());
    }
    std::env::temp_dir()
}

/// Last-resort file location used when a write to the resolved path fails.
pub fn temp_fallback_path(filename: &str) -> PathBuf {
    std::env::temp_dir().join(filename)
}

/// Remove the app directory under temp and anything in it. Called on
/// shutdown; failures are only logged.
pub fn cleanup_temp_dir() {
    let dir = std::env::temp_dir().join(APP_DIR_NAME);
    if !dir.exists() {
        return;
    }
    debug!("Cleaning temporary files in {}", dir.display());
    if let Ok(entries) = std::fs::read_dir(&dir) {
        for entry in entries.flatten() {
            if entry.path().is_file()
                && let Err(e) = std::fs::remove_file(entry.path())
            {
                debug!("Could not remove {}: {e}", entry.path().display());
            }
        }
    }
    if let Err(e) = std::fs::remove_dir(&dir) {
        debug!("Could not remove {}: {e}", dir.display());
    }
}
