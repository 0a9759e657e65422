use dirs::home_dir;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const STATE_DIR_ENV: &str = "PRODIGYHABIT_STATE_DIR";

#[derive(Debug, Error)]
pub enum ResolveStateDirError {
    #[error("home directory not found")]
    HomeDirNotFound,
}

pub fn resolve_state_dir() -> Result<PathBuf, ResolveStateDirError> {
    if let Some(override_dir) = std::env::var_os(STATE_DIR_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(override_dir));
    }

    let Some(home) = home_dir() else {
        return Err(ResolveStateDirError::HomeDirNotFound);
    };

    Ok(home.join(".prodigyhabit"))
}

pub fn log_file_path(state_dir: &Path) -> PathBuf {
    state_dir.join("prodigyhabit.log")
}

/// Opens the log file for appending, creating the state dir if needed.
pub fn open_log_file(state_dir: &Path) -> io::Result<File> {
    fs::create_dir_all(state_dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path(state_dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn open_log_file_creates_directory_and_appends() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state_dir = dir.path().join("nested").join("state");

        let mut file = open_log_file(&state_dir).expect("open");
        writeln!(file, "first").expect("write");
        drop(file);
        let mut file = open_log_file(&state_dir).expect("reopen");
        writeln!(file, "second").expect("write");
        drop(file);

        let content = fs::read_to_string(log_file_path(&state_dir)).expect("read");
        assert_eq!(content, "first\nsecond\n");
    }
}
