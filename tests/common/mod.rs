//! Shared helpers for integration tests.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use mcp_proxy_logging::logs::{RegistrySettings, RetentionWindow};
use mcp_proxy_logging::Level;

/// Registry settings rooted in `dir`, with every level enabled for servers.
pub fn settings_in(dir: &Path) -> RegistrySettings {
    RegistrySettings {
        system_level: Level::Info,
        server_level: Level::Trace,
        system_retention: RetentionWindow::hours(24),
        server_retention: RetentionWindow::hours(1),
        log_dir: dir.to_path_buf(),
        ..RegistrySettings::default()
    }
}

/// Create `name` in `dir` with a modification time `age` in the past.
#[allow(dead_code)]
pub fn aged_file(dir: &Path, name: &str, age: Duration) -> PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    file.write_all(b"[old] [INFO] archived line\n").unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
    path
}

/// All lines of a log file.
pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Sorted file names in `dir`.
#[allow(dead_code)]
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
