use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use which::which;

/// Launch profile for the Chromium driver.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Explicit browser binary; detected from `MAILPILOT_CHROME`, `PATH` and
    /// the usual install locations when unset.
    pub executable: Option<PathBuf>,
    /// Persistent profile directory so a manual login survives between runs.
    pub user_data_dir: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
    pub user_agent: Option<String>,
    pub launch_timeout_ms: u64,
    pub navigation_timeout_ms: u64,
    /// Interval between element lookups while waiting for a selector.
    pub locate_poll_ms: u64,
    pub extra_args: Vec<String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            executable: None,
            user_data_dir: None,
            window_width: 1920,
            window_height: 1080,
            user_agent: None,
            launch_timeout_ms: 30_000,
            navigation_timeout_ms: 30_000,
            locate_poll_ms: 200,
            extra_args: Vec::new(),
        }
    }
}

impl DriverConfig {
    pub fn resolve_executable(&self) -> Option<PathBuf> {
        if let Some(path) = self.executable.as_deref() {
            if path.exists() {
                return Some(path.to_path_buf());
            }
        }
        detect_chrome_executable()
    }
}

pub fn detect_chrome_executable() -> Option<PathBuf> {
    if let Ok(raw) = env::var("MAILPILOT_CHROME") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let candidate = PathBuf::from(trimmed);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    for name in chrome_executable_names() {
        if let Ok(path) = which(name) {
            return Some(path);
        }
    }

    os_specific_chrome_paths()
        .into_iter()
        .find(|candidate| candidate.exists())
}

fn chrome_executable_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chrome.exe", "chromium.exe", "msedge.exe"]
    }

    #[cfg(not(target_os = "windows"))]
    {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium",
            "chromium-browser",
        ]
    }
}

fn os_specific_chrome_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let mut paths = Vec::new();
        for key in ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"] {
            if let Ok(value) = env::var(key) {
                let root = Path::new(value.trim());
                paths.push(root.join("Google/Chrome/Application/chrome.exe"));
                paths.push(root.join("Microsoft/Edge/Application/msedge.exe"));
            }
        }
        paths
    }

    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        [
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium-browser",
            "/usr/bin/chromium",
        ]
        .iter()
        .map(Path::new)
        .map(Path::to_path_buf)
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn configured_executable_wins_when_present() {
        let dir = tempdir().unwrap();
        let exe_path = dir.path().join("my-chrome");
        fs::write(&exe_path, b"").unwrap();
        let config = DriverConfig {
            executable: Some(exe_path.clone()),
            ..DriverConfig::default()
        };
        assert_eq!(config.resolve_executable(), Some(exe_path));
    }

    #[test]
    fn defaults_match_desktop_launch_profile() {
        let config = DriverConfig::default();
        assert_eq!((config.window_width, config.window_height), (1920, 1080));
        assert!(config.user_data_dir.is_none());
    }
}
