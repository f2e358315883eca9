//! Shell configuration.
//!
//! A trivial `[section] key=value` reader; unknown sections and keys are
//! ignored, a missing file yields the defaults.

use std::fs;
use std::path::Path;

pub const DEFAULT_HELPER_PATH: &str = "/usr/libexec/tioga-shell-helper";
const DEFAULT_SCREENSAVER_DURATION: u32 = 60;

#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Binary spawned as the privileged helper client.
    pub helper_path: String,
    /// Screensaver binary; locking launches it when set.
    pub screensaver_path: Option<String>,
    /// Idle timeout while the screensaver is up, in seconds.
    pub screensaver_duration: u32,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            helper_path: DEFAULT_HELPER_PATH.to_string(),
            screensaver_path: None,
            screensaver_duration: DEFAULT_SCREENSAVER_DURATION,
        }
    }
}

impl ShellConfig {
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(err) => {
                tracing::debug!("no shell config at {}: {}", path.display(), err);
                Self::default()
            }
        }
    }

    pub fn parse(text: &str) -> Self {
        let mut config = Self::default();
        let mut section = String::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                section = name.trim().to_string();
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            match (section.as_str(), key) {
                ("shell", "helper-path") => config.helper_path = value.to_string(),
                ("screensaver", "path") => config.screensaver_path = Some(value.to_string()),
                ("screensaver", "duration") => {
                    if let Ok(duration) = value.parse() {
                        config.screensaver_duration = duration;
                    }
                }
                _ => {}
            }
        }
        config
    }
}
