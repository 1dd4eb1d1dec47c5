//! Logging configuration.
//!
//! Describes where and how verbosely logs are written. The subscriber itself
//! is installed by the application.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

/// Logging setup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level name (`error`, `warn`, `info`, `debug`, `trace`)
    pub level: String,
    /// Write to stderr
    pub console_output: bool,
    /// Write to a file in `log_dir`
    pub file_output: bool,
    /// Log directory; `None` uses the platform data dir
    pub log_dir: Option<PathBuf>,
    /// Number of log files kept
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file_output: false,
            log_dir: None,
            max_files: 5,
        }
    }
}

impl LogConfig {
    /// Parsed level, `INFO` if the name is not recognised
    pub fn parse_level(&self) -> LevelFilter {
        self.level.parse().unwrap_or(LevelFilter::INFO)
    }

    /// Effective log directory
    pub fn log_directory(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("sonodrive")
                .join("logs")
        })
    }

    /// Create the log directory if needed
    pub fn ensure_log_directory(&self) -> std::io::Result<()> {
        fs::create_dir_all(self.log_directory())
    }

    /// Path of the log file for this process
    pub fn current_log_path(&self) -> PathBuf {
        self.log_directory()
            .join(format!("sonodrive-{}.log", std::process::id()))
    }

    /// Delete the oldest `sonodrive-*.log` files beyond `max_files`
    pub fn cleanup_old_logs(&self) -> std::io::Result<usize> {
        let dir = self.log_directory();
        if !dir.exists() {
            return Ok(0);
        }

        let mut logs: Vec<(std::time::SystemTime, PathBuf)> = fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("sonodrive-") && n.ends_with(".log"))
                    .unwrap_or(false)
            })
            .filter_map(|path| {
                let modified = fs::metadata(&path).and_then(|m| m.modified()).ok()?;
                Some((modified, path))
            })
            .collect();

        if logs.len() <= self.max_files {
            return Ok(0);
        }

        // Newest first
        logs.sort_by(|a, b| b.0.cmp(&a.0));
        let mut removed = 0;
        for (_, path) in logs.into_iter().skip(self.max_files) {
            fs::remove_file(path)?;
            removed += 1;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_level() {
        let mut config = LogConfig::default();
        assert_eq!(config.parse_level(), LevelFilter::INFO);

        config.level = "debug".to_string();
        assert_eq!(config.parse_level(), LevelFilter::DEBUG);

        config.level = "nonsense".to_string();
        assert_eq!(config.parse_level(), LevelFilter::INFO);
    }

    #[test]
    fn test_cleanup_keeps_newest() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            log_dir: Some(dir.path().to_path_buf()),
            max_files: 2,
            ..Default::default()
        };

        for i in 0..4 {
            fs::write(dir.path().join(format!("sonodrive-{}.log", i)), "x").unwrap();
        }
        fs::write(dir.path().join("other.txt"), "x").unwrap();

        assert_eq!(config.cleanup_old_logs().unwrap(), 2);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);
    }
}
