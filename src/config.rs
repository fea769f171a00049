//! Config model and persistence helpers.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Top-level configuration stored in `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Auto refresh behaviour of the dashboard.
    pub auto_refresh: AutoRefreshCfg,
    /// What the snapshot worker collects.
    pub snapshot: SnapshotCfg,
    /// Presentation values.
    pub ui: UiCfg,
}

/// Auto refresh settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoRefreshCfg {
    /// Refresh interval in milliseconds. 0 keeps auto refresh paused.
    pub interval_ms: u64,
    /// Master switch. When false the interval dropdown is disabled.
    pub enabled: bool,
    /// Show the manual refresh button while paused.
    pub show_manual_refresh: bool,
}

/// Snapshot collection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotCfg {
    /// How many of the busiest processes to keep per snapshot.
    pub top_processes: usize,
}

/// Presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiCfg {
    /// Number of log lines kept in the side pane.
    pub log_lines: usize,
}

impl Config {
    /// Load from disk or create defaults when missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let s = fs::read_to_string(path)?;
            Ok(toml::from_str(&s)?)
        } else {
            let cfg = Self::default();
            cfg.save(path)?;
            Ok(cfg)
        }
    }

    /// Persist the config as pretty TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let s = toml::to_string_pretty(self)?;
        fs::write(path, s)?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auto_refresh: AutoRefreshCfg {
                interval_ms: 10_000,
                enabled: true,
                show_manual_refresh: true,
            },
            snapshot: SnapshotCfg { top_processes: 5 },
            ui: UiCfg { log_lines: 100 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_or_default_writes_missing_file() {
        // A missing file gets created with defaults.
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_or_default(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.auto_refresh.interval_ms, 10_000);
        assert!(cfg.auto_refresh.enabled);
        assert!(cfg.auto_refresh.show_manual_refresh);
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        // Saved values survive a reload.
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.auto_refresh.interval_ms = 0;
        cfg.auto_refresh.enabled = false;
        cfg.snapshot.top_processes = 9;
        cfg.save(&path).unwrap();

        let loaded = Config::load_or_default(&path).unwrap();
        assert_eq!(loaded.auto_refresh.interval_ms, 0);
        assert!(!loaded.auto_refresh.enabled);
        assert_eq!(loaded.snapshot.top_processes, 9);
    }
}
