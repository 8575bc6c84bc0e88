use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::storage::{EngineOptions, SyncMode};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipestoreConfig {
    pub database: Option<String>,
    pub busy_timeout_ms: Option<u64>,
    pub sync_mode: Option<SyncMode>,
}

impl PipestoreConfig {
    /// Engine options with defaults for anything unset
    pub fn engine_options(&self) -> EngineOptions {
        let defaults = EngineOptions::default();
        EngineOptions {
            busy_timeout: self
                .busy_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.busy_timeout),
            sync_mode: self.sync_mode.unwrap_or(defaults.sync_mode),
        }
    }

    /// Database path, relative paths resolved against `base`
    pub fn database_path_in(&self, base: &Path) -> PathBuf {
        match &self.database {
            Some(db) => base.join(db),
            None => default_database_path_in(base),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("pipestore.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".pipestore").join("pipestore.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<PipestoreConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: PipestoreConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &PipestoreConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_is_none() {
        let dir = TempDir::new().unwrap();
        let loaded = load_config(Some(&dir.path().join("nope.toml"))).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_write_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pipestore.toml");
        let config = PipestoreConfig {
            database: Some("data/p.db".to_string()),
            busy_timeout_ms: Some(250),
            sync_mode: Some(SyncMode::Normal),
        };
        write_config(&path, &config, false).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        let options = loaded.engine_options();
        assert_eq!(options.busy_timeout, Duration::from_millis(250));
        assert_eq!(options.sync_mode, SyncMode::Normal);
        assert_eq!(loaded.database_path_in(dir.path()), dir.path().join("data/p.db"));

        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();
    }

    #[test]
    fn test_defaults() {
        let config: PipestoreConfig = toml::from_str("").unwrap();
        let options = config.engine_options();
        assert_eq!(options.sync_mode, SyncMode::Full);
        assert_eq!(options.busy_timeout, Duration::from_millis(5_000));
        assert_eq!(
            config.database_path_in(Path::new("/srv")),
            PathBuf::from("/srv/.pipestore/pipestore.db")
        );
    }
}
