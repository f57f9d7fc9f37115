/// Runtime configuration.
///
/// The only setting is the directory holding the per-city CSV files. It comes
/// from `TRIPSTATS_DATA_DIR` and defaults to the current directory.

use crate::city::RecordStore;
use std::path::PathBuf;

pub const DATA_DIR_ENV: &str = "TRIPSTATS_DATA_DIR";
pub const DEFAULT_DATA_DIR: &str = ".";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
}

impl Config {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Config {
            data_dir: data_dir.into(),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = lookup(DATA_DIR_ENV)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        Config::new(data_dir)
    }

    pub fn record_store(&self) -> RecordStore {
        RecordStore::new(&self.data_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new(DEFAULT_DATA_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_data_dir() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config, Config::default());
        assert_eq!(config.data_dir, PathBuf::from("."));
    }

    #[test]
    fn test_data_dir_from_env() {
        let config = Config::from_lookup(|key| (key == DATA_DIR_ENV).then(|| "/srv/bikeshare".to_string()));
        assert_eq!(config.data_dir, PathBuf::from("/srv/bikeshare"));
        assert_eq!(config.record_store().data_dir(), PathBuf::from("/srv/bikeshare").as_path());
    }

    #[test]
    fn test_blank_env_uses_default() {
        let config = Config::from_lookup(|_| Some("  ".to_string()));
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
    }
}
