use crate::pipeline::{RunOptions, DEFAULT_WORKERS};
use crate::pattern::NamingPattern;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub pattern: String,
    pub workers: usize,
    pub dry_run: bool,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pattern: NamingPattern::default().as_str().to_string(),
            workers: DEFAULT_WORKERS,
            dry_run: true,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn run_options(&self, root: impl Into<PathBuf>) -> RunOptions {
        RunOptions {
            root: root.into(),
            pattern: self.pattern.clone(),
            workers: self.workers,
            dry_run: self.dry_run,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("com", "photo-date-renamer", "photo-date-renamer")
        .context("cannot determine the OS configuration directory")?;
    let config_dir = proj.config_dir().to_path_buf();
    Ok(AppPaths {
        config_path: config_dir.join("config.toml"),
        config_dir,
    })
}

pub fn load_config() -> Result<AppConfig> {
    let paths = app_paths()?;
    load_config_from(&paths.config_path)
}

/// Missing files yield the defaults; present files may set any subset of keys.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("cannot read config file: {}", path.display()))?;
    let config = toml::from_str::<AppConfig>(&raw)
        .with_context(|| format!("cannot parse config file: {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::{load_config_from, AppConfig};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let temp = tempdir().expect("tempdir");
        let config = load_config_from(&temp.path().join("config.toml")).expect("load");
        assert_eq!(config, AppConfig::default());
        assert!(config.dry_run);
        assert_eq!(config.workers, 4);
        assert_eq!(config.pattern, "YYYY-MM-DD");
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "pattern = \"YYYY/MM/DD\"\nworkers = 8\n").expect("write");

        let config = load_config_from(&path).expect("load");
        assert_eq!(config.pattern, "YYYY/MM/DD");
        assert_eq!(config.workers, 8);
        assert!(config.dry_run);
        assert_eq!(config.log_level, "info");

        let options = config.run_options("/photos");
        assert_eq!(options.workers, 8);
        assert_eq!(options.root, std::path::PathBuf::from("/photos"));
    }

    #[test]
    fn invalid_file_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "workers = \"many\"").expect("write");

        let err = load_config_from(&path).expect_err("bad type");
        assert!(err.to_string().contains("cannot parse config file"));
    }
}
