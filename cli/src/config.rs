use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

const DB_ENV: &str = "KCAL_DB";
const ESTIMATOR_URL_ENV: &str = "KCAL_ESTIMATOR_URL";

pub struct Config {
    pub db_path: PathBuf,
    pub estimator_url: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "kcal").context("Could not determine home directory")?;

        let config = Self::resolve(
            proj_dirs.data_dir().to_path_buf(),
            std::env::var_os(DB_ENV).map(PathBuf::from),
            std::env::var(ESTIMATOR_URL_ENV).ok(),
        );

        if let Some(parent) = config.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create data directory: {}", parent.display())
            })?;
        }
        log::debug!("database path: {}", config.db_path.display());

        Ok(config)
    }

    fn resolve(
        data_dir: PathBuf,
        db_override: Option<PathBuf>,
        estimator_url: Option<String>,
    ) -> Self {
        let db_path = db_override
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| data_dir.join("kcal.db"));
        let estimator_url = estimator_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        Config {
            db_path,
            estimator_url,
        }
    }

    pub fn require_estimator_url(&self) -> Result<&str> {
        self.estimator_url
            .as_deref()
            .with_context(|| format!("No estimator configured. Set {ESTIMATOR_URL_ENV} to its URL"))
    }
}
