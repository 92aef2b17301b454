use crate::core::fraud::FraudConfig;
use crate::errors::{AppError, AppResult};
use crate::models::work_location::WorkLocation;
use crate::utils::path::expand_tilde;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_directory_file")]
    pub directory_file: String,
    #[serde(default = "default_work_location")]
    pub default_work_location: String,
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_flagged_list_limit")]
    pub flagged_list_limit: usize,
    #[serde(default)]
    pub fraud: FraudConfig,
}

fn default_database() -> String {
    Config::database_file().to_string_lossy().to_string()
}
fn default_directory_file() -> String {
    Config::directory_path().to_string_lossy().to_string()
}
fn default_work_location() -> String {
    "office".to_string()
}
fn default_lock_timeout_ms() -> u64 {
    10_000
}
fn default_busy_timeout_ms() -> u64 {
    5_000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_flagged_list_limit() -> usize {
    50
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
            directory_file: default_directory_file(),
            default_work_location: default_work_location(),
            lock_timeout_ms: default_lock_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            log_level: default_log_level(),
            flagged_list_limit: default_flagged_list_limit(),
            fraud: FraudConfig::default(),
        }
    }
}

impl Config {
    /// Return the standard configuration directory depending on the platform
    pub fn config_dir() -> PathBuf {
        if cfg!(target_os = "windows") {
            let appdata = env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(appdata).join("rattendance")
        } else {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".rattendance")
        }
    }

    /// Return the full path of the config file
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("rattendance.conf")
    }

    /// Return the full path of the SQLite database
    pub fn database_file() -> PathBuf {
        Self::config_dir().join("rattendance.sqlite")
    }

    /// Return the full path of the entity/department directory
    pub fn directory_path() -> PathBuf {
        Self::config_dir().join("directory.yaml")
    }

    /// Load configuration from file, or return defaults if not found
    pub fn load() -> AppResult<Self> {
        let path = Self::config_file();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "cannot read configuration");
            AppError::ConfigLoad
        })?;
        let cfg: Config = serde_yaml::from_str(&content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> AppResult<()> {
        self.work_location()?;
        self.fraud.validate()?;
        if self.lock_timeout_ms == 0 {
            return Err(AppError::Config("lock_timeout_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn work_location(&self) -> AppResult<WorkLocation> {
        WorkLocation::from_code(&self.default_work_location).ok_or_else(|| {
            AppError::Config(format!(
                "default_work_location must be office, remote or field (got '{}')",
                self.default_work_location
            ))
        })
    }

    /// Apply the global `--db` / `--directory` overrides.
    pub fn with_overrides(mut self, db: Option<&str>, directory: Option<&str>) -> Self {
        if let Some(db) = db {
            self.database = resolve_in_config_dir(db);
        }
        if let Some(dir) = directory {
            self.directory_file = resolve_in_config_dir(dir);
        }
        self
    }

    pub fn save(&self) -> AppResult<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::create_dir_all(Self::config_dir())?;
        let mut file = fs::File::create(Self::config_file()).map_err(|e| {
            tracing::error!(error = %e, "cannot write configuration");
            AppError::ConfigSave
        })?;
        file.write_all(yaml.as_bytes())?;
        Ok(())
    }

    /// Initialize configuration and database files
    pub fn init_all(custom_name: Option<String>, is_test: bool) -> AppResult<Self> {
        let dir = Self::config_dir();
        fs::create_dir_all(&dir)?;

        // DB name: user provided or default
        let database = match custom_name {
            Some(name) => resolve_in_config_dir(&name),
            None => default_database(),
        };

        let config = Config {
            database,
            ..Config::default()
        };

        if !is_test {
            config.save()?;
            println!("✅ Config file: {:?}", Self::config_file());
        }

        println!("✅ Database:    {:?}", config.database);

        Ok(config)
    }
}

/// Absolute paths and `~/` paths are kept, bare names land in the config dir.
fn resolve_in_config_dir(name: &str) -> String {
    let p = expand_tilde(name);
    if p.is_absolute() {
        p.to_string_lossy().to_string()
    } else {
        Config::config_dir().join(p).to_string_lossy().to_string()
    }
}
