/*!
Sidecar configuration, read from the TOML file named by `ACADEMYD_CONFIG`.
*/
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_ENV: &str = "ACADEMYD_CONFIG";

const DEFAULT_MANAGER_PASSWORD: &str = "admin";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Deserialize)]
struct ConfigFile {
    log_level: Option<String>,
    default_manager_username: Option<String>,
    default_manager_password: Option<String>,
    default_manager_full_name: Option<String>,
    default_branch: Option<String>,
    pbkdf2_iterations: Option<u32>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub log_level: String,
    pub default_manager_username: String,
    pub default_manager_password: String,
    pub default_manager_full_name: String,
    pub default_branch: String,
    pub pbkdf2_iterations: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            default_manager_username: "admin".to_owned(),
            default_manager_password: DEFAULT_MANAGER_PASSWORD.to_owned(),
            default_manager_full_name: "Center Manager".to_owned(),
            default_branch: "main".to_owned(),
            pbkdf2_iterations: 100_000,
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        let cf: ConfigFile = toml::from_str(s)?;
        let mut c = Self::default();

        if let Some(s) = cf.log_level {
            c.log_level = s;
        }
        if let Some(s) = cf.default_manager_username {
            c.default_manager_username = s;
        }
        if let Some(s) = cf.default_manager_password {
            c.default_manager_password = s;
        }
        if let Some(s) = cf.default_manager_full_name {
            c.default_manager_full_name = s;
        }
        if let Some(s) = cf.default_branch {
            c.default_branch = s;
        }
        if let Some(n) = cf.pbkdf2_iterations {
            c.pbkdf2_iterations = n.max(1);
        }

        Ok(c)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// True while the seeded manager would get the built-in password.
    pub fn uses_default_manager_password(&self) -> bool {
        self.default_manager_password == DEFAULT_MANAGER_PASSWORD
    }

    /// Loads the file named by `ACADEMYD_CONFIG`, or the defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Self::from_file(PathBuf::from(path)),
            _ => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let c = Config::from_toml_str("").expect("parse");
        assert_eq!(c.default_manager_username, "admin");
        assert_eq!(c.pbkdf2_iterations, 100_000);
        assert_eq!(c.log_level, "info");
    }

    #[test]
    fn fields_override_defaults() {
        let c = Config::from_toml_str(
            r#"
            log_level = "debug"
            default_manager_username = "director"
            default_branch = "east"
            pbkdf2_iterations = 0
            "#,
        )
        .expect("parse");
        assert_eq!(c.log_level, "debug");
        assert_eq!(c.default_manager_username, "director");
        assert_eq!(c.default_manager_password, "admin");
        assert_eq!(c.default_branch, "east");
        assert_eq!(c.pbkdf2_iterations, 1);
    }

    #[test]
    fn built_in_manager_password_is_flagged() {
        assert!(Config::default().uses_default_manager_password());
        let c = Config::from_toml_str("default_manager_password = \"s3cret\"").expect("parse");
        assert!(!c.uses_default_manager_password());
    }

    #[test]
    fn wrong_types_are_rejected() {
        assert!(Config::from_toml_str("pbkdf2_iterations = \"many\"").is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Config::from_file("/definitely/not/here.toml").expect_err("missing");
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
