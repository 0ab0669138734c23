use log::{info, warn};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("environment variable {0} must be set for the google backend")]
    Missing(&'static str),

    #[error("unknown sheet backend {0:?}, expected \"local\" or \"google\"")]
    UnknownBackend(String),
}

/// Target and credentials for the hosted spreadsheet
#[derive(Clone, PartialEq)]
pub struct GoogleConfig {
    pub spreadsheet_id: String,
    pub worksheet: String,
    /// Service-account key file contents (JSON)
    pub credentials: String,
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("worksheet", &self.worksheet)
            .field("credentials", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Backend {
    /// Grid saved to `sheet_file`
    Local { sheet_file: PathBuf },
    Google(GoogleConfig),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind_address: String,
    pub backend: Backend,
    pub state_file: PathBuf,
    pub backup_dir: PathBuf,
    pub static_dir: PathBuf,
    pub admin_username: String,
    pub admin_password: String,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key/value source
    ///
    /// # Arguments
    /// * `lookup` - Returns the value of a variable, or None when unset
    ///
    /// # Returns
    /// * `Result<Config, ConfigError>` - The configuration, or an error
    ///
    /// # Errors
    /// * Returns an error for an unknown backend name
    /// * Returns an error if a variable required by the Google backend is missing
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or_default = |key: &str, default: &str| {
            lookup(key).unwrap_or_else(|| {
                info!("{key} not set, using default: {default}");
                default.to_string()
            })
        };

        let backend = match or_default("FEEDBACK_BACKEND", "local").to_lowercase().as_str() {
            "local" => Backend::Local {
                sheet_file: or_default("FEEDBACK_SHEET_FILE", "database/sheet.bin.gz").into(),
            },
            "google" => {
                let required = |key: &'static str| {
                    lookup(key)
                        .filter(|v| !v.trim().is_empty())
                        .ok_or(ConfigError::Missing(key))
                };
                Backend::Google(GoogleConfig {
                    spreadsheet_id: required("GOOGLE_SPREADSHEET_ID")?,
                    credentials: required("GOOGLE_CREDENTIALS")?,
                    worksheet: or_default("GOOGLE_WORKSHEET", "Sheet1"),
                })
            }
            other => return Err(ConfigError::UnknownBackend(other.to_string())),
        };

        let admin_password = lookup("FEEDBACK_ADMIN_PASSWORD").unwrap_or_else(|| {
            warn!("FEEDBACK_ADMIN_PASSWORD not set, using the built-in admin password");
            "mess123".to_string()
        });

        Ok(Config {
            bind_address: or_default("FEEDBACK_BIND", "127.0.0.1:3000"),
            backend,
            state_file: or_default("FEEDBACK_STATE_FILE", "database/window.json").into(),
            backup_dir: or_default("FEEDBACK_BACKUP_DIR", "backups").into(),
            static_dir: or_default("FEEDBACK_STATIC_DIR", "static").into(),
            admin_username: or_default("FEEDBACK_ADMIN_USER", "admin"),
            admin_password,
        })
    }
}
