use std::path::PathBuf;
use std::str::FromStr;

use crate::auth::jwt::JwtConfig;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Where uploaded files go and how they are addressed.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory for [`LocalStorage`](crate::storage::LocalStorage).
    pub dir: PathBuf,
    /// Prefix of the public URL returned for stored objects.
    pub public_base_url: String,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: usize,
}

/// Server configuration loaded from environment variables.
///
/// Every field has a development default except `JWT_SECRET`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// How often the outbox dispatcher polls for due emails.
    pub outbox_poll_secs: u64,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
}

/// Default upload limit: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                  |
    /// |--------------------------|--------------------------|
    /// | `HOST`                   | `0.0.0.0`                |
    /// | `PORT`                   | `3000`                   |
    /// | `CORS_ORIGINS`           | `http://localhost:5173`  |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                     |
    /// | `OUTBOX_POLL_SECS`       | `5`                      |
    /// | `STORAGE_DIR`            | `storage`                |
    /// | `PUBLIC_BASE_URL`        | `http://localhost:3000/files` |
    /// | `MAX_UPLOAD_BYTES`       | `10485760`               |
    ///
    /// JWT settings are read by [`JwtConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env_or("HOST", "0.0.0.0");
        let port = parse_env("PORT", 3000u16)?;

        let cors_origins: Vec<String> = env_or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = parse_env("REQUEST_TIMEOUT_SECS", 30u64)?;
        let outbox_poll_secs = parse_env("OUTBOX_POLL_SECS", 5u64)?;

        let storage = StorageConfig {
            dir: PathBuf::from(env_or("STORAGE_DIR", "storage")),
            public_base_url: env_or("PUBLIC_BASE_URL", "http://localhost:3000/files")
                .trim_end_matches('/')
                .to_string(),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            outbox_poll_secs,
            jwt: JwtConfig::from_env()?,
            storage,
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Parse `name` if set, otherwise return `default`.
pub(crate) fn parse_env<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_variable_uses_default() {
        let value: u64 = parse_env("CREWLINE_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn unparsable_variable_is_reported() {
        std::env::set_var("CREWLINE_TEST_BAD_PORT", "eighty");
        let err = parse_env::<u16>("CREWLINE_TEST_BAD_PORT", 80).unwrap_err();
        assert_eq!(
            err.to_string(),
            "CREWLINE_TEST_BAD_PORT has an invalid value 'eighty'"
        );
    }
}
