use crate::errors::ConfigError;
use std::{env, path::PathBuf};

const PORT_VAR: &str = "PORT";
const DATA_PATH_VAR: &str = "APP_DATA_PATH";
const CREDENTIAL_PATH_VAR: &str = "APP_CREDENTIAL_PATH";
const ANONYMOUS_AUTH_VAR: &str = "APP_ANONYMOUS_AUTH";

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_PATH: &str = "data/journal.json";
const DEFAULT_CREDENTIAL_PATH: &str = "data/credential.json";

#[derive(Debug, Clone)]
pub struct JournalConfig {
    pub port: u16,
    pub store: StoreConfig,
    pub identity: IdentityConfig,
}

/// Where the document database keeps its data.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub data_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub credential_path: PathBuf,
    pub allow_anonymous: bool,
}

impl JournalConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = env::var(PORT_VAR)
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let data_path = env::var(DATA_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_PATH));

        let credential_path = env::var(CREDENTIAL_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CREDENTIAL_PATH));

        let allow_anonymous = match env::var(ANONYMOUS_AUTH_VAR) {
            Ok(value) => parse_flag(ANONYMOUS_AUTH_VAR, &value)?,
            Err(_) => true,
        };

        Ok(Self {
            port,
            store: StoreConfig { data_path },
            identity: IdentityConfig {
                credential_path,
                allow_anonymous,
            },
        })
    }
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name,
            value: value.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_spellings() {
        assert!(parse_flag("X", "true").unwrap());
        assert!(parse_flag("X", " ON ").unwrap());
        assert!(!parse_flag("X", "0").unwrap());
        assert!(!parse_flag("X", "False").unwrap());
    }

    #[test]
    fn flags_reject_garbage() {
        let err = parse_flag("APP_ANONYMOUS_AUTH", "maybe").unwrap_err();
        assert_eq!(
            err.to_string(),
            "APP_ANONYMOUS_AUTH must be a boolean, got 'maybe'"
        );
    }
}
