//! Layers `PG_EMBED_*` environment variables over a [`Config`].

use std::env::{self, VarError};
use std::time::Duration;

use camino::Utf8PathBuf;
use color_eyre::eyre::eyre;

use super::{Config, PostgresVersion};
use crate::error::{ConfigError, ConfigResult};

const VERSION_ENV: &str = "PG_EMBED_VERSION";
const PORT_ENV: &str = "PG_EMBED_PORT";
const DATABASE_ENV: &str = "PG_EMBED_DATABASE";
const USERNAME_ENV: &str = "PG_EMBED_USERNAME";
const PASSWORD_ENV: &str = "PG_EMBED_PASSWORD";
const RUNTIME_PATH_ENV: &str = "PG_EMBED_RUNTIME_PATH";
const CACHE_DIR_ENV: &str = "PG_EMBED_CACHE_DIR";
const START_TIMEOUT_ENV: &str = "PG_EMBED_START_TIMEOUT_SECS";
const STOP_TIMEOUT_ENV: &str = "PG_EMBED_STOP_TIMEOUT_SECS";
const INIT_TIMEOUT_ENV: &str = "PG_EMBED_INIT_TIMEOUT_SECS";
const MAX_TIMEOUT_SECS: u64 = 600;

impl Config {
    /// Builds the default configuration and applies `PG_EMBED_*` overrides.
    ///
    /// Recognised variables: `PG_EMBED_VERSION`, `PG_EMBED_PORT`,
    /// `PG_EMBED_DATABASE`, `PG_EMBED_USERNAME`, `PG_EMBED_PASSWORD`,
    /// `PG_EMBED_RUNTIME_PATH`, `PG_EMBED_CACHE_DIR`,
    /// `PG_EMBED_START_TIMEOUT_SECS`, `PG_EMBED_STOP_TIMEOUT_SECS`, and
    /// `PG_EMBED_INIT_TIMEOUT_SECS`.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] naming the variable when a value is empty,
    /// not valid UTF-8, not numeric where a number is expected, or outside
    /// the accepted range.
    pub fn from_env() -> ConfigResult<Self> {
        Self::default().with_env_overrides()
    }

    /// Applies `PG_EMBED_*` overrides on top of this configuration.
    ///
    /// # Errors
    /// See [`Config::from_env`].
    pub fn with_env_overrides(self) -> ConfigResult<Self> {
        let mut config = self;
        if let Some(version) = read_var(VERSION_ENV)? {
            config = config.with_version(PostgresVersion::new(version));
        }
        if let Some(port) = read_var(PORT_ENV)? {
            config = config.with_port(parse_port(&port)?);
        }
        if let Some(database) = read_var(DATABASE_ENV)? {
            config = config.with_database(database);
        }
        if let Some(username) = read_var(USERNAME_ENV)? {
            config = config.with_username(username);
        }
        if let Some(password) = read_var(PASSWORD_ENV)? {
            config = config.with_password(password);
        }
        if let Some(path) = read_var(RUNTIME_PATH_ENV)? {
            config = config.with_runtime_path(Utf8PathBuf::from(path));
        }
        if let Some(path) = read_var(CACHE_DIR_ENV)? {
            config = config.with_cache_dir(Utf8PathBuf::from(path));
        }
        if let Some(raw) = read_var(START_TIMEOUT_ENV)? {
            config = config.with_start_timeout(parse_timeout(START_TIMEOUT_ENV, &raw)?);
        }
        if let Some(raw) = read_var(STOP_TIMEOUT_ENV)? {
            config = config.with_stop_timeout(parse_timeout(STOP_TIMEOUT_ENV, &raw)?);
        }
        if let Some(raw) = read_var(INIT_TIMEOUT_ENV)? {
            config = config.with_init_timeout(parse_timeout(INIT_TIMEOUT_ENV, &raw)?);
        }
        Ok(config)
    }
}

fn read_var(name: &str) -> ConfigResult<Option<String>> {
    match env::var(name) {
        Ok(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(ConfigError::from(eyre!("{name} is present but empty")));
            }
            Ok(Some(trimmed.to_owned()))
        }
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(value)) => Err(ConfigError::from(eyre!(
            "{name} must contain a valid UTF-8 value (received {value:?})"
        ))),
    }
}

fn parse_port(raw: &str) -> ConfigResult<u16> {
    let port: u16 = raw.parse().map_err(|err| {
        ConfigError::from(eyre!("failed to parse {PORT_ENV} from '{raw}': {err}"))
    })?;
    if port == 0 {
        return Err(ConfigError::from(eyre!(
            "{PORT_ENV} must name a fixed port (received 0)"
        )));
    }
    Ok(port)
}

fn parse_timeout(name: &str, raw: &str) -> ConfigResult<Duration> {
    let seconds: u64 = raw
        .parse()
        .map_err(|err| ConfigError::from(eyre!("failed to parse {name} from '{raw}': {err}")))?;

    if seconds == 0 {
        return Err(ConfigError::from(eyre!(
            "{name} must be at least 1 second (received {raw})"
        )));
    }

    if seconds > MAX_TIMEOUT_SECS {
        return Err(ConfigError::from(eyre!(
            "{name} must be {MAX_TIMEOUT_SECS} seconds or less (received {raw})"
        )));
    }

    Ok(Duration::from_secs(seconds))
}
