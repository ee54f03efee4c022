use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use crate::constants::{self, config::keys};
use crate::util::error::{ConfigError, Result, WatchError};

/// directory holding the config files and the log.
/// `override_dir` comes from the command line and wins if given.
pub fn config_dir(override_dir: Option<PathBuf>) -> Option<PathBuf> {
    override_dir.or_else(|| {
        let mut path = dirs_next::config_dir()?;
        path.push(constants::APP_DIR_NAME);
        Some(path)
    })
}

/// parsed config file, a json object with string keys
#[derive(Debug, Clone)]
pub struct Config {
    path: PathBuf,
    values: Map<String, Value>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let value: Value = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        match value {
            Value::Object(values) => Ok(Self { path: path.to_path_buf(), values }),
            _ => Err(ConfigError::NotAnObject(path.to_path_buf())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// fails on the first key of `keys` that is absent or null
    pub fn require(&self, keys: &[&str]) -> Result<(), ConfigError> {
        match keys.iter().find(|key| self.value(key).is_none()) {
            Some(key) => Err(ConfigError::MissingKey((*key).to_string())),
            None => Ok(()),
        }
    }

    /// `default` if the key is absent, an error only if it is present with the wrong type
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        let Some(value) = self.value(key) else {
            return Ok(default);
        };
        serde_json::from_value(value.clone()).map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            expected: std::any::type_name::<T>().to_string(),
        })
    }

    /// booleans, or numbers where anything but zero is true
    pub fn flag(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.value(key) {
            None => Ok(default),
            Some(Value::Bool(flag)) => Ok(*flag),
            Some(Value::Number(number)) => Ok(number.as_f64() != Some(0.0)),
            Some(_) => Err(ConfigError::InvalidValue { key: key.to_string(), expected: "a boolean".to_string() }),
        }
    }

    /// strings as they are, integers converted. used for ids which come in both forms.
    pub fn text(&self, key: &str) -> Result<String, ConfigError> {
        match self.value(key) {
            None => Err(ConfigError::MissingKey(key.to_string())),
            Some(Value::String(text)) => Ok(text.clone()),
            Some(Value::Number(number)) if number.is_u64() || number.is_i64() => Ok(number.to_string()),
            Some(_) => Err(ConfigError::InvalidValue { key: key.to_string(), expected: "a string or an integer".to_string() }),
        }
    }

    /// null counts as absent
    fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|value| !value.is_null())
    }
}

#[cfg(test)]
impl Config {
    pub fn from_json(values: Value) -> Self {
        let Value::Object(values) = values else {
            panic!("test config must be a json object");
        };
        Self { path: PathBuf::from("test.json"), values }
    }
}

/// immutable settings shared by all watchers, built once per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    pub hub_ip: String,
    pub username: String,
    pub group: String,
    pub verbose: bool,
    pub check_delay: Duration,
    pub offset_minutes: i64,
}

impl WatcherConfig {
    /// checks required keys first, so nothing else is read from a config that would fail anyway
    pub fn from_config(config: &Config) -> Result<Self> {
        use constants::config::*;

        config.require(&keys::REQUIRED)?;

        let check_delay_seconds = config.get_or(keys::CHECK_DELAY, DEFAULT_CHECK_DELAY.as_secs())?;
        if check_delay_seconds == 0 {
            return Err(WatchError::Validation(format!(
                "Delay ({}) must be at least 1 second, {check_delay_seconds} found", keys::CHECK_DELAY
            )));
        }

        let offset_minutes = config.get_or(keys::OFFSET_MINUTES, DEFAULT_OFFSET_MINUTES)?;
        if !(-MAX_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&offset_minutes) {
            return Err(WatchError::Validation(format!(
                "Offset ({}) must be between -{MAX_OFFSET_MINUTES} and {MAX_OFFSET_MINUTES}, {offset_minutes} found",
                keys::OFFSET_MINUTES
            )));
        }

        Ok(Self {
            hub_ip: config.text(keys::HUB_IP)?,
            username: config.text(keys::USERNAME)?,
            group: config.text(keys::GROUP)?,
            verbose: config.flag(keys::VERBOSE, false)?,
            check_delay: Duration::from_secs(check_delay_seconds),
            offset_minutes,
        })
    }
}
