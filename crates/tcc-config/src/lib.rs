//! Configuration for the tcc tools.
//!
//! TOML profiles merged with `TCC_` environment overrides, credential
//! resolution (env var, keyring, plaintext) and translation into
//! `tcc_core::AccountConfig`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tcc_core::{AccountConfig, AwaySetpoints, Credentials, RetryPolicy};

const KEYRING_SERVICE: &str = "tcc";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("no profiles configured")]
    NoProfiles,

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    /// "table" or "json".
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}

/// One portal account.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    pub username: String,

    /// Password (plaintext, prefer `password_env` or the keyring).
    pub password: Option<String>,

    /// Environment variable holding the password.
    pub password_env: Option<String>,

    /// Portal root, for testing against a stand-in.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Manage only these device ids.
    pub devices: Option<Vec<u64>>,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Consecutive failed fetches before a device is reported unavailable.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub fetch_retry: FetchRetry,

    #[serde(default)]
    pub command_retry: CommandRetry,

    #[serde(default)]
    pub away: Away,
}

fn default_base_url() -> String {
    tcc_core::DEFAULT_BASE_URL.into()
}
fn default_poll_interval() -> u64 {
    30
}
fn default_failure_threshold() -> u32 {
    tcc_core::DEFAULT_FAILURE_THRESHOLD
}
fn default_timeout() -> u64 {
    30
}

/// Client-level retry budget for every portal call.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchRetry {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_reauth_attempts: u32,
}

impl Default for FetchRetry {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            multiplier: 2.0,
            max_reauth_attempts: 1,
        }
    }
}

/// Command-level retry budget, applied on top of [`FetchRetry`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CommandRetry {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for CommandRetry {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 1000,
            multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Away {
    pub heat_setpoint: f64,
    pub cool_setpoint: f64,
}

impl Default for Away {
    fn default() -> Self {
        let away = AwaySetpoints::default();
        Self {
            heat_setpoint: away.heat,
            cool_setpoint: away.cool,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "tcc", "tcc").map_or_else(
        || PathBuf::from(".tcc").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from the default path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path` plus `TCC_` environment overrides.
///
/// A missing file is not an error; nested keys are separated by `__`
/// (`TCC_PROFILES__HOME__USERNAME`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("TCC_").split("__"))
        .extract()?;
    Ok(config)
}

/// Render the config as TOML with plaintext passwords masked.
pub fn render_config(config: &Config) -> Result<String, ConfigError> {
    let mut redacted = config.clone();
    for profile in redacted.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some("********".into());
        }
    }
    Ok(toml::to_string_pretty(&redacted)?)
}

// ── Profile selection ───────────────────────────────────────────────

/// Pick the named profile, else the default, else the only one.
pub fn select_profile<'a>(
    config: &'a Config,
    name: Option<&str>,
) -> Result<(&'a str, &'a Profile), ConfigError> {
    let wanted = name.or(config.default_profile.as_deref());

    if let Some(wanted) = wanted {
        if let Some((name, profile)) = config.profiles.get_key_value(wanted) {
            return Ok((name.as_str(), profile));
        }
        // An explicit default that doesn't exist is only an error when asked for.
        if name.is_some() || config.profiles.len() != 1 {
            return Err(if config.profiles.is_empty() {
                ConfigError::NoProfiles
            } else {
                ConfigError::UnknownProfile {
                    name: wanted.into(),
                }
            });
        }
    }

    config
        .profiles
        .iter()
        .next()
        .map(|(name, profile)| (name.as_str(), profile))
        .ok_or(ConfigError::NoProfiles)
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the password: `password_env`, then the system keyring, then
/// the plaintext `password`.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    resolve_password_with(profile, profile_name, |account| {
        keyring::Entry::new(KEYRING_SERVICE, account)
            .and_then(|entry| entry.get_password())
            .ok()
    })
}

fn resolve_password_with(
    profile: &Profile,
    profile_name: &str,
    keyring_lookup: impl FnOnce(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Env var named by the profile
    if let Some(env_name) = &profile.password_env {
        if let Ok(pw) = std::env::var(env_name) {
            return Ok(SecretString::from(pw));
        }
    }

    // 2. Keyring
    if let Some(pw) = keyring_lookup(&format!("{profile_name}/password")) {
        return Ok(SecretString::from(pw));
    }

    // 3. Plaintext in config
    if let Some(pw) = &profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

// ── Translation ─────────────────────────────────────────────────────

/// Build an `AccountConfig` from a profile, resolving its password.
pub fn profile_to_account_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<AccountConfig, ConfigError> {
    let password = resolve_password(profile, profile_name)?;
    build_account_config(profile, password)
}

fn build_account_config(
    profile: &Profile,
    password: SecretString,
) -> Result<AccountConfig, ConfigError> {
    let username = profile.username.trim();
    if username.is_empty() {
        return Err(invalid("username", "must not be empty"));
    }

    let base_url: url::Url = profile
        .base_url
        .parse()
        .map_err(|e| invalid("base_url", format!("{e}: {}", profile.base_url)))?;

    if profile.poll_interval_secs == 0 {
        return Err(invalid("poll_interval_secs", "must be at least 1"));
    }
    if profile.failure_threshold == 0 {
        return Err(invalid("failure_threshold", "must be at least 1"));
    }
    if profile.timeout_secs == 0 {
        return Err(invalid("timeout_secs", "must be at least 1"));
    }
    check_multiplier("fetch_retry.multiplier", profile.fetch_retry.multiplier)?;
    check_multiplier("command_retry.multiplier", profile.command_retry.multiplier)?;
    if profile.away.heat_setpoint > profile.away.cool_setpoint {
        return Err(invalid(
            "away",
            format!(
                "heat_setpoint {} is above cool_setpoint {}",
                profile.away.heat_setpoint, profile.away.cool_setpoint
            ),
        ));
    }

    let fetch = &profile.fetch_retry;
    let command = &profile.command_retry;

    let mut config = AccountConfig::new(Credentials::new(username, password))
        .map_err(|e| invalid("base_url", e.to_string()))?;
    config.base_url = base_url;
    config.timeout = Duration::from_secs(profile.timeout_secs);
    config.poll_interval = Duration::from_secs(profile.poll_interval_secs);
    config.failure_threshold = profile.failure_threshold;
    config.fetch_retry = RetryPolicy::default()
        .with_max_retries(fetch.max_retries)
        .with_backoff(Duration::from_millis(fetch.base_delay_ms), fetch.multiplier)
        .with_max_reauth_attempts(fetch.max_reauth_attempts);
    config.command_retry = RetryPolicy::for_commands()
        .with_max_retries(command.max_retries)
        .with_backoff(Duration::from_millis(command.base_delay_ms), command.multiplier);
    config.away = AwaySetpoints {
        heat: profile.away.heat_setpoint,
        cool: profile.away.cool_setpoint,
    };
    config.devices.clone_from(&profile.devices);
    Ok(config)
}

fn check_multiplier(field: &str, multiplier: f64) -> Result<(), ConfigError> {
    if multiplier.is_finite() && multiplier >= 1.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be a number >= 1.0, got {multiplier}")))
    }
}
