//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use tcc_config::ConfigError;
use tcc_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Portal unavailable: {message}")]
    #[diagnostic(
        code(tcc::unavailable),
        help("The portal is failing intermittently. Try again in a few minutes.")
    )]
    Unavailable { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(tcc::auth_failed),
        help(
            "Check the username and password of the profile.\n\
             Three failed logins in a row block further attempts for 10 minutes."
        )
    )]
    AuthFailed { message: String },

    #[error("No password configured for profile '{profile}'")]
    #[diagnostic(
        code(tcc::no_credentials),
        help("Set `password_env` or `password` in the profile, or store it in the keyring as tcc/{profile}/password.")
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("Device {device_id} not found")]
    #[diagnostic(code(tcc::not_found), help("Run: tcc locations"))]
    DeviceNotFound { device_id: u64 },

    #[error("No thermostats found")]
    #[diagnostic(
        code(tcc::no_devices),
        help("Check the `devices` filter of the profile, or run: tcc locations")
    )]
    NoDevices,

    // ── Commands ─────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(tcc::invalid_command))]
    InvalidCommand { message: String },

    #[error("Command not applied after {attempts} attempt(s): {message}")]
    #[diagnostic(code(tcc::command_failed))]
    CommandFailed { attempts: u32, message: String },

    #[error("API error: {message}")]
    #[diagnostic(code(tcc::api_error))]
    Api { message: String },

    #[error("Interrupted")]
    #[diagnostic(code(tcc::cancelled))]
    Cancelled,

    // ── Configuration ────────────────────────────────────────────────
    #[error("No profiles configured")]
    #[diagnostic(
        code(tcc::no_config),
        help(
            "Add a [profiles.<name>] table with `username` and a password source.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(tcc::config))]
    Config(ConfigError),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Unavailable { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::DeviceNotFound { .. } | Self::NoDevices => exit_code::NOT_FOUND,
            Self::InvalidCommand { .. } | Self::NoConfig { .. } | Self::Config(_) => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::NoProfiles => Self::NoConfig {
                path: tcc_config::config_path().display().to_string(),
            },
            other => Self::Config(other),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::Unavailable { message } => Self::Unavailable { message },
            CoreError::Cancelled => Self::Cancelled,
            CoreError::NoDevices => Self::NoDevices,
            CoreError::DeviceNotFound { device_id } => Self::DeviceNotFound { device_id },
            CoreError::Validation { message } => Self::InvalidCommand { message },
            CoreError::Command { attempts, source } => Self::CommandFailed {
                attempts,
                message: source.to_string(),
            },
            CoreError::Api { message, .. } | CoreError::Config { message } => {
                Self::Api { message }
            }
        }
    }
}
