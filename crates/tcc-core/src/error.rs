// ── Core error types ──
//
// What hosts see from `tcc-core`. Fetch failures never surface here:
// the coordinator absorbs them into its `PollOutcome`. Commands and
// account setup do fail, and `From<tcc_api::Error>` translates the
// client's failures into domain variants.

use thiserror::Error;

use crate::model::DeviceId;

#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Portal unavailable: {message}")]
    Unavailable { message: String },

    #[error("Shutting down")]
    Cancelled,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("No thermostats found on the account")]
    NoDevices,

    #[error("Device not found: {device_id}")]
    DeviceNotFound { device_id: DeviceId },

    // ── Command errors ───────────────────────────────────────────────
    #[error("Invalid command: {message}")]
    Validation { message: String },

    /// The command retry budget ran out. `source` is the last failure.
    #[error("Command failed after {attempts} attempt(s): {source}")]
    Command {
        attempts: u32,
        #[source]
        source: tcc_api::Error,
    },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// The underlying client error of a failed command, if any.
    pub fn api_source(&self) -> Option<&tcc_api::Error> {
        match self {
            Self::Command { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ── Conversion from client errors ────────────────────────────────────

impl From<tcc_api::Error> for CoreError {
    fn from(err: tcc_api::Error) -> Self {
        match err {
            tcc_api::Error::Authentication { message } => Self::AuthenticationFailed { message },
            tcc_api::Error::LoginRateLimited { retry_after_secs } => Self::AuthenticationFailed {
                message: format!("too many failed logins, retry in {retry_after_secs}s"),
            },
            e @ tcc_api::Error::Transient { .. } => Self::Unavailable {
                message: e.to_string(),
            },
            tcc_api::Error::Transport(e) => Self::Unavailable {
                message: e.to_string(),
            },
            tcc_api::Error::Request { status, message } => Self::Api {
                message,
                status: Some(status),
            },
            tcc_api::Error::Rejected { message } | tcc_api::Error::Deserialization { message, .. } => {
                Self::Api {
                    message,
                    status: None,
                }
            }
            tcc_api::Error::Tls(message) => Self::Config { message },
            tcc_api::Error::InvalidUrl(e) => Self::Config {
                message: format!("invalid portal URL: {e}"),
            },
            tcc_api::Error::Cancelled => Self::Cancelled,
        }
    }
}
