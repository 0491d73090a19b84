use thiserror::Error;

/// Top-level error type for the `tcc-api` crate.
///
/// Every failure a caller can observe after the client has spent its
/// re-authentication and backoff budgets. `tcc-core` maps these into
/// coordinator and command diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Credentials rejected, login verification failed, or re-login
    /// after a 401/403 did not produce a usable session.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Too many consecutive failed logins; the portal locks the account
    /// out for a while, so the client refuses to try again until then.
    #[error("Login rate limited -- retry after {retry_after_secs}s")]
    LoginRateLimited { retry_after_secs: u64 },

    // ── Server ──────────────────────────────────────────────────────
    /// Repeated transient failures (5xx, redirects, connection drops)
    /// outlasted the backoff budget.
    #[error("Service unavailable after {attempts} attempts: {message}")]
    Transient {
        message: String,
        status: Option<u16>,
        attempts: u32,
    },

    /// Any other non-success status. Never retried by the client.
    #[error("Request failed (HTTP {status}): {message}")]
    Request { status: u16, message: String },

    /// The portal answered 200 but refused the change (`success != 1`).
    #[error("Request rejected by portal: {message}")]
    Rejected { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error that is not worth retrying (TLS, builder, body).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// TLS setup or client construction failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Lifecycle ───────────────────────────────────────────────────
    /// The client was shut down while the call was in flight or backing off.
    #[error("Request cancelled by shutdown")]
    Cancelled,
}

impl Error {
    /// Returns `true` for authentication-class failures.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::LoginRateLimited { .. }
        )
    }

    /// Returns `true` if the backoff budget was exhausted on server errors.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Returns `true` if the failure came from a shutdown signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// HTTP status associated with the failure, if one was seen.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => Some(*status),
            Self::Transient { status, .. } => *status,
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
