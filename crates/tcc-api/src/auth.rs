// Portal authentication
//
// Form login followed by a verification fetch of the portal root. The
// login response sets the forms-auth cookie; the verification response
// proves the portal accepts it. A blank auth cookie on the verification
// response, expired or not, means the portal is half-down and is treated
// as a failed login.

use std::time::Duration;

use chrono::{TimeDelta, Utc};
use reqwest::Method;
use secrecy::ExposeSecret;
use tracing::{debug, error, info};

use crate::client::TccClient;
use crate::error::Error;
use crate::session::Session;

/// Consecutive failed logins before the client stops trying.
pub const MAX_LOGIN_ATTEMPTS: u32 = 3;

/// How long logins stay blocked after [`MAX_LOGIN_ATTEMPTS`] failures.
pub const LOGIN_LOCKOUT: Duration = Duration::from_secs(10 * 60);

const LOGIN_PATH: &str = "/portal";

impl TccClient {
    /// Log in with the configured credentials, replacing any session.
    pub async fn login(&self) -> Result<(), Error> {
        let mut session = self.lock_session().await?;
        self.login_locked(&mut session).await
    }

    /// Log in while already holding the session.
    pub(crate) async fn login_locked(&self, session: &mut Session) -> Result<(), Error> {
        let now = Utc::now();
        if let Some(wait) = session.login_blocked_for(now) {
            let retry_after_secs = u64::try_from(wait.num_seconds()).unwrap_or_default();
            return Err(Error::LoginRateLimited { retry_after_secs });
        }

        session.reset();
        let url = self.portal_url(LOGIN_PATH)?;
        let username = self.credentials.username.as_str();
        debug!(username, "logging in");

        let form = [
            ("timeOffset", "480"),
            ("UserName", username),
            ("Password", self.credentials.password.expose_secret()),
            ("RememberMe", "false"),
        ];
        let resp = self.send_form(&url, &form).await.map_err(|e| match e {
            Error::Cancelled => Error::Cancelled,
            other => Error::Authentication {
                message: format!("login request failed: {other}"),
            },
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            error!(username, "login rejected (401)");
            session.record_failed_login(now, MAX_LOGIN_ATTEMPTS, lockout());
            return Err(Error::Authentication {
                message: format!("login as {username} failed"),
            });
        }
        if !(status.is_success() || status.is_redirection()) {
            error!(%status, "login failed");
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status})"),
            });
        }

        // Verify: the portal root must accept the fresh cookie.
        let verify = self
            .send(session, &Method::GET, &url, None)
            .await
            .map_err(|e| match e {
                Error::Cancelled => Error::Cancelled,
                other => Error::Authentication {
                    message: format!("login verification failed: {other}"),
                },
            })?;

        if verify.cookies.null_auth {
            error!("login returned a blank auth cookie");
            session.record_failed_login(now, MAX_LOGIN_ATTEMPTS, lockout());
            return Err(Error::Authentication {
                message: format!("null cookie on login verification (HTTP {})", verify.status),
            });
        }
        if verify.status == reqwest::StatusCode::UNAUTHORIZED {
            error!("login verification rejected (401)");
            session.record_failed_login(now, MAX_LOGIN_ATTEMPTS, lockout());
            return Err(Error::Authentication {
                message: "login verification failed (HTTP 401)".into(),
            });
        }
        if !(verify.status.is_success() || verify.status.is_redirection()) {
            error!(status = %verify.status, "login verification failed");
            return Err(Error::Authentication {
                message: format!("login verification failed (HTTP {})", verify.status),
            });
        }

        session.mark_valid(Utc::now());
        info!(username, "logged in");
        Ok(())
    }
}

fn lockout() -> TimeDelta {
    TimeDelta::from_std(LOGIN_LOCKOUT).unwrap_or(TimeDelta::MAX)
}
