// Portal HTTP client
//
// Wraps `reqwest::Client` with the account's session, re-login on expired
// sessions, and exponential backoff on transient server failures. Endpoint
// methods (locations, devices) live in separate files as inherent methods
// so this module stays focused on request mechanics.
//
// Every call holds the session mutex from first send to final result, so
// calls against one account never overlap and run in submission order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use reqwest::{Method, StatusCode};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};
use url::Url;

use crate::error::Error;
use crate::retry::RetryPolicy;
use crate::session::{CookieUpdate, Session, SessionValidity};
use crate::transport::TransportConfig;

/// Account credentials, supplied once at construction.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<SecretString>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Counters describing what the client has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientMetrics {
    /// HTTP requests put on the wire, logins included.
    pub requests_sent: u64,
    /// Backoff waits completed.
    pub backoff_waits: u64,
    /// Logins performed because the portal rejected the session.
    pub relogins: u64,
    /// Highest number of calls observed in flight at once.
    pub max_in_flight: usize,
}

#[derive(Debug, Default)]
struct Counters {
    requests_sent: AtomicU64,
    backoff_waits: AtomicU64,
    relogins: AtomicU64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Decrements the in-flight gauge when a call finishes or is dropped.
struct InFlight<'a>(&'a Counters);

impl<'a> InFlight<'a> {
    fn enter(counters: &'a Counters) -> Self {
        let now = counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        counters.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(counters)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A response whose cookies have already been absorbed into the session.
pub(crate) struct RawResponse {
    pub status: StatusCode,
    pub body: String,
    /// What this response's `Set-Cookie` headers did to the jar.
    pub cookies: CookieUpdate,
}

/// Resilient client for one portal account.
///
/// Owns exactly one [`Session`]. Share it behind an `Arc` between the
/// coordinators and the command executor of that account.
pub struct TccClient {
    http: reqwest::Client,
    base_url: Url,
    pub(crate) credentials: Credentials,
    policy: RetryPolicy,
    session: Mutex<Session>,
    cancel: CancellationToken,
    cache_buster: AtomicU64,
    counters: Counters,
}

impl TccClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// The reqwest client is built here so that its cookie provider is
    /// this client's session jar.
    pub fn new(
        credentials: Credentials,
        policy: RetryPolicy,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let session = Session::new();
        let http = transport.build_client(Arc::clone(session.jar()))?;
        let seed = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        Ok(Self {
            http,
            base_url: transport.base_url.clone(),
            credentials,
            policy,
            session: Mutex::new(session),
            cancel: CancellationToken::new(),
            cache_buster: AtomicU64::new(seed),
            counters: Counters::default(),
        })
    }

    /// Tie this client to an externally owned shutdown token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// The token that aborts this client's waits and in-flight calls.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Abort pending backoff waits and in-flight calls. Later calls fail
    /// with [`Error::Cancelled`].
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn metrics(&self) -> ClientMetrics {
        ClientMetrics {
            requests_sent: self.counters.requests_sent.load(Ordering::SeqCst),
            backoff_waits: self.counters.backoff_waits.load(Ordering::SeqCst),
            relogins: self.counters.relogins.load(Ordering::SeqCst),
            max_in_flight: self.counters.max_in_flight.load(Ordering::SeqCst),
        }
    }

    pub async fn session_validity(&self) -> SessionValidity {
        self.session.lock().await.validity()
    }

    /// The `Cookie` header the next request would carry.
    pub async fn cookie_header(&self) -> Option<String> {
        self.session.lock().await.cookie_header(Utc::now())
    }

    pub(crate) fn next_cache_buster(&self) -> u64 {
        self.cache_buster.fetch_add(1, Ordering::Relaxed)
    }

    // ── Request execution ────────────────────────────────────────────

    /// Issue one API call with the full resiliency policy applied and
    /// parse the JSON success body.
    ///
    /// `path` is absolute (`/portal/...`) and may carry a query string.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T, Error> {
        let url = self.base_url.join(path)?;
        let raw = {
            let mut session = self.lock_session().await?;
            self.execute(&mut session, &method, &url, body).await?
        };

        serde_json::from_str(&raw.body).map_err(|e| {
            let preview: String = raw.body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: raw.body.clone(),
            }
        })
    }

    /// Acquire the session, giving up if the client shuts down first.
    pub(crate) async fn lock_session(&self) -> Result<MutexGuard<'_, Session>, Error> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Error::Cancelled),
            guard = self.session.lock() => Ok(guard),
        }
    }

    /// Re-login and backoff loop. Every iteration either returns or spends
    /// one unit of the re-auth or retry budget, so it always terminates.
    async fn execute(
        &self,
        session: &mut Session,
        method: &Method,
        url: &Url,
        body: Option<&serde_json::Value>,
    ) -> Result<RawResponse, Error> {
        if !session.is_valid() {
            debug!(validity = ?session.validity(), "session not valid, logging in");
            self.login_locked(session).await?;
        }

        let mut retries: u32 = 0;
        let mut reauths: u32 = 0;

        loop {
            let (status, message) = match self.send(session, method, url, body).await {
                Ok(resp) if resp.status.is_success() => return Ok(resp),
                Ok(resp) if self.policy.needs_reauth(resp.status) => {
                    session.invalidate();
                    if reauths >= self.policy.max_reauth_attempts {
                        error!(status = %resp.status, reauths, "session rejected after re-login");
                        return Err(Error::Authentication {
                            message: format!(
                                "session rejected (HTTP {}) after {reauths} re-login(s)",
                                resp.status
                            ),
                        });
                    }
                    reauths += 1;
                    warn!(status = %resp.status, path = url.path(), "session expired, re-authenticating");
                    self.login_locked(session).await?;
                    self.counters.relogins.fetch_add(1, Ordering::SeqCst);
                    continue;
                }
                Ok(resp)
                    if self.policy.is_retryable(resp.status) || resp.status.is_redirection() =>
                {
                    (Some(resp.status.as_u16()), format!("HTTP {}", resp.status))
                }
                Ok(resp) => {
                    debug!(status = %resp.status, path = url.path(), "unexpected API response");
                    return Err(Error::Request {
                        status: resp.status.as_u16(),
                        message: resp.body.chars().take(200).collect(),
                    });
                }
                Err(Error::Transport(e)) if e.is_timeout() || e.is_connect() => {
                    (None, e.to_string())
                }
                Err(e) => return Err(e),
            };

            if retries >= self.policy.max_retries {
                error!(
                    attempts = retries + 1,
                    ?status,
                    path = url.path(),
                    "retry budget exhausted"
                );
                return Err(Error::Transient {
                    message,
                    status,
                    attempts: retries + 1,
                });
            }

            let delay = self.policy.delay_for(retries);
            warn!(
                attempt = retries + 1,
                max_retries = self.policy.max_retries,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                %message,
                "service unavailable, backing off"
            );
            self.backoff(delay).await?;
            retries += 1;
        }
    }

    /// Send one request through the session's jar and report what the
    /// response's cookies did to it, before the status is even looked at.
    pub(crate) async fn send(
        &self,
        session: &mut Session,
        method: &Method,
        url: &Url,
        body: Option<&serde_json::Value>,
    ) -> Result<RawResponse, Error> {
        debug!("{method} {}", url.path());

        let mut builder = self.http.request(method.clone(), url.clone());
        if let Some(body) = body {
            builder = builder.json(body);
        }

        session.jar().take_update();
        self.counters.requests_sent.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight::enter(&self.counters);
        let resp = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(Error::Cancelled),
            resp = builder.send() => resp?,
        };

        let status = resp.status();
        let cookies = session.jar().take_update();
        if cookies.sanitized > 0 {
            trace!(sanitized = cookies.sanitized, "normalized cookies on receipt");
        }

        let body = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(Error::Cancelled),
            text = resp.text() => text?,
        };

        Ok(RawResponse {
            status,
            body,
            cookies,
        })
    }

    /// POST a form body, racing the shutdown token. Cookies land in the
    /// session jar.
    pub(crate) async fn send_form(
        &self,
        url: &Url,
        form: &[(&str, &str)],
    ) -> Result<reqwest::Response, Error> {
        debug!("POST {}", url.path());

        self.counters.requests_sent.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight::enter(&self.counters);
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Error::Cancelled),
            resp = self.http.post(url.clone()).form(form).send() => Ok(resp?),
        }
    }

    /// Cancellable sleep between attempts.
    async fn backoff(&self, delay: Duration) -> Result<(), Error> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Error::Cancelled),
            () = tokio::time::sleep(delay) => {
                self.counters.backoff_waits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    pub(crate) fn portal_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }
}
