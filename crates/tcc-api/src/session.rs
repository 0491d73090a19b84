// Session state for one portal account.
//
// Cookies live in a `CookieJar` installed on the reqwest client as its
// cookie provider, so every `Set-Cookie` header passes through it. Each
// cookie is parsed with the `cookie` crate; an `expires` or `max-age`
// attribute that does not parse is cleared before the cookie is stored,
// and the `Cookie` request header is rebuilt from the normalized set.
// The jar does not scope by domain or path: one jar serves one portal.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use cookie::{Cookie, Expiration};
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use tracing::{debug, trace};
use url::Url;

/// Name of the portal's forms-authentication cookie.
pub const AUTH_COOKIE: &str = ".ASPXAUTH_TRUEHOME";

/// Whether the stored cookies are believed to authenticate requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionValidity {
    /// No login has completed yet.
    #[default]
    Unknown,
    /// Last login (or last call) succeeded.
    Valid,
    /// The portal answered 401/403; a fresh login is required.
    Expired,
}

/// One normalized cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    /// Exactly as the server sent it, quotes included.
    pub value: String,
    /// `None` for session cookies and for cookies whose expiration was
    /// malformed on receipt.
    pub expires: Option<DateTime<Utc>>,
}

/// Result of parsing one `Set-Cookie` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCookie {
    pub cookie: SessionCookie,
    /// `true` if an `expires`/`max-age` attribute was present but unusable
    /// and has been cleared.
    pub sanitized: bool,
}

impl SessionCookie {
    /// Parse a `Set-Cookie` header value.
    ///
    /// Returns `None` only when there is no `name=value` pair at all.
    /// Attribute problems never fail the parse.
    pub fn parse(header: &str, now: DateTime<Utc>) -> Option<ParsedCookie> {
        let mut cookie = Cookie::parse(header).ok()?;

        let bad_expires = declares(header, "expires") && cookie.expires().is_none();
        let bad_max_age = declares(header, "max-age") && cookie.max_age().is_none();
        if bad_expires {
            cookie.set_expires(Expiration::Session);
        }

        // Max-Age wins over Expires when both are present.
        let expires = match cookie.max_age() {
            Some(age) => Some(
                TimeDelta::try_seconds(age.whole_seconds())
                    .and_then(|delta| now.checked_add_signed(delta))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC),
            ),
            None => cookie
                .expires_datetime()
                .and_then(|at| DateTime::from_timestamp(at.unix_timestamp(), 0)),
        };

        Some(ParsedCookie {
            cookie: SessionCookie {
                name: cookie.name().to_owned(),
                value: cookie.value().to_owned(),
                expires,
            },
            sanitized: bad_expires || bad_max_age,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }
}

/// Whether the raw header carries attribute `name`, parseable or not.
fn declares(header: &str, name: &str) -> bool {
    header.split(';').skip(1).any(|attr| {
        let key = attr.split_once('=').map_or(attr, |(key, _)| key);
        key.trim().eq_ignore_ascii_case(name)
    })
}

/// What a batch of `Set-Cookie` headers did to the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CookieUpdate {
    /// Cookies stored or replaced.
    pub stored: usize,
    /// Cookies whose expiration attribute was cleared.
    pub sanitized: usize,
    /// The auth cookie arrived with an empty value, whatever its expiry.
    pub null_auth: bool,
}

impl CookieUpdate {
    fn merge(&mut self, other: Self) {
        self.stored += other.stored;
        self.sanitized += other.sanitized;
        self.null_auth |= other.null_auth;
    }
}

#[derive(Debug, Default)]
struct JarState {
    cookies: BTreeMap<String, SessionCookie>,
    /// Everything absorbed since the last `take_update`.
    pending: CookieUpdate,
}

/// Cookie store shared between a [`Session`] and its reqwest client.
#[derive(Debug, Default)]
pub struct CookieJar {
    state: Mutex<JarState>,
}

impl CookieJar {
    fn lock(&self) -> MutexGuard<'_, JarState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store every `Set-Cookie` value, normalizing as we go.
    ///
    /// A cookie that arrives already expired is a deletion.
    pub fn absorb<'a>(
        &self,
        headers: impl IntoIterator<Item = &'a HeaderValue>,
        now: DateTime<Utc>,
    ) -> CookieUpdate {
        let mut update = CookieUpdate::default();
        let mut state = self.lock();

        for raw in headers {
            let Ok(raw) = raw.to_str() else {
                debug!("ignoring non-ASCII Set-Cookie header");
                continue;
            };
            let Some(parsed) = SessionCookie::parse(raw, now) else {
                debug!("ignoring Set-Cookie header without name=value");
                continue;
            };

            if parsed.sanitized {
                debug!(cookie = %parsed.cookie.name, "cleared malformed cookie expiration");
                update.sanitized += 1;
            }
            if parsed.cookie.name == AUTH_COOKIE && parsed.cookie.value.is_empty() {
                update.null_auth = true;
            }

            if parsed.cookie.is_expired(now) {
                trace!(cookie = %parsed.cookie.name, "cookie deleted by server");
                state.cookies.remove(&parsed.cookie.name);
            } else {
                state
                    .cookies
                    .insert(parsed.cookie.name.clone(), parsed.cookie);
                update.stored += 1;
            }
        }

        state.pending.merge(update);
        update
    }

    /// Drain what was absorbed since the previous call.
    pub fn take_update(&self) -> CookieUpdate {
        std::mem::take(&mut self.lock().pending)
    }

    pub fn get(&self, name: &str) -> Option<SessionCookie> {
        self.lock().cookies.get(name).cloned()
    }

    pub fn all(&self) -> Vec<SessionCookie> {
        self.lock().cookies.values().cloned().collect()
    }

    /// Value for the `Cookie` request header, skipping expired entries.
    pub fn header(&self, now: DateTime<Utc>) -> Option<String> {
        let state = self.lock();
        let pairs: Vec<String> = state
            .cookies
            .values()
            .filter(|c| !c.is_expired(now))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        (!pairs.is_empty()).then(|| pairs.join("; "))
    }

    fn clear(&self) {
        let mut state = self.lock();
        state.cookies.clear();
        state.pending = CookieUpdate::default();
    }
}

impl CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, _url: &Url) {
        self.absorb(cookie_headers, Utc::now());
    }

    fn cookies(&self, _url: &Url) -> Option<HeaderValue> {
        self.header(Utc::now())
            .and_then(|header| HeaderValue::from_str(&header).ok())
    }
}

/// Authenticated transport state for one account.
///
/// Owned by the client behind its session mutex. The jar is also held by
/// the reqwest client, which only touches it while a request made under
/// that mutex is in flight.
#[derive(Debug, Default)]
pub struct Session {
    jar: Arc<CookieJar>,
    validity: SessionValidity,
    logged_in_at: Option<DateTime<Utc>>,
    failed_logins: u32,
    login_blocked_until: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// The store to install with `reqwest::ClientBuilder::cookie_provider`.
    pub fn jar(&self) -> &Arc<CookieJar> {
        &self.jar
    }

    pub fn validity(&self) -> SessionValidity {
        self.validity
    }

    pub fn is_valid(&self) -> bool {
        self.validity == SessionValidity::Valid
    }

    pub fn logged_in_at(&self) -> Option<DateTime<Utc>> {
        self.logged_in_at
    }

    pub fn cookie(&self, name: &str) -> Option<SessionCookie> {
        self.jar.get(name)
    }

    pub fn cookies(&self) -> Vec<SessionCookie> {
        self.jar.all()
    }

    pub fn cookie_header(&self, now: DateTime<Utc>) -> Option<String> {
        self.jar.header(now)
    }

    // ── Lifecycle transitions (client only) ─────────────────────────

    /// Drop all cookies ahead of a fresh login.
    pub(crate) fn reset(&mut self) {
        self.jar.clear();
        self.validity = SessionValidity::Unknown;
        self.logged_in_at = None;
    }

    pub(crate) fn mark_valid(&mut self, now: DateTime<Utc>) {
        self.validity = SessionValidity::Valid;
        self.logged_in_at = Some(now);
        self.failed_logins = 0;
        self.login_blocked_until = None;
    }

    pub(crate) fn invalidate(&mut self) {
        self.validity = SessionValidity::Expired;
    }

    /// Count a failed login; after `limit` in a row, block logins for `lockout`.
    pub(crate) fn record_failed_login(
        &mut self,
        now: DateTime<Utc>,
        limit: u32,
        lockout: TimeDelta,
    ) {
        self.validity = SessionValidity::Expired;
        self.failed_logins += 1;
        if self.failed_logins >= limit {
            self.login_blocked_until = now.checked_add_signed(lockout);
        }
    }

    /// Remaining lockout, if logins are currently blocked.
    pub(crate) fn login_blocked_for(&self, now: DateTime<Utc>) -> Option<TimeDelta> {
        self.login_blocked_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }
}
