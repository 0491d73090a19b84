// tcc-api: resilient async client for the Total Connect Comfort portal
//
// One `TccClient` per account. It owns the account's session, logs in on
// demand, re-authenticates on 401/403 and backs off on transient server
// failures before an error ever reaches the caller.

pub mod auth;
pub mod client;
pub mod devices;
pub mod error;
pub mod locations;
pub mod models;
pub mod retry;
pub mod session;
pub mod transport;

pub use auth::{LOGIN_LOCKOUT, MAX_LOGIN_ATTEMPTS};
pub use client::{ClientMetrics, Credentials, TccClient};
pub use error::Error;
pub use locations::MAX_LOCATION_PAGES;
pub use models::{
    ControlChanges, DeviceId, DeviceRecord, DeviceSnapshot, FanData, LatestData, LocationRecord,
    UiData,
};
pub use retry::RetryPolicy;
pub use session::{AUTH_COOKIE, CookieJar, CookieUpdate, Session, SessionCookie, SessionValidity};
pub use transport::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, TransportConfig};
