// ── Runtime account configuration ──
//
// Describes how to reach one portal account and how hard to try. Carries
// credentials but never touches disk: `tcc-config` builds an
// `AccountConfig` and hands it in.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use tcc_api::{
    Credentials, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, DeviceId, RetryPolicy, TransportConfig,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Setpoints held permanently while in away mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AwaySetpoints {
    pub heat: f64,
    pub cool: f64,
}

impl Default for AwaySetpoints {
    fn default() -> Self {
        Self {
            heat: 61.0,
            cool: 88.0,
        }
    }
}

/// Configuration for one account and all of its thermostats.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    pub credentials: Credentials,
    /// Portal root, overridable for testing.
    pub base_url: Url,
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Consecutive failed fetches before a device is reported unavailable.
    pub failure_threshold: u32,
    /// Budget applied by the client to every call.
    pub fetch_retry: RetryPolicy,
    /// Budget applied on top by the command executor.
    pub command_retry: RetryPolicy,
    pub away: AwaySetpoints,
    /// Restrict the account to these devices. `None` manages all of them.
    pub devices: Option<Vec<DeviceId>>,
}

impl AccountConfig {
    pub fn new(credentials: Credentials) -> Result<Self, url::ParseError> {
        Ok(Self {
            credentials,
            base_url: Url::parse(DEFAULT_BASE_URL)?,
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            fetch_retry: RetryPolicy::default(),
            command_retry: RetryPolicy::for_commands(),
            away: AwaySetpoints::default(),
            devices: None,
        })
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig::new(self.base_url.clone()).with_timeout(self.timeout)
    }

    /// Whether `device_id` passes the configured device filter.
    pub fn manages(&self, device_id: DeviceId) -> bool {
        self.devices
            .as_ref()
            .is_none_or(|ids| ids.contains(&device_id))
    }
}
