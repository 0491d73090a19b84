// ── Polling coordinator ──
//
// One coordinator per thermostat. Each poll fetches the device state
// through the shared client. A failure below the threshold serves the
// cached state as healthy; at the threshold the device is reported
// unavailable, with the cached state kept for diagnostics. `poll()`
// never fails.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Mutex, Notify, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use tcc_api::TccClient;

use crate::error::CoreError;
use crate::model::{DeviceId, DeviceState};
use crate::streak::ErrorStreak;

/// Where the coordinator is in its fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    Idle,
    Fetching,
    /// Fresh state fetched; the streak was reset.
    Updated,
    /// Fetch failed below the threshold; cached state served as healthy.
    StaleServed,
    /// Fetch failed at or past the threshold; device reported unavailable.
    Failed,
}

/// Result of one poll, as seen by hosts.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub state: Arc<DeviceState>,
    pub available: bool,
    /// `Updated`, `StaleServed` or `Failed`.
    pub phase: Phase,
    pub consecutive_failures: u32,
    /// The failure behind a stale or failed poll.
    pub error: Option<Arc<tcc_api::Error>>,
}

struct Cache {
    state: Arc<DeviceState>,
    streak: ErrorStreak,
    last: PollOutcome,
}

/// Polls one thermostat and decides between fresh, stale and unavailable.
pub struct Coordinator {
    client: Arc<TccClient>,
    device_id: DeviceId,
    name: String,
    threshold: u32,
    cache: Mutex<Cache>,
    phase: watch::Sender<Phase>,
    outcomes: watch::Sender<PollOutcome>,
    refresh: Notify,
}

impl Coordinator {
    /// Fetch the device once and build a coordinator around the result.
    ///
    /// Fails if that first fetch fails: there is no state to serve yet.
    pub async fn connect(
        client: Arc<TccClient>,
        device_id: DeviceId,
        name: impl Into<String>,
        failure_threshold: u32,
    ) -> Result<Self, CoreError> {
        let name = name.into();
        let snapshot = client.get_device_state(device_id).await?;
        let now = Utc::now();
        let state = Arc::new(DeviceState::from_snapshot(device_id, &name, &snapshot, now));

        let mut streak = ErrorStreak::new();
        streak.record_success(now);
        let first = PollOutcome {
            state: Arc::clone(&state),
            available: true,
            phase: Phase::Updated,
            consecutive_failures: 0,
            error: None,
        };
        let (outcomes, _) = watch::channel(first.clone());
        let (phase, _) = watch::channel(Phase::Idle);

        debug!(device_id, name = %name, "coordinator ready");
        Ok(Self {
            client,
            device_id,
            name,
            threshold: failure_threshold.max(1),
            cache: Mutex::new(Cache {
                state,
                streak,
                last: first,
            }),
            phase,
            outcomes,
            refresh: Notify::new(),
        })
    }

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// The most recent outcome, without fetching.
    pub fn latest(&self) -> PollOutcome {
        self.outcomes.borrow().clone()
    }

    /// The cached state, fresh or stale.
    pub fn state(&self) -> Arc<DeviceState> {
        Arc::clone(&self.outcomes.borrow().state)
    }

    /// Receive every outcome as it is produced.
    pub fn subscribe(&self) -> watch::Receiver<PollOutcome> {
        self.outcomes.subscribe()
    }

    /// Ask the polling loop to fetch now instead of at the next tick.
    pub fn request_refresh(&self) {
        debug!(device_id = self.device_id, "refresh requested");
        self.refresh.notify_one();
    }

    /// Fetch once and classify the result.
    pub async fn poll(&self) -> PollOutcome {
        let mut cache = self.cache.lock().await;
        self.phase.send_replace(Phase::Fetching);
        let result = self.client.get_device_state(self.device_id).await;
        let now = Utc::now();

        let outcome = match result {
            Ok(snapshot) => {
                let recovered = cache.streak.consecutive();
                cache.state = Arc::new(DeviceState::from_snapshot(
                    self.device_id,
                    &self.name,
                    &snapshot,
                    now,
                ));
                cache.streak.record_success(now);
                if recovered > 0 {
                    info!(device_id = self.device_id, failures = recovered, "device state recovered");
                }
                PollOutcome {
                    state: Arc::clone(&cache.state),
                    available: true,
                    phase: Phase::Updated,
                    consecutive_failures: 0,
                    error: None,
                }
            }
            Err(tcc_api::Error::Cancelled) => {
                // Shutdown is not a fetch failure.
                self.phase.send_replace(Phase::Idle);
                return cache.last.clone();
            }
            Err(e) => {
                let error = Arc::new(e);
                let failures = cache.streak.record_failure(Arc::clone(&error));
                let available = !cache.streak.reached(self.threshold);
                if available {
                    warn!(
                        device_id = self.device_id,
                        failures,
                        threshold = self.threshold,
                        error = %error,
                        "fetch failed, serving cached state"
                    );
                } else {
                    error!(
                        device_id = self.device_id,
                        failures,
                        threshold = self.threshold,
                        error = %error,
                        "fetch failed, device unavailable"
                    );
                }
                PollOutcome {
                    state: Arc::clone(&cache.state),
                    available,
                    phase: if available {
                        Phase::StaleServed
                    } else {
                        Phase::Failed
                    },
                    consecutive_failures: failures,
                    error: Some(error),
                }
            }
        };

        cache.last = outcome.clone();
        self.outcomes.send_replace(outcome.clone());
        self.phase.send_replace(Phase::Idle);
        outcome
    }

    /// Poll on `interval` and on refresh requests until `cancel` fires.
    ///
    /// The first tick is skipped: `connect` already fetched.
    pub async fn run(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = self.refresh.notified() => ticker.reset(),
                _ = ticker.tick() => {}
            }
            self.poll().await;
        }
        debug!(device_id = self.device_id, "polling stopped");
    }
}
