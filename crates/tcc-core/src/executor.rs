// ── Command retry wrapper ──
//
// Delivers a validated command through the shared client and retries any
// failure with its own backoff, on top of whatever the client already
// spent. On success the device's coordinator is asked to refresh.

use std::sync::Arc;

use tracing::{error, info, warn};

use tcc_api::{RetryPolicy, TccClient};

use crate::command::Command;
use crate::config::AwaySetpoints;
use crate::coordinator::Coordinator;
use crate::error::CoreError;
use crate::model::{DeviceId, DeviceState};

/// What the executor needs from the device it controls.
pub trait RefreshTarget: Send + Sync {
    /// State the command is validated against.
    fn current_state(&self) -> Arc<DeviceState>;

    /// Fetch new state soon.
    fn request_refresh(&self);
}

impl RefreshTarget for Coordinator {
    fn current_state(&self) -> Arc<DeviceState> {
        self.state()
    }

    fn request_refresh(&self) {
        Coordinator::request_refresh(self);
    }
}

/// Runs commands for one thermostat.
pub struct CommandExecutor {
    client: Arc<TccClient>,
    target: Arc<dyn RefreshTarget>,
    policy: RetryPolicy,
    away: AwaySetpoints,
}

impl CommandExecutor {
    pub fn new(
        client: Arc<TccClient>,
        target: Arc<dyn RefreshTarget>,
        policy: RetryPolicy,
        away: AwaySetpoints,
    ) -> Self {
        Self {
            client,
            target,
            policy,
            away,
        }
    }

    pub fn device_id(&self) -> DeviceId {
        self.target.current_state().device_id
    }

    /// Validate and deliver `command`.
    ///
    /// Validation failures return immediately. Delivery is tried up to
    /// `max_retries + 1` times; the last failure is returned inside
    /// [`CoreError::Command`]. Shutdown aborts the wait between attempts.
    pub async fn execute(&self, command: Command) -> Result<(), CoreError> {
        let state = self.target.current_state();
        let changes = command.to_changes(&state, &self.away)?;
        let device_id = state.device_id;
        let attempts = self.policy.max_retries.saturating_add(1);
        let cancel = self.client.cancellation_token();

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let err = match self.client.submit_control_changes(&changes).await {
                Ok(()) => {
                    info!(device_id, command = command.label(), attempt, "command applied");
                    self.target.request_refresh();
                    return Ok(());
                }
                Err(tcc_api::Error::Cancelled) => return Err(CoreError::Cancelled),
                Err(e) => e,
            };

            if attempt >= attempts {
                error!(
                    device_id,
                    command = command.label(),
                    attempts = attempt,
                    error = %err,
                    "command failed"
                );
                return Err(CoreError::Command {
                    attempts: attempt,
                    source: err,
                });
            }

            let delay = self.policy.delay_for(attempt - 1);
            warn!(
                device_id,
                command = command.label(),
                attempt,
                max_attempts = attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "command failed, retrying"
            );
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(CoreError::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}
