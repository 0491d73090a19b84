// ── Account lifecycle ──
//
// One `Account` per credential set: one client (one portal session), one
// coordinator per managed thermostat, and a command executor per
// thermostat sharing that client. Distinct accounts share nothing.

use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tcc_api::TccClient;

use crate::command::Command;
use crate::config::AccountConfig;
use crate::coordinator::{Coordinator, PollOutcome};
use crate::error::CoreError;
use crate::executor::{CommandExecutor, RefreshTarget};
use crate::model::{DeviceId, Location};

/// A managed thermostat: its coordinator and its command executor.
pub struct Device {
    pub coordinator: Arc<Coordinator>,
    pub executor: CommandExecutor,
}

pub struct Account {
    config: AccountConfig,
    client: Arc<TccClient>,
    locations: Vec<Location>,
    devices: Vec<Device>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Account {
    /// Log in, discover thermostats and fetch each one once.
    ///
    /// Does not start polling; call [`spawn`](Self::spawn) for that.
    pub async fn connect(config: AccountConfig) -> Result<Self, CoreError> {
        let cancel = CancellationToken::new();
        let client = TccClient::new(
            config.credentials.clone(),
            config.fetch_retry.clone(),
            &config.transport(),
        )?
        .with_cancellation(cancel.clone());
        let client = Arc::new(client);

        client.login().await?;

        let locations: Vec<Location> = client
            .list_locations()
            .await?
            .into_iter()
            .map(Location::from)
            .collect();

        let mut devices = Vec::new();
        for summary in locations.iter().flat_map(|l| &l.devices) {
            if !config.manages(summary.id) {
                debug!(device_id = summary.id, "skipping device outside filter");
                continue;
            }
            let coordinator = Arc::new(
                Coordinator::connect(
                    Arc::clone(&client),
                    summary.id,
                    summary.name.clone(),
                    config.failure_threshold,
                )
                .await?,
            );
            let target: Arc<dyn RefreshTarget> = coordinator.clone();
            let executor = CommandExecutor::new(
                Arc::clone(&client),
                target,
                config.command_retry.clone(),
                config.away,
            );
            devices.push(Device {
                coordinator,
                executor,
            });
        }

        if devices.is_empty() {
            return Err(CoreError::NoDevices);
        }

        info!(
            username = client.username(),
            locations = locations.len(),
            devices = devices.len(),
            "account connected"
        );
        Ok(Self {
            config,
            client,
            locations,
            devices,
            cancel,
            tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &AccountConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<TccClient> {
        &self.client
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn device(&self, device_id: DeviceId) -> Result<&Device, CoreError> {
        self.devices
            .iter()
            .find(|d| d.coordinator.device_id() == device_id)
            .ok_or(CoreError::DeviceNotFound { device_id })
    }

    /// Poll every device once, in order.
    pub async fn poll_all(&self) -> Vec<PollOutcome> {
        let mut outcomes = Vec::with_capacity(self.devices.len());
        for device in &self.devices {
            outcomes.push(device.coordinator.poll().await);
        }
        outcomes
    }

    pub async fn execute(&self, device_id: DeviceId, command: Command) -> Result<(), CoreError> {
        self.device(device_id)?.executor.execute(command).await
    }

    /// Start one polling task per device.
    pub async fn spawn(&self) {
        let mut tasks = self.tasks.lock().await;
        if !tasks.is_empty() {
            warn!("polling already running");
            return;
        }
        for device in &self.devices {
            let coordinator = Arc::clone(&device.coordinator);
            tasks.push(tokio::spawn(
                coordinator.run(self.config.poll_interval, self.cancel.clone()),
            ));
        }
        debug!(tasks = tasks.len(), "polling started");
    }

    /// Cancel polling and in-flight calls, then wait for the tasks.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handles: Vec<_> = self.tasks.lock().await.drain(..).collect();
        for result in join_all(handles).await {
            if let Err(e) = result {
                warn!(error = %e, "polling task ended abnormally");
            }
        }
        debug!("account shut down");
    }
}
