// Device endpoints
//
// State polling and control submission for a single thermostat.

use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::client::TccClient;
use crate::error::Error;
use crate::models::{ControlChanges, DeviceId, DeviceSnapshot};

/// Acknowledgement body of `SubmitControlScreenChanges`.
///
/// The portal has answered with both `1` and `true` over time.
#[derive(Debug, Deserialize)]
struct ControlAck {
    #[serde(default)]
    success: serde_json::Value,
}

impl ControlAck {
    fn accepted(&self) -> bool {
        match &self.success {
            serde_json::Value::Bool(ok) => *ok,
            serde_json::Value::Number(n) => n.as_i64() == Some(1),
            _ => false,
        }
    }
}

impl TccClient {
    /// Fetch the current state of one device.
    ///
    /// `GET /portal/Device/CheckDataSession/{device_id}?_={counter}`
    ///
    /// A snapshot flagged `success: false` is reported as [`Error::Rejected`].
    pub async fn get_device_state(&self, device_id: DeviceId) -> Result<DeviceSnapshot, Error> {
        let path = format!(
            "/portal/Device/CheckDataSession/{device_id}?_={}",
            self.next_cache_buster()
        );
        debug!(device_id, "fetching device state");
        let snapshot: DeviceSnapshot = self.request(Method::GET, &path, None).await?;
        if !snapshot.success {
            return Err(Error::Rejected {
                message: format!("device {device_id} state refresh unsuccessful"),
            });
        }
        Ok(snapshot)
    }

    /// Push a set of control changes to one device.
    ///
    /// `POST /portal/Device/SubmitControlScreenChanges`
    pub async fn submit_control_changes(&self, changes: &ControlChanges) -> Result<(), Error> {
        let body = serde_json::to_value(changes).map_err(|e| Error::Deserialization {
            message: format!("failed to encode control changes: {e}"),
            body: String::new(),
        })?;
        debug!(device_id = changes.device_id, "submitting control changes");

        let ack: ControlAck = self
            .request(
                Method::POST,
                "/portal/Device/SubmitControlScreenChanges",
                Some(&body),
            )
            .await?;

        if ack.accepted() {
            Ok(())
        } else {
            warn!(device_id = changes.device_id, success = %ack.success, "control changes rejected");
            Err(Error::Rejected {
                message: format!("device {} answered success={}", changes.device_id, ack.success),
            })
        }
    }
}
