use serde::{Deserialize, Serialize};

use super::DeviceId;

/// A site on the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: u64,
    pub name: String,
    pub devices: Vec<DeviceSummary>,
}

/// A thermostat as listed under its location, before any state fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub id: DeviceId,
    pub name: String,
    pub mac: Option<String>,
    pub alive: bool,
}
