// Portal wire types
//
// Raw shapes returned by the portal's JSON endpoints. Fields the portal
// omits on some thermostat models are optional; `tcc-core` converts these
// into its domain `DeviceState`.

use serde::{Deserialize, Serialize};

/// Numeric device identifier used in every device-scoped path.
pub type DeviceId = u64;

// ── Locations ───────────────────────────────────────────────────────

/// One entry of `GetLocationListData`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocationRecord {
    #[serde(rename = "LocationID")]
    pub location_id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
}

/// A device as listed under its location.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeviceRecord {
    #[serde(rename = "DeviceID")]
    pub device_id: DeviceId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "MacID", default)]
    pub mac_id: Option<String>,
    #[serde(default)]
    pub is_alive: Option<bool>,
}

// ── Device state ────────────────────────────────────────────────────

/// Body of `CheckDataSession/{deviceId}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub device_live: bool,
    #[serde(default)]
    pub communication_lost: bool,
    pub latest_data: LatestData,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestData {
    pub ui_data: UiData,
    #[serde(default)]
    pub fan_data: Option<FanData>,
    #[serde(default)]
    pub has_fan: bool,
}

/// Thermostat readings and settings.
///
/// Mode and status fields are the portal's small integer codes; their
/// meaning is decoded by `tcc-core`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase", default)]
#[allow(clippy::struct_excessive_bools)]
pub struct UiData {
    pub disp_temperature: Option<f64>,
    pub heat_setpoint: Option<f64>,
    pub cool_setpoint: Option<f64>,
    pub display_units: Option<String>,
    pub status_heat: Option<u8>,
    pub status_cool: Option<u8>,
    pub system_switch_position: Option<u8>,
    pub equipment_output_status: Option<u8>,
    pub indoor_humidity: Option<f64>,
    pub indoor_humidity_sensor_available: bool,
    pub outdoor_temperature: Option<f64>,
    pub outdoor_temperature_available: bool,
    pub outdoor_humidity: Option<f64>,
    pub outdoor_humidity_available: bool,
    pub switch_heat_allowed: bool,
    pub switch_cool_allowed: bool,
    pub switch_auto_allowed: bool,
    pub switch_off_allowed: bool,
    pub switch_emergency_heat_allowed: bool,
    pub heat_lower_setpt_limit: Option<f64>,
    pub heat_upper_setpt_limit: Option<f64>,
    pub cool_lower_setpt_limit: Option<f64>,
    pub cool_upper_setpt_limit: Option<f64>,
    pub heat_next_period: Option<u32>,
    pub cool_next_period: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(clippy::struct_excessive_bools)]
pub struct FanData {
    pub fan_mode: Option<u8>,
    pub fan_is_running: bool,
    pub fan_mode_auto_allowed: bool,
    pub fan_mode_on_allowed: bool,
    pub fan_mode_circulate_allowed: bool,
    pub fan_mode_follow_schedule_allowed: bool,
}

// ── Control ─────────────────────────────────────────────────────────

/// Body of `SubmitControlScreenChanges`.
///
/// Every field is always serialized; `None` becomes `null`, which the
/// portal reads as "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ControlChanges {
    #[serde(rename = "DeviceID")]
    pub device_id: DeviceId,
    pub system_switch: Option<u8>,
    pub heat_setpoint: Option<f64>,
    pub cool_setpoint: Option<f64>,
    pub heat_next_period: Option<u32>,
    pub cool_next_period: Option<u32>,
    pub status_heat: Option<u8>,
    pub status_cool: Option<u8>,
    pub fan_mode: Option<u8>,
}

impl ControlChanges {
    pub fn new(device_id: DeviceId) -> Self {
        Self {
            device_id,
            ..Self::default()
        }
    }
}
