// ── Wire-to-domain conversion ──
//
// Turns `tcc_api` wire records into domain types. Integer codes become
// enums; a missing or unknown code becomes `None` rather than an error,
// since some thermostat models omit fields entirely.

use chrono::{DateTime, Utc};

use tcc_api::{DeviceRecord, DeviceSnapshot, FanData, LocationRecord, UiData};

use crate::model::{
    DeviceId, DeviceState, DeviceSummary, EquipmentStatus, FanMode, HoldStatus, Location,
    SetpointLimits, SystemMode, TemperatureUnit,
};

impl From<LocationRecord> for Location {
    fn from(raw: LocationRecord) -> Self {
        Self {
            id: raw.location_id,
            name: raw.name,
            devices: raw.devices.into_iter().map(DeviceSummary::from).collect(),
        }
    }
}

impl From<DeviceRecord> for DeviceSummary {
    fn from(raw: DeviceRecord) -> Self {
        Self {
            id: raw.device_id,
            name: raw.name,
            mac: raw.mac_id,
            alive: raw.is_alive.unwrap_or(true),
        }
    }
}

impl DeviceState {
    /// Build the domain state from one `CheckDataSession` snapshot.
    pub fn from_snapshot(
        device_id: DeviceId,
        name: &str,
        snapshot: &DeviceSnapshot,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        let ui = &snapshot.latest_data.ui_data;
        let fan = snapshot.latest_data.fan_data.as_ref();
        let system_mode = ui.system_switch_position.and_then(SystemMode::from_code);

        // The hold that matters is the one on the side the thermostat drives.
        let hold_code = match system_mode {
            Some(SystemMode::Cool) => ui.status_cool,
            _ => ui.status_heat.or(ui.status_cool),
        };

        Self {
            device_id,
            name: name.to_owned(),
            live: snapshot.device_live && !snapshot.communication_lost,

            current_temperature: ui.disp_temperature,
            indoor_humidity: ui
                .indoor_humidity
                .filter(|_| ui.indoor_humidity_sensor_available),
            outdoor_temperature: ui
                .outdoor_temperature
                .filter(|_| ui.outdoor_temperature_available),
            outdoor_humidity: ui.outdoor_humidity.filter(|_| ui.outdoor_humidity_available),
            unit: temperature_unit(ui.display_units.as_deref()),

            heat_setpoint: ui.heat_setpoint,
            cool_setpoint: ui.cool_setpoint,
            heat_limits: limits(ui.heat_lower_setpt_limit, ui.heat_upper_setpt_limit),
            cool_limits: limits(ui.cool_lower_setpt_limit, ui.cool_upper_setpt_limit),
            hold: HoldStatus::from_code(hold_code),

            system_mode,
            allowed_modes: allowed_modes(ui),
            equipment: EquipmentStatus::from_code(ui.equipment_output_status),

            has_fan: snapshot.latest_data.has_fan,
            fan_mode: fan.and_then(|f| f.fan_mode).and_then(FanMode::from_code),
            allowed_fan_modes: fan.map(allowed_fan_modes).unwrap_or_default(),
            fan_running: fan.is_some_and(|f| f.fan_is_running),

            fetched_at,
        }
    }
}

fn temperature_unit(raw: Option<&str>) -> TemperatureUnit {
    match raw {
        Some(u) if u.eq_ignore_ascii_case("C") => TemperatureUnit::Celsius,
        _ => TemperatureUnit::Fahrenheit,
    }
}

fn limits(min: Option<f64>, max: Option<f64>) -> Option<SetpointLimits> {
    match (min, max) {
        (Some(min), Some(max)) if min <= max => Some(SetpointLimits { min, max }),
        _ => None,
    }
}

/// Off is always offered; the rest depend on the equipment.
fn allowed_modes(ui: &UiData) -> Vec<SystemMode> {
    let mut modes = vec![SystemMode::Off];
    if ui.switch_heat_allowed {
        modes.push(SystemMode::Heat);
    }
    if ui.switch_cool_allowed {
        modes.push(SystemMode::Cool);
    }
    if ui.switch_auto_allowed {
        modes.push(SystemMode::Auto);
    }
    if ui.switch_emergency_heat_allowed {
        modes.push(SystemMode::EmergencyHeat);
    }
    modes
}

fn allowed_fan_modes(fan: &FanData) -> Vec<FanMode> {
    [
        (fan.fan_mode_auto_allowed, FanMode::Auto),
        (fan.fan_mode_on_allowed, FanMode::On),
        (fan.fan_mode_circulate_allowed, FanMode::Circulate),
        (fan.fan_mode_follow_schedule_allowed, FanMode::FollowSchedule),
    ]
    .into_iter()
    .filter_map(|(allowed, mode)| allowed.then_some(mode))
    .collect()
}
