// ── Thermostat state ──
//
// `DeviceState` is replaced wholesale on every successful fetch and shared
// behind an `Arc`, so nothing here is mutable after construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::DeviceId;

/// System switch position.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SystemMode {
    #[serde(rename = "emheat")]
    #[strum(serialize = "emheat")]
    EmergencyHeat,
    Heat,
    Off,
    Cool,
    Auto,
}

impl SystemMode {
    /// Portal `SystemSwitch` code.
    pub fn code(self) -> u8 {
        match self {
            Self::EmergencyHeat => 0,
            Self::Heat => 1,
            Self::Off => 2,
            Self::Cool => 3,
            Self::Auto => 4,
        }
    }

    /// Decode `SystemSwitchPosition`. Both 4 and 5 mean auto.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::EmergencyHeat),
            1 => Some(Self::Heat),
            2 => Some(Self::Off),
            3 => Some(Self::Cool),
            4 | 5 => Some(Self::Auto),
            _ => None,
        }
    }
}

/// Fan switch position.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum FanMode {
    Auto,
    On,
    Circulate,
    FollowSchedule,
}

impl FanMode {
    pub fn code(self) -> u8 {
        match self {
            Self::Auto => 0,
            Self::On => 1,
            Self::Circulate => 2,
            Self::FollowSchedule => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Auto),
            1 => Some(Self::On),
            2 => Some(Self::Circulate),
            3 => Some(Self::FollowSchedule),
            _ => None,
        }
    }
}

/// What the HVAC equipment is doing right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EquipmentStatus {
    #[default]
    Idle,
    Heating,
    Cooling,
}

impl EquipmentStatus {
    pub fn from_code(code: Option<u8>) -> Self {
        match code {
            Some(1) => Self::Heating,
            Some(2) => Self::Cooling,
            _ => Self::Idle,
        }
    }
}

/// Whether the setpoint follows the schedule or a manual hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HoldStatus {
    #[default]
    Schedule,
    Temporary,
    Permanent,
}

impl HoldStatus {
    /// Portal `StatusHeat` / `StatusCool` code.
    pub fn code(self) -> u8 {
        match self {
            Self::Schedule => 0,
            Self::Temporary => 1,
            Self::Permanent => 2,
        }
    }

    /// Codes above 2 (vacation holds) are reported as permanent.
    pub fn from_code(code: Option<u8>) -> Self {
        match code {
            None | Some(0) => Self::Schedule,
            Some(1) => Self::Temporary,
            Some(_) => Self::Permanent,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum TemperatureUnit {
    #[default]
    #[serde(rename = "F")]
    #[strum(serialize = "°F")]
    Fahrenheit,
    #[serde(rename = "C")]
    #[strum(serialize = "°C")]
    Celsius,
}

/// Inclusive setpoint bounds reported by the thermostat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetpointLimits {
    pub min: f64,
    pub max: f64,
}

impl SetpointLimits {
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Last successfully fetched state of one thermostat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub device_id: DeviceId,
    pub name: String,
    /// The portal can reach the thermostat.
    pub live: bool,

    pub current_temperature: Option<f64>,
    pub indoor_humidity: Option<f64>,
    pub outdoor_temperature: Option<f64>,
    pub outdoor_humidity: Option<f64>,
    pub unit: TemperatureUnit,

    pub heat_setpoint: Option<f64>,
    pub cool_setpoint: Option<f64>,
    pub heat_limits: Option<SetpointLimits>,
    pub cool_limits: Option<SetpointLimits>,
    pub hold: HoldStatus,

    pub system_mode: Option<SystemMode>,
    pub allowed_modes: Vec<SystemMode>,
    pub equipment: EquipmentStatus,

    pub has_fan: bool,
    pub fan_mode: Option<FanMode>,
    pub allowed_fan_modes: Vec<FanMode>,
    pub fan_running: bool,

    pub fetched_at: DateTime<Utc>,
}

impl DeviceState {
    /// The setpoint the thermostat is currently driving toward.
    ///
    /// In auto mode this is the heat setpoint; use [`Self::cool_setpoint`]
    /// for the upper bound.
    pub fn active_setpoint(&self) -> Option<f64> {
        match self.system_mode? {
            SystemMode::Cool => self.cool_setpoint,
            SystemMode::Heat | SystemMode::EmergencyHeat | SystemMode::Auto => self.heat_setpoint,
            SystemMode::Off => None,
        }
    }

    pub fn allows_mode(&self, mode: SystemMode) -> bool {
        self.allowed_modes.contains(&mode)
    }

    pub fn allows_fan_mode(&self, mode: FanMode) -> bool {
        self.has_fan && self.allowed_fan_modes.contains(&mode)
    }
}
