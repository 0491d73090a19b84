// ── Command API ──
//
// User-initiated changes. Each command is validated against the cached
// `DeviceState` and then translated into one `ControlChanges` body; the
// executor owns delivery and retries.

use tcc_api::ControlChanges;

use crate::config::AwaySetpoints;
use crate::error::CoreError;
use crate::model::{DeviceState, FanMode, HoldStatus, SetpointLimits, SystemMode};

/// All write operations against a thermostat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    SetHeatSetpoint(f64),
    SetCoolSetpoint(f64),
    /// Auto mode: heat to `low`, cool to `high`.
    SetSetpointRange { low: f64, high: f64 },
    SetSystemMode(SystemMode),
    SetFanMode(FanMode),
    /// Hold the away setpoints permanently.
    EnterAway,
    /// Drop any hold and follow the schedule again.
    ResumeSchedule,
}

impl Command {
    /// Short name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SetHeatSetpoint(_) => "set_heat_setpoint",
            Self::SetCoolSetpoint(_) => "set_cool_setpoint",
            Self::SetSetpointRange { .. } => "set_setpoint_range",
            Self::SetSystemMode(_) => "set_system_mode",
            Self::SetFanMode(_) => "set_fan_mode",
            Self::EnterAway => "enter_away",
            Self::ResumeSchedule => "resume_schedule",
        }
    }

    /// Validate against `state` and build the control body.
    ///
    /// A manual setpoint becomes a temporary hold, unless the device is
    /// already on a permanent hold, which is kept.
    pub fn to_changes(
        &self,
        state: &DeviceState,
        away: &AwaySetpoints,
    ) -> Result<ControlChanges, CoreError> {
        let mut changes = ControlChanges::new(state.device_id);
        let hold = match state.hold {
            HoldStatus::Permanent => HoldStatus::Permanent,
            HoldStatus::Schedule | HoldStatus::Temporary => HoldStatus::Temporary,
        };

        match *self {
            Self::SetHeatSetpoint(temp) => {
                check_setpoint("heat", temp, state.heat_limits)?;
                changes.heat_setpoint = Some(temp);
                changes.status_heat = Some(hold.code());
            }
            Self::SetCoolSetpoint(temp) => {
                check_setpoint("cool", temp, state.cool_limits)?;
                changes.cool_setpoint = Some(temp);
                changes.status_cool = Some(hold.code());
            }
            Self::SetSetpointRange { low, high } => {
                check_setpoint("heat", low, state.heat_limits)?;
                check_setpoint("cool", high, state.cool_limits)?;
                if low > high {
                    return Err(invalid(format!(
                        "low setpoint {low} is above high setpoint {high}"
                    )));
                }
                changes.heat_setpoint = Some(low);
                changes.cool_setpoint = Some(high);
                changes.status_heat = Some(hold.code());
                changes.status_cool = Some(hold.code());
            }
            Self::SetSystemMode(mode) => {
                if !state.allows_mode(mode) {
                    return Err(invalid(format!("mode {mode} is not supported by this thermostat")));
                }
                changes.system_switch = Some(mode.code());
            }
            Self::SetFanMode(mode) => {
                if !state.has_fan {
                    return Err(invalid("this thermostat has no fan control".into()));
                }
                if !state.allows_fan_mode(mode) {
                    return Err(invalid(format!("fan mode {mode} is not supported")));
                }
                changes.fan_mode = Some(mode.code());
            }
            Self::EnterAway => {
                check_setpoint("away heat", away.heat, state.heat_limits)?;
                check_setpoint("away cool", away.cool, state.cool_limits)?;
                changes.heat_setpoint = Some(away.heat);
                changes.cool_setpoint = Some(away.cool);
                changes.status_heat = Some(HoldStatus::Permanent.code());
                changes.status_cool = Some(HoldStatus::Permanent.code());
            }
            Self::ResumeSchedule => {
                changes.status_heat = Some(HoldStatus::Schedule.code());
                changes.status_cool = Some(HoldStatus::Schedule.code());
            }
        }

        Ok(changes)
    }
}

fn invalid(message: String) -> CoreError {
    CoreError::Validation { message }
}

fn check_setpoint(which: &str, temp: f64, limits: Option<SetpointLimits>) -> Result<(), CoreError> {
    if !temp.is_finite() {
        return Err(invalid(format!("{which} setpoint must be a number")));
    }
    match limits {
        Some(limits) if !limits.contains(temp) => Err(invalid(format!(
            "{which} setpoint {temp} is outside {}..={}",
            limits.min, limits.max
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    use crate::model::{EquipmentStatus, TemperatureUnit};

    fn state() -> DeviceState {
        DeviceState {
            device_id: 77,
            name: "Den".into(),
            live: true,
            current_temperature: Some(70.0),
            indoor_humidity: None,
            outdoor_temperature: None,
            outdoor_humidity: None,
            unit: TemperatureUnit::Fahrenheit,
            heat_setpoint: Some(68.0),
            cool_setpoint: Some(76.0),
            heat_limits: Some(SetpointLimits { min: 40.0, max: 90.0 }),
            cool_limits: Some(SetpointLimits { min: 50.0, max: 99.0 }),
            hold: HoldStatus::Schedule,
            system_mode: Some(SystemMode::Heat),
            allowed_modes: vec![SystemMode::Off, SystemMode::Heat, SystemMode::Cool],
            equipment: EquipmentStatus::Idle,
            has_fan: true,
            fan_mode: Some(FanMode::Auto),
            allowed_fan_modes: vec![FanMode::Auto, FanMode::On],
            fan_running: false,
            fetched_at: Utc::now(),
        }
    }

    fn changes(cmd: Command) -> Result<ControlChanges, CoreError> {
        cmd.to_changes(&state(), &AwaySetpoints::default())
    }

    #[test]
    fn heat_setpoint_is_temporary_hold() {
        let body = changes(Command::SetHeatSetpoint(66.0)).unwrap();
        let mut expected = ControlChanges::new(77);
        expected.heat_setpoint = Some(66.0);
        expected.status_heat = Some(1);
        assert_eq!(body, expected);
    }

    #[test]
    fn permanent_hold_is_kept() {
        let mut held = state();
        held.hold = HoldStatus::Permanent;
        let body = Command::SetCoolSetpoint(80.0)
            .to_changes(&held, &AwaySetpoints::default())
            .unwrap();
        assert_eq!(body.status_cool, Some(2));
        assert_eq!(body.heat_setpoint, None);
    }

    #[test]
    fn away_holds_both_setpoints_permanently() {
        let body = changes(Command::EnterAway).unwrap();
        assert_eq!(body.heat_setpoint, Some(61.0));
        assert_eq!(body.cool_setpoint, Some(88.0));
        assert_eq!(body.status_heat, Some(2));
        assert_eq!(body.status_cool, Some(2));
    }

    #[test]
    fn resume_clears_holds() {
        let body = changes(Command::ResumeSchedule).unwrap();
        assert_eq!(body.status_heat, Some(0));
        assert_eq!(body.status_cool, Some(0));
        assert_eq!(body.system_switch, None);
    }

    #[test]
    fn mode_and_fan_map_to_codes() {
        assert_eq!(
            changes(Command::SetSystemMode(SystemMode::Cool)).unwrap().system_switch,
            Some(3)
        );
        assert_eq!(
            changes(Command::SetFanMode(FanMode::On)).unwrap().fan_mode,
            Some(1)
        );
    }

    #[test]
    fn rejects_invalid_commands() {
        for cmd in [
            Command::SetHeatSetpoint(95.0),
            Command::SetHeatSetpoint(f64::NAN),
            Command::SetSetpointRange { low: 75.0, high: 70.0 },
            Command::SetSystemMode(SystemMode::Auto),
            Command::SetFanMode(FanMode::Circulate),
        ] {
            let err = changes(cmd).unwrap_err();
            assert!(matches!(err, CoreError::Validation { .. }), "{cmd:?}: {err:?}");
        }
    }

    #[test]
    fn unknown_limits_accept_any_finite_setpoint() {
        let mut open = state();
        open.heat_limits = None;
        assert!(
            Command::SetHeatSetpoint(120.0)
                .to_changes(&open, &AwaySetpoints::default())
                .is_ok()
        );
    }
}
