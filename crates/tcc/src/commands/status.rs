//! Thermostat status views.

use std::fmt::Write as _;

use serde::Serialize;
use tabled::Tabled;

use tcc_core::{Account, DeviceId, DeviceState, Phase, PollOutcome, SystemMode};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

/// One device's outcome, as printed by `status`, `watch` and `set`.
#[derive(Debug, Serialize)]
pub struct StatusView {
    pub available: bool,
    pub phase: Phase,
    pub consecutive_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub state: DeviceState,
}

impl From<&PollOutcome> for StatusView {
    fn from(outcome: &PollOutcome) -> Self {
        Self {
            available: outcome.available,
            phase: outcome.phase,
            consecutive_failures: outcome.consecutive_failures,
            error: outcome.error.as_ref().map(ToString::to_string),
            state: (*outcome.state).clone(),
        }
    }
}

#[derive(Tabled)]
pub struct StatusRow {
    #[tabled(rename = "ID")]
    id: DeviceId,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "Temp")]
    temperature: String,
    #[tabled(rename = "Setpoint")]
    setpoint: String,
    #[tabled(rename = "Humidity")]
    humidity: String,
    #[tabled(rename = "Equipment")]
    equipment: String,
    #[tabled(rename = "Fan")]
    fan: String,
    #[tabled(rename = "Hold")]
    hold: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&StatusView> for StatusRow {
    fn from(view: &StatusView) -> Self {
        let s = &view.state;
        let unit = s.unit.to_string();
        Self {
            id: s.device_id,
            name: s.name.clone(),
            mode: s.system_mode.map_or_else(|| "-".into(), |m| m.to_string()),
            temperature: output::reading(s.current_temperature, &unit),
            setpoint: setpoint_label(s),
            humidity: output::reading(s.indoor_humidity, "%"),
            equipment: s.equipment.to_string(),
            fan: fan_label(s),
            hold: s.hold.to_string(),
            status: status_label(view),
        }
    }
}

fn setpoint_label(state: &DeviceState) -> String {
    let unit = state.unit.to_string();
    match state.system_mode {
        Some(SystemMode::Auto) => format!(
            "{} - {}",
            output::reading(state.heat_setpoint, &unit),
            output::reading(state.cool_setpoint, &unit)
        ),
        _ => output::reading(state.active_setpoint(), &unit),
    }
}

fn fan_label(state: &DeviceState) -> String {
    if !state.has_fan {
        return "-".into();
    }
    let mode = state.fan_mode.map_or_else(|| "?".into(), |m| m.to_string());
    if state.fan_running {
        format!("{mode} (running)")
    } else {
        mode
    }
}

fn status_label(view: &StatusView) -> String {
    match (view.available, view.consecutive_failures) {
        (false, n) => format!("unavailable ({n} failures)"),
        (true, 0) if view.state.live => "ok".into(),
        (true, 0) => "offline".into(),
        (true, n) => format!("stale ({n} failures)"),
    }
}

/// One-line summary used by `watch`.
pub fn summary(view: &StatusView) -> String {
    let s = &view.state;
    let unit = s.unit.to_string();
    format!(
        "{} ({}): {} {} -> {}, {} [{}]",
        s.name,
        s.device_id,
        s.system_mode.map_or_else(|| "-".into(), |m| m.to_string()),
        output::reading(s.current_temperature, &unit),
        setpoint_label(s),
        s.equipment,
        status_label(view)
    )
}

/// Multi-line detail view for a single device.
pub fn detail(view: &StatusView) -> String {
    let s = &view.state;
    let unit = s.unit.to_string();
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", s.name, s.device_id);
    let _ = writeln!(out, "  Status:       {}", status_label(view));
    let _ = writeln!(
        out,
        "  Mode:         {}",
        s.system_mode.map_or_else(|| "-".into(), |m| m.to_string())
    );
    let _ = writeln!(out, "  Temperature:  {}", output::reading(s.current_temperature, &unit));
    let _ = writeln!(out, "  Setpoint:     {} ({} hold)", setpoint_label(s), s.hold);
    let _ = writeln!(out, "  Humidity:     {}", output::reading(s.indoor_humidity, "%"));
    let _ = writeln!(
        out,
        "  Outdoor:      {} / {}",
        output::reading(s.outdoor_temperature, &unit),
        output::reading(s.outdoor_humidity, "%")
    );
    let _ = writeln!(out, "  Equipment:    {}", s.equipment);
    let _ = writeln!(out, "  Fan:          {}", fan_label(s));
    let _ = write!(out, "  Fetched:      {}", s.fetched_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if let Some(err) = &view.error {
        let _ = write!(out, "\n  Last error:   {err}");
    }
    out
}

/// Print one device in the selected format.
pub fn print_outcome(outcome: &PollOutcome, global: &GlobalOpts) {
    let view = StatusView::from(outcome);
    let out = output::render_single(global.output, &view, detail);
    output::print_output(&out, global.quiet);
}

/// Show what `connect` fetched; no extra portal calls are made.
pub fn handle(
    account: &Account,
    device: Option<DeviceId>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(id) = device {
        let device = account.device(id)?;
        print_outcome(&device.coordinator.latest(), global);
        return Ok(());
    }

    let views: Vec<StatusView> = account
        .devices()
        .iter()
        .map(|d| StatusView::from(&d.coordinator.latest()))
        .collect();
    let out = output::render_list(global.output, &views, |v| StatusRow::from(v));
    output::print_output(&out, global.quiet);
    Ok(())
}
