//! Location listing.

use serde::Serialize;
use tabled::Tabled;

use tcc_core::{Account, DeviceId};

use crate::cli::GlobalOpts;
use crate::output;

#[derive(Debug, Serialize)]
struct DeviceEntry<'a> {
    location_id: u64,
    location: &'a str,
    device_id: DeviceId,
    name: &'a str,
    mac: Option<&'a str>,
    alive: bool,
    managed: bool,
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Device ID")]
    device_id: DeviceId,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Alive")]
    alive: &'static str,
    #[tabled(rename = "Managed")]
    managed: &'static str,
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

pub fn handle(account: &Account, global: &GlobalOpts) {
    let entries: Vec<DeviceEntry<'_>> = account
        .locations()
        .iter()
        .flat_map(|location| {
            location.devices.iter().map(move |device| DeviceEntry {
                location_id: location.id,
                location: &location.name,
                device_id: device.id,
                name: &device.name,
                mac: device.mac.as_deref(),
                alive: device.alive,
                managed: account.config().manages(device.id),
            })
        })
        .collect();

    let out = output::render_list(global.output, &entries, |e| DeviceRow {
        location: format!("{} ({})", e.location, e.location_id),
        device_id: e.device_id,
        name: e.name.to_owned(),
        mac: e.mac.unwrap_or("-").to_owned(),
        alive: yes_no(e.alive),
        managed: yes_no(e.managed),
    });
    output::print_output(&out, global.quiet);
}
