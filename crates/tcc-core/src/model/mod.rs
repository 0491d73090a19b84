// ── Domain model ──
//
// Typed views of what the portal reports. The wire shapes in `tcc_api`
// carry integer codes and optional fields; these carry enums and the
// derived values hosts actually display.

pub mod device;
pub mod location;

pub use device::{
    DeviceState, EquipmentStatus, FanMode, HoldStatus, SetpointLimits, SystemMode,
    TemperatureUnit,
};
pub use location::{DeviceSummary, Location};

pub use tcc_api::DeviceId;
