// tcc-core: polling, stale-serve and command retries over `tcc-api`.

pub mod account;
pub mod command;
pub mod config;
pub mod convert;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod model;
pub mod streak;

// ── Primary re-exports ──────────────────────────────────────────────
pub use account::{Account, Device};
pub use command::Command;
pub use config::{AccountConfig, AwaySetpoints, DEFAULT_FAILURE_THRESHOLD, DEFAULT_POLL_INTERVAL};
pub use coordinator::{Coordinator, Phase, PollOutcome};
pub use error::CoreError;
pub use executor::{CommandExecutor, RefreshTarget};
pub use streak::ErrorStreak;

pub use model::{
    DeviceId, DeviceState, DeviceSummary, EquipmentStatus, FanMode, HoldStatus, Location,
    SetpointLimits, SystemMode, TemperatureUnit,
};

// Client types hosts need to build an `AccountConfig`.
pub use tcc_api::{Credentials, DEFAULT_BASE_URL, RetryPolicy};
