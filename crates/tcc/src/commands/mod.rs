//! Command dispatch: bridges CLI args -> core commands -> output formatting.

pub mod config_cmd;
pub mod control;
pub mod locations;
pub mod status;
pub mod watch;

use tcc_core::Account;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a portal-bound command to its handler.
pub async fn dispatch(
    cmd: Command,
    account: &Account,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Locations => {
            locations::handle(account, global);
            Ok(())
        }
        Command::Status { device } => status::handle(account, device, global),
        Command::Watch => watch::handle(account, global).await,
        Command::Set(args) => control::set(account, &args, global).await,
        Command::Away { device, state } => control::away(account, device, state, global).await,
        Command::Config(_) => unreachable!("config commands are handled without a session"),
    }
}
