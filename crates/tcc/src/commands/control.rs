//! Setpoint, mode and hold changes.

use tcc_core::{Account, Command, DeviceId};

use crate::cli::{AwayState, GlobalOpts, SetArgs};
use crate::error::CliError;

use super::status;

/// Commands for `set`, in the order they are sent.
fn set_commands(args: &SetArgs) -> Vec<Command> {
    let mut commands = Vec::new();
    if let Some(mode) = args.mode {
        commands.push(Command::SetSystemMode(mode));
    }
    match (args.heat, args.cool) {
        (Some(low), Some(high)) => commands.push(Command::SetSetpointRange { low, high }),
        (Some(heat), None) => commands.push(Command::SetHeatSetpoint(heat)),
        (None, Some(cool)) => commands.push(Command::SetCoolSetpoint(cool)),
        (None, None) => {}
    }
    if let Some(fan) = args.fan {
        commands.push(Command::SetFanMode(fan));
    }
    commands
}

pub async fn set(account: &Account, args: &SetArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let commands = set_commands(args);
    if commands.is_empty() {
        return Err(CliError::InvalidCommand {
            message: "nothing to change: pass --heat, --cool, --mode or --fan".into(),
        });
    }
    run(account, args.device, &commands, global).await
}

pub async fn away(
    account: &Account,
    device: DeviceId,
    state: AwayState,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let command = match state {
        AwayState::On => Command::EnterAway,
        AwayState::Off => Command::ResumeSchedule,
    };
    run(account, device, &[command], global).await
}

/// Execute `commands` in order, then fetch and print the new state.
async fn run(
    account: &Account,
    device_id: DeviceId,
    commands: &[Command],
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let device = account.device(device_id)?;
    for command in commands {
        device.executor.execute(*command).await?;
        if !global.quiet {
            eprintln!("{} applied", command.label());
        }
    }

    let outcome = device.coordinator.poll().await;
    status::print_outcome(&outcome, global);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcc_core::{FanMode, SystemMode};

    fn args() -> SetArgs {
        SetArgs {
            device: 1,
            heat: None,
            cool: None,
            mode: None,
            fan: None,
        }
    }

    #[test]
    fn mode_goes_before_setpoints() {
        let commands = set_commands(&SetArgs {
            mode: Some(SystemMode::Auto),
            heat: Some(66.0),
            cool: Some(76.0),
            fan: Some(FanMode::Auto),
            ..args()
        });
        assert_eq!(
            commands,
            vec![
                Command::SetSystemMode(SystemMode::Auto),
                Command::SetSetpointRange { low: 66.0, high: 76.0 },
                Command::SetFanMode(FanMode::Auto),
            ]
        );
    }

    #[test]
    fn single_setpoint() {
        let commands = set_commands(&SetArgs {
            cool: Some(74.0),
            ..args()
        });
        assert_eq!(commands, vec![Command::SetCoolSetpoint(74.0)]);
    }

    #[test]
    fn empty_set_builds_nothing() {
        assert!(set_commands(&args()).is_empty());
    }
}
