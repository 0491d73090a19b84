mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tcc_config::Config;
use tcc_core::{Account, AccountConfig};

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a portal session
        Command::Config(args) => commands::config_cmd::handle(&args, &cli.global),

        cmd => {
            let account_config = build_account_config(&cli.global)?;
            let account = Account::connect(account_config).await?;

            tracing::debug!(command = ?cmd, "dispatching command");
            let result = commands::dispatch(cmd, &account, &cli.global).await;
            account.shutdown().await;
            result
        }
    }
}

fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let config = match &global.config {
        Some(path) => tcc_config::load_config_from(path)?,
        None => tcc_config::load_config()?,
    };
    Ok(config)
}

/// Resolve the selected profile into an `AccountConfig`.
fn build_account_config(global: &GlobalOpts) -> Result<AccountConfig, CliError> {
    let config = load_config(global)?;
    let (name, profile) = tcc_config::select_profile(&config, global.profile.as_deref())?;
    tracing::debug!(profile = name, "using profile");
    Ok(tcc_config::profile_to_account_config(profile, name)?)
}
