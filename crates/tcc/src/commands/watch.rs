//! Continuous polling until Ctrl-C.

use tokio::sync::mpsc;

use tcc_core::{Account, PollOutcome};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::status::{self, StatusView};

pub async fn handle(account: &Account, global: &GlobalOpts) -> Result<(), CliError> {
    let (tx, mut rx) = mpsc::unbounded_channel::<PollOutcome>();

    for device in account.devices() {
        let mut outcomes = device.coordinator.subscribe();
        let tx = tx.clone();
        tokio::spawn(async move {
            while outcomes.changed().await.is_ok() {
                let outcome = outcomes.borrow_and_update().clone();
                if tx.send(outcome).is_err() {
                    break;
                }
            }
        });
    }
    drop(tx);

    account.spawn().await;
    tracing::info!(
        devices = account.devices().len(),
        interval_secs = account.config().poll_interval.as_secs(),
        "watching"
    );

    for device in account.devices() {
        print(&device.coordinator.latest(), global);
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("interrupted");
                return Ok(());
            }
            next = rx.recv() => match next {
                Some(outcome) => print(&outcome, global),
                None => return Ok(()),
            },
        }
    }
}

/// One line per outcome: a row-shaped summary, or compact JSON.
fn print(outcome: &PollOutcome, global: &GlobalOpts) {
    let view = StatusView::from(outcome);
    let line = match global.output {
        OutputFormat::Table => format!(
            "{} {}",
            chrono::Utc::now().format("%H:%M:%S"),
            status::summary(&view)
        ),
        OutputFormat::Json | OutputFormat::JsonCompact => {
            output::render_single(OutputFormat::JsonCompact, &view, |_| String::new())
        }
    };
    output::print_output(&line, global.quiet);
}
