use std::{
    sync::mpsc::{self, Receiver},
    time::Duration,
};

use anyhow::{Context, Result};
use gob_config::ConfigManager;
use gob_core::{Controller, HealthReport, ServiceManager, UnixProcessManager};
use tokio::signal::unix::{signal as unix_signal, SignalKind};

use crate::logger::Logger;

pub async fn run(config: ConfigManager, hold: Option<u64>, json: bool) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
    let hold = hold.map(Duration::from_secs);

    // Services run in their own process groups and never see signals sent to
    // gob, so termination has to be turned into a stop of every service.
    let mut sigterm = unix_signal(SignalKind::terminate())
        .context("failed to install the SIGTERM handler")?;
    let mut sigint = unix_signal(SignalKind::interrupt())
        .context("failed to install the SIGINT handler")?;

    let mut session =
        tokio::task::spawn_blocking(move || supervise(&config, hold, &shutdown_rx, json));

    tokio::select! {
        result = &mut session => return result?,
        _ = sigterm.recv() => {
            tracing::info!("SIGTERM: stopping services...");
            let _ = shutdown_tx.send(());
        }
        _ = sigint.recv() => {
            tracing::info!("Ctrl+C: stopping services...");
            let _ = shutdown_tx.send(());
        }
    }

    session.await?
}

/// Blocking part of `run`: the whole controller session lives on this thread.
fn supervise(
    config: &ConfigManager,
    hold: Option<Duration>,
    shutdown: &Receiver<()>,
    json: bool,
) -> Result<()> {
    let settings = config.controller().clone();
    let services = ServiceManager::from_config(UnixProcessManager::new(), config);
    let controller = Controller::new(&services, settings);
    let mut logger = Logger::default();

    logger.system(&format!(
        "{} managing {} service(s)",
        controller.settings().name,
        services.len()
    ));

    let session = controller.session();
    let report = session.run();
    print_report(&mut logger, "System health", &report, json)?;

    match hold {
        Some(hold) => {
            let _ = shutdown.recv_timeout(hold);
        }
        None => {
            let _ = shutdown.recv();
        }
    }

    let report = session.finish();
    print_report(&mut logger, "All services stopped", &report, json)?;

    Ok(())
}

fn print_report(logger: &mut Logger, title: &str, report: &HealthReport, json: bool) -> Result<()> {
    if json {
        logger.json(report)?;
    } else {
        logger.system(title);
        logger.health(report);
    }

    Ok(())
}
