//! Session bus service: exports the runner and owns the well-known name
//! for the lifetime of the process.

use anyhow::{Context, Result, bail};
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use zbus::Connection;
use zbus::fdo::{RequestNameFlags, RequestNameReply};

use crate::config::RunnerConfig;
use crate::inhibit::{Caffeinator, SessionBus};
use crate::ui::prelude::*;

pub mod krunner;

use krunner::Runner;

/// Serve the runner until SIGINT or SIGTERM.
///
/// Fails fast if the bus is unreachable or the name is already owned.
pub async fn serve(config: RunnerConfig) -> Result<()> {
    let connection = Connection::session()
        .await
        .context("Failed to connect to the session bus")?;

    let backend = Arc::new(SessionBus::with_connection(connection.clone()));
    let runner = Runner::new(Caffeinator::new(backend, config.clone()));

    connection
        .object_server()
        .at(config.object_path.as_str(), runner)
        .await
        .with_context(|| format!("Failed to export runner at {}", config.object_path))?;

    let reply = connection
        .request_name_with_flags(config.bus_name.as_str(), RequestNameFlags::DoNotQueue.into())
        .await;
    check_name_reply(&config.bus_name, reply)?;

    emit(
        Level::Success,
        "service.ready",
        &format!(
            "Serving org.kde.krunner1 at {} as {}",
            config.object_path, config.bus_name
        ),
        None,
    );

    wait_for_shutdown().await?;

    // Dropping the connection releases the name; the inhibit services drop
    // leases held by a client that disconnects.
    emit(
        Level::Info,
        "service.stopped",
        "Runner stopped, pending inhibitions end with the connection",
        None,
    );
    Ok(())
}

/// Only sole ownership of the name counts; with `DoNotQueue` anything else
/// means another process already serves it.
fn check_name_reply(name: &str, reply: zbus::Result<RequestNameReply>) -> Result<()> {
    match reply {
        Ok(RequestNameReply::PrimaryOwner) | Ok(RequestNameReply::AlreadyOwner) => Ok(()),
        Ok(other) => bail!("Bus name {} is already taken ({:?})", name, other),
        Err(zbus::Error::NameTaken) => bail!("Bus name {} is already taken", name),
        Err(e) => Err(e).with_context(|| format!("Failed to request bus name {}", name)),
    }
}

async fn wait_for_shutdown() -> Result<()> {
    let mut sigint =
        signal(SignalKind::interrupt()).context("Failed to set up SIGINT handler")?;
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to set up SIGTERM handler")?;

    tokio::select! {
        _ = sigint.recv() => {
            emit(Level::Info, "service.signal", "Received SIGINT, shutting down", None);
        }
        _ = sigterm.recv() => {
            emit(Level::Info, "service.signal", "Received SIGTERM, shutting down", None);
        }
    }
    Ok(())
}
