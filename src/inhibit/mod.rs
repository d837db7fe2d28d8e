//! Inhibition leases held against the desktop's idle services.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub mod lifecycle;
pub mod session;

pub use lifecycle::{Caffeinator, RunError};
pub use session::SessionBus;

/// One of the two services that must both be inhibited to keep the
/// desktop awake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InhibitTarget {
    PowerManagement,
    ScreenSaver,
}

impl InhibitTarget {
    pub fn service(self) -> &'static str {
        match self {
            InhibitTarget::PowerManagement => "org.freedesktop.PowerManagement",
            InhibitTarget::ScreenSaver => "org.freedesktop.ScreenSaver",
        }
    }

    pub fn object_path(self) -> &'static str {
        match self {
            InhibitTarget::PowerManagement => "/org/freedesktop/PowerManagement/Inhibit",
            InhibitTarget::ScreenSaver => "/org/freedesktop/ScreenSaver",
        }
    }
}

impl fmt::Display for InhibitTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.service())
    }
}

/// A granted inhibition: the cookie is only meaningful to the service that
/// issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Lease {
    pub target: InhibitTarget,
    pub cookie: u32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InhibitError {
    #[error("session bus unavailable: {0}")]
    Transport(String),

    #[error("{target} call failed: {message}")]
    Call {
        target: InhibitTarget,
        message: String,
    },
}

/// Remote side of the inhibit protocol.
///
/// `connect` obtains the shared bus handle; the other calls assume it has
/// succeeded at least once.
#[async_trait]
pub trait InhibitBackend: Send + Sync + 'static {
    async fn connect(&self) -> Result<(), InhibitError>;

    async fn inhibit(
        &self,
        target: InhibitTarget,
        app_name: &str,
        reason: &str,
    ) -> Result<u32, InhibitError>;

    async fn uninhibit(&self, lease: Lease) -> Result<(), InhibitError>;
}
