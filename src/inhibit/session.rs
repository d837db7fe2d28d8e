use super::{InhibitBackend, InhibitError, InhibitTarget, Lease};
use async_trait::async_trait;
use tokio::sync::OnceCell;
use zbus::{Connection, proxy};

#[proxy(
    interface = "org.freedesktop.PowerManagement.Inhibit",
    default_service = "org.freedesktop.PowerManagement",
    default_path = "/org/freedesktop/PowerManagement/Inhibit",
    gen_blocking = false
)]
trait PowerManagementInhibit {
    fn inhibit(&self, application: &str, reason: &str) -> zbus::Result<u32>;

    #[zbus(name = "UnInhibit")]
    fn un_inhibit(&self, cookie: u32) -> zbus::Result<()>;
}

#[proxy(
    interface = "org.freedesktop.ScreenSaver",
    default_service = "org.freedesktop.ScreenSaver",
    default_path = "/org/freedesktop/ScreenSaver",
    gen_blocking = false
)]
trait ScreenSaver {
    fn inhibit(&self, application_name: &str, reason_for_inhibit: &str) -> zbus::Result<u32>;

    #[zbus(name = "UnInhibit")]
    fn un_inhibit(&self, cookie: u32) -> zbus::Result<()>;
}

/// Inhibit backend talking to the real services over the session bus.
///
/// The connection is process wide: established once (or handed over from the
/// service that exported the runner) and only read afterwards.
#[derive(Debug, Default)]
pub struct SessionBus {
    connection: OnceCell<Connection>,
}

impl SessionBus {
    /// Reuse an already established connection
    pub fn with_connection(connection: Connection) -> Self {
        Self {
            connection: OnceCell::new_with(Some(connection)),
        }
    }

    async fn connection(&self) -> Result<&Connection, InhibitError> {
        self.connection
            .get_or_try_init(Connection::session)
            .await
            .map_err(|e| InhibitError::Transport(e.to_string()))
    }
}

async fn power_management(conn: &Connection) -> zbus::Result<PowerManagementInhibitProxy<'static>> {
    let target = InhibitTarget::PowerManagement;
    PowerManagementInhibitProxy::builder(conn)
        .destination(target.service())?
        .path(target.object_path())?
        .build()
        .await
}

async fn screen_saver(conn: &Connection) -> zbus::Result<ScreenSaverProxy<'static>> {
    let target = InhibitTarget::ScreenSaver;
    ScreenSaverProxy::builder(conn)
        .destination(target.service())?
        .path(target.object_path())?
        .build()
        .await
}

fn call_error(target: InhibitTarget, err: zbus::Error) -> InhibitError {
    InhibitError::Call {
        target,
        message: err.to_string(),
    }
}

#[async_trait]
impl InhibitBackend for SessionBus {
    async fn connect(&self) -> Result<(), InhibitError> {
        self.connection().await.map(|_| ())
    }

    async fn inhibit(
        &self,
        target: InhibitTarget,
        app_name: &str,
        reason: &str,
    ) -> Result<u32, InhibitError> {
        let conn = self.connection().await?;
        let result = match target {
            InhibitTarget::PowerManagement => match power_management(conn).await {
                Ok(proxy) => proxy.inhibit(app_name, reason).await,
                Err(e) => Err(e),
            },
            InhibitTarget::ScreenSaver => match screen_saver(conn).await {
                Ok(proxy) => proxy.inhibit(app_name, reason).await,
                Err(e) => Err(e),
            },
        };
        result.map_err(|e| call_error(target, e))
    }

    async fn uninhibit(&self, lease: Lease) -> Result<(), InhibitError> {
        let conn = self.connection().await?;
        let result = match lease.target {
            InhibitTarget::PowerManagement => match power_management(conn).await {
                Ok(proxy) => proxy.un_inhibit(lease.cookie).await,
                Err(e) => Err(e),
            },
            InhibitTarget::ScreenSaver => match screen_saver(conn).await {
                Ok(proxy) => proxy.un_inhibit(lease.cookie).await,
                Err(e) => Err(e),
            },
        };
        result.map_err(|e| call_error(lease.target, e))
    }
}
