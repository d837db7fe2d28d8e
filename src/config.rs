/// Well-known name the runner claims on the session bus.
pub const DEFAULT_BUS_NAME: &str = "uk.matthew-jones.krunner-caffeinate";
/// Object path KRunner expects the runner interface at.
pub const DEFAULT_OBJECT_PATH: &str = "/krunner";
/// Application name passed to both inhibit services.
pub const DEFAULT_APP_NAME: &str = "Caffeinate";
/// Human readable reason passed to both inhibit services.
pub const DEFAULT_REASON: &str = "user triggered";

/// Identity of the running plugin and the arguments it sends with every
/// inhibit request.
///
/// There is no config file; the defaults are the fixed identity and the
/// command line may override the bus name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    pub bus_name: String,
    pub object_path: String,
    pub app_name: String,
    pub reason: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            bus_name: DEFAULT_BUS_NAME.to_string(),
            object_path: DEFAULT_OBJECT_PATH.to_string(),
            app_name: DEFAULT_APP_NAME.to_string(),
            reason: DEFAULT_REASON.to_string(),
        }
    }
}

impl RunnerConfig {
    /// Override the well-known bus name
    pub fn with_bus_name(mut self, bus_name: impl Into<String>) -> Self {
        self.bus_name = bus_name.into();
        self
    }
}
