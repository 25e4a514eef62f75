//! Device identity driver
//!
//! The engine never touches the OS directly; every identity read or mutation
//! goes through [`DeviceIdentityDriver`]. Each call may fail on its own and
//! carries a printable reason.

pub mod mac;
pub mod system;

pub use system::SystemDriver;

pub type DriverResult<T> = Result<T, DriverError>;

/// Driver failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    /// Command exited non-zero
    #[error("Command '{command}' failed ({exit_code}): {stderr}")]
    CommandFailed { command: String, exit_code: i32, stderr: String },
    /// Command could not be started
    #[error("Failed to run '{command}': {message}")]
    Spawn { command: String, message: String },
    /// Config file read/write failed
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },
    /// Command output did not contain the expected value
    #[error("Unexpected output: {0}")]
    Parse(String),
    /// Value cannot be written safely (e.g. contains a line break)
    #[error("Invalid value '{0}'")]
    InvalidValue(String),
}

/// Interface administrative state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Down,
    Up,
}

impl LinkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkState::Down => "down",
            LinkState::Up => "up",
        }
    }
}

/// Reads and mutates the device's advertised identity
pub trait DeviceIdentityDriver: Send + Sync {
    fn network_name(&self) -> DriverResult<String>;
    fn radio_name(&self) -> DriverResult<String>;
    /// `Ok(None)` when the interface has no readable hardware address
    fn hardware_address(&self) -> DriverResult<Option<String>>;

    /// Write the new network name; it takes effect on [`restart_network`](Self::restart_network)
    fn set_network_name(&self, name: &str) -> DriverResult<()>;
    /// Restart the access point so it advertises the configured name and address
    fn restart_network(&self) -> DriverResult<()>;
    fn set_radio_name(&self, name: &str) -> DriverResult<()>;
    fn set_hardware_address(&self, address: &str) -> DriverResult<()>;
    fn set_link(&self, state: LinkState) -> DriverResult<()>;
}
