//! Logging support

use log::{debug, error, info, warn};

/// Enum that describes level associated with a log message
#[derive(Debug, Eq, PartialEq)]
pub enum LogLevels {
    /// Common error logging level
    Error,
    /// Common info logging level
    Info,
    /// Common warn logging level
    Warn,
    /// Common debug logging level
    Debug,
}

/// `log_message` forwards a message to the `log` facade at the given level. The application
/// decides where it goes (chaintool configures log4rs).
pub fn log_message(level: &LogLevels, message: &str) {
    match level {
        LogLevels::Error => error!("{}", message),
        LogLevels::Warn => warn!("{}", message),
        LogLevels::Info => info!("{}", message),
        LogLevels::Debug => debug!("{}", message),
    }
}
