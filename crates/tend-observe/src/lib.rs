//! Logging initialization for the agent.
//!
//! One call to [`init_logger`] installs a global tracing subscriber in the
//! configured format (text, JSON, or journald on Linux).
mod config;
pub use config::{LoggerConfig, LoggerFormat};

mod error;
pub use error::{LoggerError, LoggerResult};

mod init;
pub use init::init_logger;

mod level;
pub use level::LoggerLevel;

mod stamp;
pub use stamp::UtcRfc3339;
