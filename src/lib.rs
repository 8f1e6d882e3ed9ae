pub mod backend;
pub mod config;
pub mod env;
pub mod init;
pub mod logger;
pub mod memory;
pub mod notify;
pub mod outcome;
pub mod record;
pub mod registry;
pub mod resolver;
pub mod retention;
pub mod scaffold;
pub mod store;

#[cfg(feature = "google")]
pub mod google;

pub use config::LoggerConfig;
pub use logger::{LogReport, LoggerError, SheetLogger};
pub use outcome::{Outcome, SkipReason};
pub use registry::LoggerRegistry;
