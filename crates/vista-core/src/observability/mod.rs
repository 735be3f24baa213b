mod log;

pub use log::{LogEntry, LogLevel, ParseLogLevelError};
