// crates/logging/src/lib.rs
//! Log output for `oc-sentineld`.
//!
//! A detached daemon has no terminal, so besides stderr the subscriber can
//! append to a log file and forward records to syslog or journald.

mod flags;
mod formatter;
mod json_format;
mod sink;
mod subscriber;

pub use flags::{DEFAULT_IDENT, LogFormat, SubscriberConfig, SubscriberConfigBuilder};
pub use formatter::DaemonFormatter;
pub use json_format::JsonFormatter;
pub use subscriber::{JOURNALD_PATH_ENV, SYSLOG_PATH_ENV, init, subscriber};
