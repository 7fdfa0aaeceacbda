// crates/daemon/src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use logging::LogFormat;

/// Settings read from `oc-sentineld.conf` or the command line.
///
/// Every field is optional so a file and a set of overrides can be merged
/// without losing track of what was actually specified.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    pub pid_file: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub log_format: Option<LogFormat>,
    pub syslog: Option<bool>,
    pub journald: Option<bool>,
    pub working_dir: Option<PathBuf>,
    pub umask: Option<u32>,
    pub poll_interval: Option<Duration>,
    pub close_fds_on_crash: Option<bool>,
    pub detach: Option<bool>,
}

impl DaemonConfig {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

    /// Values present in `overrides` win.
    pub fn merge(self, overrides: DaemonConfig) -> DaemonConfig {
        DaemonConfig {
            pid_file: overrides.pid_file.or(self.pid_file),
            log_file: overrides.log_file.or(self.log_file),
            log_format: overrides.log_format.or(self.log_format),
            syslog: overrides.syslog.or(self.syslog),
            journald: overrides.journald.or(self.journald),
            working_dir: overrides.working_dir.or(self.working_dir),
            umask: overrides.umask.or(self.umask),
            poll_interval: overrides.poll_interval.or(self.poll_interval),
            close_fds_on_crash: overrides.close_fds_on_crash.or(self.close_fds_on_crash),
            detach: overrides.detach.or(self.detach),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval.unwrap_or(Self::DEFAULT_POLL_INTERVAL)
    }

    pub fn detach(&self) -> bool {
        self.detach.unwrap_or(true)
    }

    pub fn close_fds_on_crash(&self) -> bool {
        self.close_fds_on_crash.unwrap_or(true)
    }

    pub fn log_format(&self) -> LogFormat {
        self.log_format.unwrap_or(LogFormat::Text)
    }
}
