// src/run.rs

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use daemon::{DaemonConfig, Daemonizer, StdioPolicy, parse_config_file};
use logging::SubscriberConfig;
use nix::sys::stat::{Mode, umask};
use sd_notify::NotifyState;
use signals::{CaptureConfig, SignalCapture, initialize_signal_capture};
use tracing::{error, info, warn};

use crate::cli::Opts;

/// Why [`service_loop`] returned.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StopReason {
    Interrupt,
    Terminate,
}

/// Removes the pid file when the service stops.
struct PidFile {
    path: PathBuf,
}

impl PidFile {
    fn create(path: &Path) -> io::Result<Self> {
        fs::write(path, format!("{}\n", std::process::id())).map_err(|e| {
            io::Error::new(e.kind(), format!("{}: {e}", path.display()))
        })?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(target: "sentinel", "cannot remove {}: {e}", self.path.display());
        }
    }
}

fn notify(state: NotifyState<'_>) {
    let _ = sd_notify::notify(false, &[state]);
}

fn absolute(path: Option<PathBuf>) -> io::Result<Option<PathBuf>> {
    path.map(std::path::absolute).transpose()
}

fn load(config: Option<&Path>, overrides: &DaemonConfig) -> io::Result<DaemonConfig> {
    let file = match config {
        Some(path) => parse_config_file(path)?,
        None => DaemonConfig::default(),
    };
    Ok(file.merge(overrides.clone()))
}

fn subscriber_config(opts: &Opts, cfg: &DaemonConfig) -> SubscriberConfig {
    SubscriberConfig::builder()
        .format(cfg.log_format())
        .verbose(opts.verbose)
        .quiet(opts.quiet)
        .stderr(!cfg.detach())
        .log_file(cfg.log_file.clone())
        .syslog(cfg.syslog.unwrap_or(false))
        .journald(cfg.journald.unwrap_or(false))
        .timestamps(!cfg.detach())
        .build()
}

/// Poll `capture` every `interval` until an interrupt or termination
/// request arrives.
///
/// A hang-up calls `reload`, whose result replaces the interval. A failed
/// reload is logged and the previous interval kept.
pub fn service_loop<R>(capture: SignalCapture, mut interval: Duration, mut reload: R) -> StopReason
where
    R: FnMut() -> io::Result<Duration>,
{
    loop {
        if capture.poll_hup() {
            notify(NotifyState::Reloading);
            info!(target: "sentinel", "reloading configuration");
            match reload() {
                Ok(next) => interval = next,
                Err(e) => error!(target: "sentinel", "reload failed: {e}"),
            }
            notify(NotifyState::Ready);
        }
        if capture.poll_int() {
            info!(target: "sentinel", "interrupted");
            return StopReason::Interrupt;
        }
        if capture.poll_term() {
            info!(target: "sentinel", "termination requested");
            return StopReason::Terminate;
        }
        if capture.poll_abrt() {
            error!(target: "sentinel", "abort signal handled");
        }
        if capture.poll_segv() {
            error!(target: "sentinel", "segmentation fault handled");
        }
        thread::sleep(interval);
    }
}

/// Run the service described by `opts` until it is asked to stop.
///
/// When detaching, this returns only in the daemon; the invoking process
/// exits with status 0 once the daemon has been forked.
pub fn run(opts: &Opts) -> io::Result<()> {
    // relative paths would break once the daemon changes directory
    let config_path = absolute(opts.config.clone())?;
    let mut overrides = opts.overrides();
    overrides.pid_file = absolute(overrides.pid_file)?;
    overrides.log_file = absolute(overrides.log_file)?;

    let mut cfg = load(config_path.as_deref(), &overrides)?;
    cfg.pid_file = absolute(cfg.pid_file)?;
    cfg.log_file = absolute(cfg.log_file)?;

    let capture = initialize_signal_capture(
        CaptureConfig::builder()
            .close_fds_on_fatal(cfg.close_fds_on_crash())
            .build(),
    );

    let mask = cfg
        .umask
        .map(|m| Mode::from_bits_truncate(m as libc::mode_t));
    if cfg.detach() {
        // keep 0-2 off the log file and sockets opened after detaching
        let mut daemonizer = Daemonizer::new().stdio(StdioPolicy::DevNull);
        if let Some(mask) = mask {
            daemonizer = daemonizer.umask(mask);
        }
        if let Some(dir) = &cfg.working_dir {
            daemonizer = daemonizer.working_directory(dir);
        }
        daemonizer.start().map_err(io::Error::other)?;
    } else {
        if let Some(mask) = mask {
            umask(mask);
        }
        if let Some(dir) = &cfg.working_dir {
            std::env::set_current_dir(dir)?;
        }
    }

    logging::init(subscriber_config(opts, &cfg))?;

    let pid_file = cfg.pid_file.as_deref().map(PidFile::create).transpose()?;
    notify(NotifyState::Ready);
    info!(
        target: "sentinel",
        pid = std::process::id(),
        interval_ms = cfg.poll_interval().as_millis() as u64,
        "started"
    );

    let reason = service_loop(capture, cfg.poll_interval(), || {
        load(config_path.as_deref(), &overrides).map(|c| c.poll_interval())
    });

    notify(NotifyState::Stopping);
    info!(target: "sentinel", ?reason, "stopping");
    drop(pid_file);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::{Signal, raise};
    use serial_test::serial;
    use std::cell::Cell;

    fn capture() -> SignalCapture {
        let capture = initialize_signal_capture(CaptureConfig::default());
        while capture.poll_hup() || capture.poll_int() || capture.poll_term() {}
        capture
    }

    #[test]
    #[serial]
    fn hangup_reloads_before_termination() {
        let capture = capture();
        let reloads = Cell::new(0);
        raise(Signal::SIGHUP).unwrap();
        raise(Signal::SIGTERM).unwrap();
        let reason = service_loop(capture, Duration::from_millis(1), || {
            reloads.set(reloads.get() + 1);
            Ok(Duration::from_millis(2))
        });
        assert_eq!(reason, StopReason::Terminate);
        assert_eq!(reloads.get(), 1);
    }

    #[test]
    #[serial]
    fn interrupt_stops_the_loop() {
        let capture = capture();
        raise(Signal::SIGINT).unwrap();
        let reason = service_loop(capture, Duration::from_millis(1), || {
            panic!("no reload expected")
        });
        assert_eq!(reason, StopReason::Interrupt);
    }

    #[test]
    #[serial]
    fn failed_reload_keeps_running() {
        let capture = capture();
        let attempts = Cell::new(0);
        raise(Signal::SIGHUP).unwrap();
        let reason = service_loop(capture, Duration::from_millis(1), || {
            attempts.set(attempts.get() + 1);
            raise(Signal::SIGUSR2).unwrap();
            Err(io::Error::other("bad config"))
        });
        assert_eq!(reason, StopReason::Terminate);
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn pid_file_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.pid");
        let guard = PidFile::create(&path).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim(), std::process::id().to_string());
        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn config_file_values_yield_to_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.conf");
        fs::write(&path, "poll interval = 40\nsyslog = yes\n").unwrap();
        let overrides = DaemonConfig {
            poll_interval: Some(Duration::from_millis(10)),
            ..DaemonConfig::default()
        };
        let cfg = load(Some(&path), &overrides).unwrap();
        assert_eq!(cfg.poll_interval(), Duration::from_millis(10));
        assert_eq!(cfg.syslog, Some(true));
    }
}
