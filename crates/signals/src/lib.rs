// crates/signals/src/lib.rs
//! Signal capture for long-running processes.
//!
//! Handlers registered by [`initialize_signal_capture`] never lock, allocate
//! or log. Recoverable signals (`SIGHUP`, `SIGINT`, `SIGUSR1`, `SIGUSR2`,
//! `SIGTERM`) only set an atomic flag which ordinary code consumes through
//! the `poll_*` methods of [`SignalCapture`]. Fatal signals (`SIGABRT`,
//! `SIGBUS`, `SIGFPE`, `SIGSEGV`) restore the default dispositions, close
//! inherited descriptors and terminate so that a core image is produced.
//!
//! The flags live in static storage for the lifetime of the process. There
//! is no teardown: handlers stay installed until exit.
//!
//! ```no_run
//! use signals::{CaptureConfig, initialize_signal_capture};
//!
//! let capture = initialize_signal_capture(CaptureConfig::default());
//! loop {
//!     if capture.poll_term() || capture.poll_int() {
//!         break;
//!     }
//!     if capture.poll_hup() {
//!         // reload configuration
//!     }
//!     std::thread::sleep(std::time::Duration::from_millis(100));
//! }
//! ```

use std::sync::OnceLock;

use tracing::{debug, error};

mod error;
pub mod fatal;
mod flags;
mod install;
mod kind;
mod report;

pub use error::SignalError;
pub use fatal::{Terminator, reset_terminator, set_terminator};
pub use kind::SignalKind;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CaptureConfig {
    pub close_fds_on_fatal: bool,
    pub ignore_sigpipe: bool,
    pub restart_syscalls: bool,
    pub panic_reporter: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            close_fds_on_fatal: true,
            ignore_sigpipe: true,
            restart_syscalls: false,
            panic_reporter: true,
        }
    }
}

#[derive(Default)]
pub struct CaptureConfigBuilder {
    cfg: CaptureConfig,
}

impl CaptureConfig {
    pub fn builder() -> CaptureConfigBuilder {
        CaptureConfigBuilder::default()
    }
}

impl CaptureConfigBuilder {
    pub fn close_fds_on_fatal(mut self, close: bool) -> Self {
        self.cfg.close_fds_on_fatal = close;
        self
    }

    pub fn ignore_sigpipe(mut self, ignore: bool) -> Self {
        self.cfg.ignore_sigpipe = ignore;
        self
    }

    pub fn restart_syscalls(mut self, restart: bool) -> Self {
        self.cfg.restart_syscalls = restart;
        self
    }

    pub fn panic_reporter(mut self, report: bool) -> Self {
        self.cfg.panic_reporter = report;
        self
    }

    pub fn build(self) -> CaptureConfig {
        self.cfg
    }
}

/// Capability to consume captured signals.
///
/// Obtained from [`initialize_signal_capture`]; holding one proves the
/// handlers are installed. Every poll atomically swaps its flag with
/// `false` and returns the previous value, so a delivery is reported by
/// exactly one poll no matter how many threads poll concurrently.
/// Repeated deliveries between two polls are reported once.
#[derive(Clone, Copy, Debug)]
pub struct SignalCapture {
    _installed: (),
}

impl SignalCapture {
    pub fn poll_hup(&self) -> bool {
        flags::take(SignalKind::Hup)
    }

    pub fn poll_int(&self) -> bool {
        flags::take(SignalKind::Int)
    }

    /// Also reports `SIGUSR2` and any unexpected signal routed to the
    /// recoverable handler.
    pub fn poll_term(&self) -> bool {
        flags::take(SignalKind::Term)
    }

    /// Only observable when the fatal terminator returns, see
    /// [`set_terminator`].
    pub fn poll_abrt(&self) -> bool {
        flags::take(SignalKind::Abrt)
    }

    pub fn poll_segv(&self) -> bool {
        flags::take(SignalKind::Segv)
    }
}

static INSTALLED: OnceLock<SignalCapture> = OnceLock::new();

/// Install the process-wide handlers and return the polling capability.
///
/// Only the first call registers handlers; later calls return the same
/// capability and ignore `config`. Registration failures are logged and do
/// not prevent the remaining handlers from being installed.
pub fn initialize_signal_capture(config: CaptureConfig) -> SignalCapture {
    let mut first = false;
    let capture = *INSTALLED.get_or_init(|| {
        first = true;
        for err in install::install(&config) {
            error!(target: "signals", "{err}");
        }
        SignalCapture { _installed: () }
    });
    if !first {
        debug!(target: "signals", "signal capture already initialized");
    }
    capture
}

/// Whether [`initialize_signal_capture`] has run in this process.
pub fn is_installed() -> bool {
    INSTALLED.get().is_some()
}
