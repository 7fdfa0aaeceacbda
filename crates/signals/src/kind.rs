// crates/signals/src/kind.rs

use std::fmt;

use libc::c_int;
use nix::sys::signal::Signal;

/// The signals monitored by the capture layer.
///
/// Each kind owns one slot in the pending-flag table. The mapping from raw
/// signal numbers happens once, here, so handlers never switch on OS
/// constants directly.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SignalKind {
    Hup,
    Int,
    Usr1,
    Usr2,
    Term,
    Abrt,
    Bus,
    Fpe,
    Segv,
}

impl SignalKind {
    pub const COUNT: usize = 9;

    pub const ALL: [SignalKind; Self::COUNT] = [
        SignalKind::Hup,
        SignalKind::Int,
        SignalKind::Usr1,
        SignalKind::Usr2,
        SignalKind::Term,
        SignalKind::Abrt,
        SignalKind::Bus,
        SignalKind::Fpe,
        SignalKind::Segv,
    ];

    /// Signals that leave the process in a usable state.
    pub const RECOVERABLE: [SignalKind; 5] = [
        SignalKind::Hup,
        SignalKind::Int,
        SignalKind::Usr1,
        SignalKind::Usr2,
        SignalKind::Term,
    ];

    /// Signals that mean the process state can no longer be trusted.
    pub const FATAL: [SignalKind; 4] = [
        SignalKind::Abrt,
        SignalKind::Bus,
        SignalKind::Fpe,
        SignalKind::Segv,
    ];

    pub(crate) const fn slot(self) -> usize {
        match self {
            SignalKind::Hup => 0,
            SignalKind::Int => 1,
            SignalKind::Usr1 => 2,
            SignalKind::Usr2 => 3,
            SignalKind::Term => 4,
            SignalKind::Abrt => 5,
            SignalKind::Bus => 6,
            SignalKind::Fpe => 7,
            SignalKind::Segv => 8,
        }
    }

    /// Map a raw signal number. Only plain integer comparisons, so this is
    /// usable from inside a handler.
    pub const fn from_raw(sig: c_int) -> Option<SignalKind> {
        match sig {
            libc::SIGHUP => Some(SignalKind::Hup),
            libc::SIGINT => Some(SignalKind::Int),
            libc::SIGUSR1 => Some(SignalKind::Usr1),
            libc::SIGUSR2 => Some(SignalKind::Usr2),
            libc::SIGTERM => Some(SignalKind::Term),
            libc::SIGABRT => Some(SignalKind::Abrt),
            libc::SIGBUS => Some(SignalKind::Bus),
            libc::SIGFPE => Some(SignalKind::Fpe),
            libc::SIGSEGV => Some(SignalKind::Segv),
            _ => None,
        }
    }

    pub const fn raw(self) -> c_int {
        match self {
            SignalKind::Hup => libc::SIGHUP,
            SignalKind::Int => libc::SIGINT,
            SignalKind::Usr1 => libc::SIGUSR1,
            SignalKind::Usr2 => libc::SIGUSR2,
            SignalKind::Term => libc::SIGTERM,
            SignalKind::Abrt => libc::SIGABRT,
            SignalKind::Bus => libc::SIGBUS,
            SignalKind::Fpe => libc::SIGFPE,
            SignalKind::Segv => libc::SIGSEGV,
        }
    }

    pub const fn signal(self) -> Signal {
        match self {
            SignalKind::Hup => Signal::SIGHUP,
            SignalKind::Int => Signal::SIGINT,
            SignalKind::Usr1 => Signal::SIGUSR1,
            SignalKind::Usr2 => Signal::SIGUSR2,
            SignalKind::Term => Signal::SIGTERM,
            SignalKind::Abrt => Signal::SIGABRT,
            SignalKind::Bus => Signal::SIGBUS,
            SignalKind::Fpe => Signal::SIGFPE,
            SignalKind::Segv => Signal::SIGSEGV,
        }
    }

    pub const fn is_fatal(self) -> bool {
        matches!(
            self,
            SignalKind::Abrt | SignalKind::Bus | SignalKind::Fpe | SignalKind::Segv
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            SignalKind::Hup => "SIGHUP",
            SignalKind::Int => "SIGINT",
            SignalKind::Usr1 => "SIGUSR1",
            SignalKind::Usr2 => "SIGUSR2",
            SignalKind::Term => "SIGTERM",
            SignalKind::Abrt => "SIGABRT",
            SignalKind::Bus => "SIGBUS",
            SignalKind::Fpe => "SIGFPE",
            SignalKind::Segv => "SIGSEGV",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SignalKind> for Signal {
    fn from(kind: SignalKind) -> Self {
        kind.signal()
    }
}
