// crates/signals/src/install.rs
#![allow(unsafe_code)]

use libc::{c_int, c_void, siginfo_t};
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction, signal};
use tracing::debug;

use crate::error::SignalError;
use crate::kind::SignalKind;
use crate::{CaptureConfig, fatal, flags, report};

extern "C" fn on_recoverable(sig: c_int, _info: *mut siginfo_t, _ctx: *mut c_void) {
    flags::record_recoverable(sig);
}

/// Re-entrant action for the recoverable set: nothing is masked while it
/// runs, so further deliveries of any signal are never held back.
pub(crate) fn recoverable_action(restart: bool) -> SigAction {
    let mut sa_flags = SaFlags::SA_SIGINFO | SaFlags::SA_NODEFER;
    if restart {
        sa_flags |= SaFlags::SA_RESTART;
    }
    SigAction::new(
        SigHandler::SigAction(on_recoverable),
        sa_flags,
        SigSet::empty(),
    )
}

/// One-shot action for the fatal set. `SA_NODEFER` lets the terminator
/// re-raise the same signal from inside the handler.
pub(crate) fn fatal_action() -> SigAction {
    SigAction::new(
        SigHandler::SigAction(fatal::on_fatal),
        SaFlags::SA_SIGINFO | SaFlags::SA_RESETHAND | SaFlags::SA_NODEFER,
        SigSet::empty(),
    )
}

fn register(kind: SignalKind, action: &SigAction) -> Result<(), SignalError> {
    // SAFETY: both handlers only touch atomics and async-signal-safe calls.
    unsafe { sigaction(kind.signal(), action) }
        .map(drop)
        .map_err(|source| SignalError::Install {
            signal: kind,
            source,
        })
}

/// Register every handler. Failures are collected rather than returned
/// early so one bad registration does not leave the rest uninstalled.
pub(crate) fn install(config: &CaptureConfig) -> Vec<SignalError> {
    let open_max = fatal::open_max_hint();
    fatal::configure(config.close_fds_on_fatal, open_max);
    debug!(
        target: "signals",
        open_max,
        close_fds = config.close_fds_on_fatal,
        "installing signal handlers"
    );

    let mut errors = Vec::new();
    let recoverable = recoverable_action(config.restart_syscalls);
    for kind in SignalKind::RECOVERABLE {
        if let Err(e) = register(kind, &recoverable) {
            errors.push(e);
        }
    }
    let fatal = fatal_action();
    for kind in SignalKind::FATAL {
        if let Err(e) = register(kind, &fatal) {
            errors.push(e);
        }
    }

    if config.ignore_sigpipe {
        // SAFETY: SIG_IGN runs no code.
        if let Err(e) = unsafe { signal(Signal::SIGPIPE, SigHandler::SigIgn) } {
            errors.push(SignalError::IgnorePipe(e));
        }
    }

    if config.panic_reporter {
        report::install_panic_reporter();
    }
    errors
}
