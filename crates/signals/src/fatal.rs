// crates/signals/src/fatal.rs
//! Best-effort cleanup then abnormal termination.
//!
//! Everything reachable from [`on_fatal`] runs inside a signal handler and
//! is restricted to async-signal-safe calls: `sigaction`, `close`,
//! `pthread_sigmask`, `raise` and `abort`. No allocation, no locks, no
//! logging.
#![allow(unsafe_code)]

use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicPtr, Ordering};

use libc::{c_int, c_void, siginfo_t};
use nix::sys::signal::{
    SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, pthread_sigmask, raise, sigaction,
};

use crate::flags;
use crate::kind::SignalKind;

/// Called as the last step of the fatal handler.
///
/// The default, [`dump_core`], does not return. A replacement that returns
/// makes the handler return too; the one-shot disposition is already reset
/// by then, so the next identical signal is handled by the OS.
pub type Terminator = fn(SignalKind);

/// Descriptor scan bound used when `sysconf` cannot report one.
pub(crate) const DEFAULT_OPEN_MAX: c_int = 1024;
/// Upper bound on the descriptor scan, whatever `RLIMIT_NOFILE` says.
pub(crate) const FD_SCAN_LIMIT: c_int = 1 << 16;

static CLOSE_FDS: AtomicBool = AtomicBool::new(true);
static OPEN_MAX: AtomicI32 = AtomicI32::new(DEFAULT_OPEN_MAX);
static TERMINATOR: AtomicPtr<()> = AtomicPtr::new(ptr::null_mut());

/// Replace the terminator invoked by the fatal handler.
pub fn set_terminator(terminator: Terminator) {
    TERMINATOR.store(terminator as *mut (), Ordering::SeqCst);
}

/// Restore [`dump_core`] as the terminator.
pub fn reset_terminator() {
    TERMINATOR.store(ptr::null_mut(), Ordering::SeqCst);
}

pub(crate) fn configure(close_fds: bool, open_max: c_int) {
    CLOSE_FDS.store(close_fds, Ordering::SeqCst);
    OPEN_MAX.store(open_max.clamp(3, FD_SCAN_LIMIT), Ordering::SeqCst);
}

pub(crate) fn open_max_hint() -> c_int {
    // SAFETY: sysconf has no preconditions; -1 means indeterminate.
    let n = unsafe { libc::sysconf(libc::_SC_OPEN_MAX) };
    if n > 0 {
        c_int::try_from(n).unwrap_or(FD_SCAN_LIMIT)
    } else {
        DEFAULT_OPEN_MAX
    }
}

/// Put every fatal signal back to its default disposition so a second
/// occurrence ends the process instead of re-entering custom code.
pub fn restore_fatal_defaults() {
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    for kind in SignalKind::FATAL {
        // SAFETY: installing SIG_DFL has no handler code to reason about.
        let _ = unsafe { sigaction(kind.signal(), &default) };
    }
}

/// Close every descriptor above the standard three with raw `close(2)`.
///
/// The scan stops at `sysconf(_SC_OPEN_MAX)` as sampled at install time,
/// capped at 65536; descriptors numbered above the cap are left open.
pub fn close_inherited_fds() {
    let max = OPEN_MAX.load(Ordering::SeqCst);
    for fd in 3..max {
        // SAFETY: closing an unused or already closed descriptor only yields
        // EBADF; the process is about to terminate.
        unsafe {
            libc::close(fd);
        }
    }
}

/// Terminate through the default disposition of `kind` so the OS writes a
/// core image. Falls back to `abort` if the signal does not end the process.
pub fn dump_core(kind: SignalKind) {
    let signal = kind.signal();
    let mut unblock = SigSet::empty();
    unblock.add(signal);
    let _ = pthread_sigmask(SigmaskHow::SIG_UNBLOCK, Some(&unblock), None);
    let _ = raise(signal);
    // SAFETY: abort is async-signal-safe and never returns.
    unsafe { libc::abort() }
}

fn terminator() -> Terminator {
    let raw = TERMINATOR.load(Ordering::SeqCst);
    if raw.is_null() {
        dump_core
    } else {
        // SAFETY: the only non-null values stored are `Terminator` fn
        // pointers written by `set_terminator`.
        unsafe { std::mem::transmute::<*mut (), Terminator>(raw) }
    }
}

pub(crate) extern "C" fn on_fatal(sig: c_int, _info: *mut siginfo_t, _ctx: *mut c_void) {
    let kind = SignalKind::from_raw(sig).unwrap_or(SignalKind::Abrt);
    flags::raise(kind);
    restore_fatal_defaults();
    if CLOSE_FDS.load(Ordering::SeqCst) {
        close_inherited_fds();
    }
    terminator()(kind);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_max_hint_is_positive() {
        assert!(open_max_hint() > 0);
    }

    #[test]
    fn configure_clamps_scan_range() {
        configure(true, 1 << 30);
        assert_eq!(OPEN_MAX.load(Ordering::SeqCst), FD_SCAN_LIMIT);
        configure(true, 0);
        assert_eq!(OPEN_MAX.load(Ordering::SeqCst), 3);
        configure(true, DEFAULT_OPEN_MAX);
    }

    fn quiet(_: SignalKind) {}

    #[test]
    fn terminator_round_trip() {
        set_terminator(quiet);
        assert!(!TERMINATOR.load(Ordering::SeqCst).is_null());
        reset_terminator();
        assert!(TERMINATOR.load(Ordering::SeqCst).is_null());
    }
}
