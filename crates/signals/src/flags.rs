// crates/signals/src/flags.rs
//! Process-wide pending flags, one per [`SignalKind`].
//!
//! Handlers only ever call [`raise`]; ordinary code only ever calls
//! [`take`]. Both are a single atomic operation, so a handler that
//! preempts a poll (or another handler) cannot observe a torn state.

use std::sync::atomic::{AtomicBool, Ordering};

use libc::c_int;

use crate::kind::SignalKind;

static PENDING: [AtomicBool; SignalKind::COUNT] =
    [const { AtomicBool::new(false) }; SignalKind::COUNT];

pub(crate) fn raise(kind: SignalKind) {
    PENDING[kind.slot()].store(true, Ordering::SeqCst);
}

/// Consume the flag for `kind`, returning whether it was set.
pub(crate) fn take(kind: SignalKind) -> bool {
    PENDING[kind.slot()].swap(false, Ordering::SeqCst)
}

/// Flags set by the recoverable handler for a raw signal number.
///
/// SIGUSR2 and any number outside the table also set the termination flag:
/// an unexpected signal on this path is a request to stop, never dropped.
pub(crate) fn recoverable_route(sig: c_int) -> &'static [SignalKind] {
    match SignalKind::from_raw(sig) {
        Some(SignalKind::Hup) => &[SignalKind::Hup],
        Some(SignalKind::Int) => &[SignalKind::Int],
        Some(SignalKind::Usr1) => &[SignalKind::Usr1],
        Some(SignalKind::Usr2) => &[SignalKind::Usr2, SignalKind::Term],
        _ => &[SignalKind::Term],
    }
}

pub(crate) fn record_recoverable(sig: c_int) {
    for kind in recoverable_route(sig) {
        raise(*kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_table() {
        assert_eq!(recoverable_route(libc::SIGHUP), &[SignalKind::Hup]);
        assert_eq!(recoverable_route(libc::SIGINT), &[SignalKind::Int]);
        assert_eq!(recoverable_route(libc::SIGUSR1), &[SignalKind::Usr1]);
        assert_eq!(recoverable_route(libc::SIGTERM), &[SignalKind::Term]);
        assert_eq!(
            recoverable_route(libc::SIGUSR2),
            &[SignalKind::Usr2, SignalKind::Term]
        );
    }

    #[test]
    fn unknown_numbers_fall_back_to_term() {
        assert_eq!(recoverable_route(libc::SIGWINCH), &[SignalKind::Term]);
        assert_eq!(recoverable_route(-1), &[SignalKind::Term]);
        // fatal kinds never reach this handler, but would still mean "stop"
        assert_eq!(recoverable_route(libc::SIGSEGV), &[SignalKind::Term]);
    }

    // Fatal slots are not touched by any other unit test in this crate.
    #[test]
    fn take_clears_and_reports_previous() {
        assert!(!take(SignalKind::Bus));
        raise(SignalKind::Bus);
        raise(SignalKind::Bus);
        assert!(take(SignalKind::Bus));
        assert!(!take(SignalKind::Bus));
    }

    #[test]
    fn flags_are_independent() {
        raise(SignalKind::Fpe);
        assert!(!take(SignalKind::Segv));
        assert!(take(SignalKind::Fpe));
    }
}
