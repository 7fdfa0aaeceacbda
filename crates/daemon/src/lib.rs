// crates/daemon/src/lib.rs
//! Detach the current process from its controlling terminal.
//!
//! [`daemonize`] performs the classic sequence exactly once per process:
//! fork and let the parent exit, reset the umask, start a new session and
//! close the standard descriptors. Failures of the OS calls after which
//! the process identity is ambiguous terminate the process with status 1;
//! only a repeated call is reported to the caller.

use std::os::fd::RawFd;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::stat::Mode;
use nix::unistd::ForkResult;
use thiserror::Error;
use tracing::{error, info};

pub mod config;
pub mod os;

pub use config::{DaemonConfig, parse_config, parse_config_file};
pub use os::{Host, SystemOps};

const STDIO: [RawFd; 3] = [libc::STDIN_FILENO, libc::STDOUT_FILENO, libc::STDERR_FILENO];

static DAEMONIZED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DaemonError {
    #[error("already daemonized")]
    AlreadyDaemonized,
}

/// What happens to descriptors 0, 1 and 2 in the detached child.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum StdioPolicy {
    #[default]
    Close,
    /// Point them at `/dev/null` so a later `open` cannot be handed a
    /// standard descriptor.
    DevNull,
}

#[derive(Clone, Debug)]
pub struct Daemonizer {
    umask: Mode,
    working_directory: Option<PathBuf>,
    stdio: StdioPolicy,
}

impl Default for Daemonizer {
    fn default() -> Self {
        Self {
            umask: Mode::empty(),
            working_directory: None,
            stdio: StdioPolicy::Close,
        }
    }
}

impl Daemonizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn umask(mut self, mask: Mode) -> Self {
        self.umask = mask;
        self
    }

    pub fn working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn stdio(mut self, policy: StdioPolicy) -> Self {
        self.stdio = policy;
        self
    }

    /// Detach using the real system calls.
    ///
    /// Returns in the daemon child only. The invoking process exits with
    /// status 0 once the child exists.
    pub fn start(&self) -> Result<(), DaemonError> {
        self.start_with(&mut Host, &DAEMONIZED)
    }

    /// Run the detach sequence against `ops`, guarded by `state`.
    pub fn start_with<S: SystemOps>(
        &self,
        ops: &mut S,
        state: &AtomicBool,
    ) -> Result<(), DaemonError> {
        if state.load(Ordering::SeqCst) {
            error!(target: "daemon", "already daemonized");
            return Err(DaemonError::AlreadyDaemonized);
        }

        match ops.fork() {
            Err(e) => {
                error!(target: "daemon", "fork failed: {e}");
                ops.exit(1)
            }
            Ok(ForkResult::Parent { child }) => {
                info!(target: "daemon", pid = child.as_raw(), "process id of child process {child}");
                ops.exit(0)
            }
            Ok(ForkResult::Child) => {}
        }

        ops.umask(self.umask);
        if let Err(e) = ops.setsid() {
            error!(target: "daemon", "cannot create a session: {e}");
            ops.exit(1);
        }
        if let Some(dir) = &self.working_directory {
            if let Err(e) = ops.chdir(dir) {
                error!(target: "daemon", "chdir to {} failed: {e}", dir.display());
                ops.exit(1);
            }
        }
        for fd in STDIO {
            match self.stdio {
                StdioPolicy::Close => {
                    let _ = ops.close(fd);
                }
                StdioPolicy::DevNull => {
                    if let Err(e) = ops.redirect_to_null(fd) {
                        error!(target: "daemon", "cannot redirect descriptor {fd}: {e}");
                        ops.exit(1);
                    }
                }
            }
        }

        state.store(true, Ordering::SeqCst);
        info!(target: "daemon", "daemonized");
        Ok(())
    }
}

/// Detach with the default options: umask 0, working directory unchanged,
/// standard descriptors closed.
pub fn daemonize() -> Result<(), DaemonError> {
    Daemonizer::new().start()
}

/// Whether this process completed [`daemonize`].
pub fn is_daemonized() -> bool {
    DAEMONIZED.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::errno::Errno;
    use nix::unistd::Pid;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::path::Path;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Fork,
        Umask(u32),
        Setsid,
        Chdir(PathBuf),
        Close(RawFd),
        Null(RawFd),
    }

    #[derive(Debug)]
    struct Exited(i32);

    struct Recorder {
        fork: nix::Result<ForkResult>,
        setsid: nix::Result<Pid>,
        chdir: nix::Result<()>,
        calls: Vec<Call>,
    }

    impl Recorder {
        fn child() -> Self {
            Self {
                fork: Ok(ForkResult::Child),
                setsid: Ok(Pid::from_raw(4242)),
                chdir: Ok(()),
                calls: Vec::new(),
            }
        }
    }

    impl SystemOps for Recorder {
        fn fork(&mut self) -> nix::Result<ForkResult> {
            self.calls.push(Call::Fork);
            self.fork
        }

        fn umask(&mut self, mask: Mode) -> Mode {
            self.calls.push(Call::Umask(mask.bits() as u32));
            Mode::from_bits_truncate(0o022)
        }

        fn setsid(&mut self) -> nix::Result<Pid> {
            self.calls.push(Call::Setsid);
            self.setsid
        }

        fn chdir(&mut self, dir: &Path) -> nix::Result<()> {
            self.calls.push(Call::Chdir(dir.to_path_buf()));
            self.chdir
        }

        fn close(&mut self, fd: RawFd) -> nix::Result<()> {
            self.calls.push(Call::Close(fd));
            Ok(())
        }

        fn redirect_to_null(&mut self, fd: RawFd) -> nix::Result<()> {
            self.calls.push(Call::Null(fd));
            Ok(())
        }

        fn exit(&mut self, code: i32) -> ! {
            std::panic::panic_any(Exited(code))
        }
    }

    fn exit_code(run: impl FnOnce()) -> i32 {
        let payload = catch_unwind(AssertUnwindSafe(run)).expect_err("expected exit");
        payload.downcast_ref::<Exited>().expect("exit payload").0
    }

    #[test]
    fn child_runs_full_sequence() {
        let state = AtomicBool::new(false);
        let mut ops = Recorder::child();
        Daemonizer::new().start_with(&mut ops, &state).unwrap();
        assert_eq!(
            ops.calls,
            vec![
                Call::Fork,
                Call::Umask(0),
                Call::Setsid,
                Call::Close(0),
                Call::Close(1),
                Call::Close(2),
            ]
        );
        assert!(state.load(Ordering::SeqCst));
    }

    #[test]
    fn second_call_is_refused_without_side_effects() {
        let state = AtomicBool::new(false);
        let mut ops = Recorder::child();
        Daemonizer::new().start_with(&mut ops, &state).unwrap();
        ops.calls.clear();
        let err = Daemonizer::new().start_with(&mut ops, &state).unwrap_err();
        assert_eq!(err, DaemonError::AlreadyDaemonized);
        assert_eq!(err.to_string(), "already daemonized");
        assert!(ops.calls.is_empty());
        assert!(state.load(Ordering::SeqCst));
    }

    #[test]
    fn second_call_logs_already_daemonized() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("daemon.log");
        let cfg = logging::SubscriberConfig::builder()
            .stderr(false)
            .log_file(Some(log.clone()))
            .build();
        let sub = logging::subscriber(cfg).unwrap();

        let state = AtomicBool::new(false);
        let mut ops = Recorder::child();
        tracing::subscriber::with_default(sub, || {
            Daemonizer::new().start_with(&mut ops, &state).unwrap();
            assert!(Daemonizer::new().start_with(&mut ops, &state).is_err());
        });

        let contents = std::fs::read_to_string(&log).unwrap();
        assert_eq!(contents.matches("[ERROR] already daemonized").count(), 1);
    }

    #[test]
    fn parent_exits_successfully() {
        let state = AtomicBool::new(false);
        let mut ops = Recorder::child();
        ops.fork = Ok(ForkResult::Parent {
            child: Pid::from_raw(77),
        });
        let code = exit_code(|| {
            let _ = Daemonizer::new().start_with(&mut ops, &state);
        });
        assert_eq!(code, 0);
        assert_eq!(ops.calls, vec![Call::Fork]);
        assert!(!state.load(Ordering::SeqCst));
    }

    #[test]
    fn fork_failure_exits_with_error_status() {
        let state = AtomicBool::new(false);
        let mut ops = Recorder::child();
        ops.fork = Err(Errno::EAGAIN);
        let code = exit_code(|| {
            let _ = Daemonizer::new().start_with(&mut ops, &state);
        });
        assert_eq!(code, 1);
        assert!(!state.load(Ordering::SeqCst));
    }

    #[test]
    fn setsid_failure_exits_before_closing_stdio() {
        let state = AtomicBool::new(false);
        let mut ops = Recorder::child();
        ops.setsid = Err(Errno::EPERM);
        let code = exit_code(|| {
            let _ = Daemonizer::new().start_with(&mut ops, &state);
        });
        assert_eq!(code, 1);
        assert_eq!(ops.calls, vec![Call::Fork, Call::Umask(0), Call::Setsid]);
        assert!(!state.load(Ordering::SeqCst));
    }

    #[test]
    fn options_change_umask_directory_and_stdio() {
        let state = AtomicBool::new(false);
        let mut ops = Recorder::child();
        Daemonizer::new()
            .umask(Mode::from_bits_truncate(0o027))
            .working_directory("/")
            .stdio(StdioPolicy::DevNull)
            .start_with(&mut ops, &state)
            .unwrap();
        assert_eq!(
            ops.calls,
            vec![
                Call::Fork,
                Call::Umask(0o027),
                Call::Setsid,
                Call::Chdir(PathBuf::from("/")),
                Call::Null(0),
                Call::Null(1),
                Call::Null(2),
            ]
        );
    }

    #[test]
    fn chdir_failure_is_fatal() {
        let state = AtomicBool::new(false);
        let mut ops = Recorder::child();
        ops.chdir = Err(Errno::ENOENT);
        let code = exit_code(|| {
            let _ = Daemonizer::new()
                .working_directory("/nonexistent")
                .start_with(&mut ops, &state);
        });
        assert_eq!(code, 1);
        assert!(!ops.calls.iter().any(|c| matches!(c, Call::Close(_))));
    }
}
