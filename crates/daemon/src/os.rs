// crates/daemon/src/os.rs
#![allow(unsafe_code)]

use std::os::fd::RawFd;
use std::path::Path;

use nix::errno::Errno;
use nix::sys::stat::{Mode, umask};
use nix::unistd::{ForkResult, Pid, chdir, fork, setsid};

/// The OS calls made while detaching.
///
/// [`Host`] forwards to the real system calls; tests substitute a recorder
/// so the sequence can be checked without forking the test runner.
pub trait SystemOps {
    fn fork(&mut self) -> nix::Result<ForkResult>;
    fn umask(&mut self, mask: Mode) -> Mode;
    fn setsid(&mut self) -> nix::Result<Pid>;
    fn chdir(&mut self, dir: &Path) -> nix::Result<()>;
    fn close(&mut self, fd: RawFd) -> nix::Result<()>;
    fn redirect_to_null(&mut self, fd: RawFd) -> nix::Result<()>;
    fn exit(&mut self, code: i32) -> !;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Host;

impl SystemOps for Host {
    /// Fork the current process.
    ///
    /// # Safety
    /// This wrapper is safe because it performs the raw `fork(2)` and returns
    /// immediately without touching shared state in the child. The caller is
    /// responsible for performing only async-signal-safe operations before any
    /// further library calls.
    fn fork(&mut self) -> nix::Result<ForkResult> {
        // SAFETY: see the `Safety` section above. The detach sequence only
        // issues plain system calls in the child before returning.
        unsafe { fork() }
    }

    fn umask(&mut self, mask: Mode) -> Mode {
        umask(mask)
    }

    fn setsid(&mut self) -> nix::Result<Pid> {
        setsid()
    }

    fn chdir(&mut self, dir: &Path) -> nix::Result<()> {
        chdir(dir)
    }

    fn close(&mut self, fd: RawFd) -> nix::Result<()> {
        // SAFETY: only the standard descriptors are passed here; nothing in
        // this process holds an owned handle to them.
        Errno::result(unsafe { libc::close(fd) }).map(drop)
    }

    fn redirect_to_null(&mut self, fd: RawFd) -> nix::Result<()> {
        // SAFETY: the path is a valid NUL-terminated string and the
        // temporary descriptor is closed unless it already is `fd`.
        unsafe {
            let null = Errno::result(libc::open(c"/dev/null".as_ptr(), libc::O_RDWR))?;
            if null != fd {
                let res = Errno::result(libc::dup2(null, fd));
                libc::close(null);
                res?;
            }
        }
        Ok(())
    }

    fn exit(&mut self, code: i32) -> ! {
        std::process::exit(code)
    }
}
