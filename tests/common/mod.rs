// tests/common/mod.rs
#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use assert_cmd::Command;
use nix::unistd::Pid;

pub fn sentinel_cmd() -> Command {
    let mut cmd = Command::cargo_bin("oc-sentineld").unwrap();
    cmd.env_remove("RUST_LOG").env_remove("NOTIFY_SOCKET");
    cmd
}

/// Poll `check` until it holds or `timeout` elapses.
pub fn wait_for(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    check()
}

pub fn read_pid(path: &Path) -> Option<Pid> {
    let raw = fs::read_to_string(path).ok()?;
    if !raw.ends_with('\n') {
        return None;
    }
    raw.trim().parse().ok().map(Pid::from_raw)
}
