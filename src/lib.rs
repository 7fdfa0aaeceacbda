// src/lib.rs
//! `oc-sentineld`: a minimal supervised service built on the workspace
//! crates. It captures signals, detaches from the terminal, logs, writes a
//! pid file and reloads its configuration on `SIGHUP` until asked to stop.

pub mod cli;
mod run;

pub use cli::Opts;
pub use run::{StopReason, run, service_loop};
