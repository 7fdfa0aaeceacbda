// crates/signals/src/error.rs

use thiserror::Error;

use crate::kind::SignalKind;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("failed to install handler for {signal}: {source}")]
    Install {
        signal: SignalKind,
        #[source]
        source: nix::Error,
    },
    #[error("failed to ignore SIGPIPE: {0}")]
    IgnorePipe(#[source] nix::Error),
}
