// crates/logging/src/subscriber.rs
#![allow(missing_docs)]

use std::fs::OpenOptions;
use std::io;

use tracing::level_filters::LevelFilter;
#[cfg(all(unix, any(feature = "syslog", feature = "journald")))]
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    EnvFilter, Layer, fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt,
};
#[cfg(all(unix, any(feature = "syslog", feature = "journald")))]
use tracing_subscriber::layer::Context;

use crate::flags::{LogFormat, SubscriberConfig};
use crate::formatter::DaemonFormatter;
use crate::json_format::JsonFormatter;
use crate::sink::FileWriter;

#[cfg(all(unix, any(feature = "syslog", feature = "journald")))]
use crate::formatter::FieldVisitor;
#[cfg(all(unix, any(feature = "syslog", feature = "journald")))]
use std::os::unix::net::UnixDatagram;
#[cfg(all(unix, any(feature = "syslog", feature = "journald")))]
use std::path::PathBuf;

pub const SYSLOG_PATH_ENV: &str = "OC_SENTINEL_SYSLOG_PATH";
pub const JOURNALD_PATH_ENV: &str = "OC_SENTINEL_JOURNALD_PATH";

#[cfg(all(unix, any(feature = "syslog", feature = "journald")))]
fn severity(level: Level) -> u8 {
    match level {
        Level::ERROR => 3,
        Level::WARN => 4,
        Level::INFO => 6,
        Level::DEBUG | Level::TRACE => 7,
    }
}

#[cfg(all(unix, any(feature = "syslog", feature = "journald")))]
fn connect(env: &str, default: &str) -> io::Result<UnixDatagram> {
    let path = std::env::var_os(env)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default));
    let sock = UnixDatagram::unbound()?;
    sock.connect(path)?;
    Ok(sock)
}

#[cfg(all(unix, feature = "syslog"))]
struct SyslogLayer {
    sock: UnixDatagram,
    ident: String,
}

/// `LOG_DAEMON` facility code.
#[cfg(all(unix, feature = "syslog"))]
const FACILITY_DAEMON: u8 = 3 << 3;

#[cfg(all(unix, feature = "syslog"))]
impl SyslogLayer {
    fn new(ident: &str) -> io::Result<Self> {
        Ok(Self {
            sock: connect(SYSLOG_PATH_ENV, "/dev/log")?,
            ident: ident.to_string(),
        })
    }
}

#[cfg(all(unix, feature = "syslog"))]
impl<S> tracing_subscriber::Layer<S> for SyslogLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let line = FieldVisitor::from_event(event).line(meta.target());
        let pri = FACILITY_DAEMON + severity(*meta.level());
        let pid = std::process::id();
        let data = format!("<{pri}>{}[{pid}]: {line}", self.ident);
        let _ = self.sock.send(data.as_bytes());
    }
}

#[cfg(all(unix, feature = "journald"))]
struct JournaldLayer {
    sock: UnixDatagram,
    ident: String,
}

#[cfg(all(unix, feature = "journald"))]
impl JournaldLayer {
    fn new(ident: &str) -> io::Result<Self> {
        Ok(Self {
            sock: connect(JOURNALD_PATH_ENV, "/run/systemd/journal/socket")?,
            ident: ident.to_string(),
        })
    }
}

#[cfg(all(unix, feature = "journald"))]
impl<S> tracing_subscriber::Layer<S> for JournaldLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let line = FieldVisitor::from_event(event).line(meta.target());
        let prio = severity(*meta.level());
        let data = format!(
            "PRIORITY={prio}\nSYSLOG_IDENTIFIER={}\nMESSAGE={line}\n",
            self.ident
        );
        let _ = self.sock.send(data.as_bytes());
    }
}

pub(crate) fn level_for(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::ERROR
    } else if verbose > 2 {
        LevelFilter::TRACE
    } else if verbose > 1 {
        LevelFilter::DEBUG
    } else if verbose > 0 {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    }
}

/// Build a [`tracing`] subscriber for a daemon process.
///
/// Stderr output is silently dropped once the standard descriptors are
/// closed. Syslog and journald sinks that cannot connect are skipped; a log
/// file that cannot be opened is an error.
pub fn subscriber(cfg: SubscriberConfig) -> io::Result<Box<dyn tracing::Subscriber + Send + Sync>> {
    let SubscriberConfig {
        format,
        verbose,
        quiet,
        stderr,
        log_file,
        syslog,
        journald,
        timestamps,
        ident,
    } = cfg;

    let filter = EnvFilter::builder()
        .with_default_directive(level_for(verbose, quiet).into())
        .from_env_lossy();

    let stderr_layer = if stderr {
        let base = tracing_fmt::layer().with_writer(io::stderr).with_ansi(false);
        Some(match format {
            LogFormat::Json => base.event_format(JsonFormatter::new(timestamps)).boxed(),
            LogFormat::Text => base.event_format(DaemonFormatter::new(timestamps)).boxed(),
        })
    } else {
        None
    };

    let file_layer = if let Some(path) = log_file {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let base = tracing_fmt::layer()
            .with_writer(FileWriter::new(file))
            .with_ansi(false);
        // files always carry timestamps
        Some(match format {
            LogFormat::Json => base.event_format(JsonFormatter::new(true)).boxed(),
            LogFormat::Text => base.event_format(DaemonFormatter::new(true)).boxed(),
        })
    } else {
        None
    };

    #[cfg(all(unix, feature = "syslog"))]
    let syslog_layer = if syslog {
        SyslogLayer::new(&ident).ok()
    } else {
        None
    };
    #[cfg(not(all(unix, feature = "syslog")))]
    let syslog_layer: Option<tracing_subscriber::layer::Identity> = {
        let _ = syslog;
        None
    };

    #[cfg(all(unix, feature = "journald"))]
    let journald_layer = if journald {
        JournaldLayer::new(&ident).ok()
    } else {
        None
    };
    #[cfg(not(all(unix, feature = "journald")))]
    let journald_layer: Option<tracing_subscriber::layer::Identity> = {
        let _ = journald;
        None
    };
    let _ = &ident;

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .with(syslog_layer)
        .with(journald_layer);
    Ok(Box::new(registry))
}

/// Initialise the global [`tracing`] subscriber.
pub fn init(cfg: SubscriberConfig) -> io::Result<()> {
    subscriber(cfg)?.try_init().map_err(io::Error::other)
}
