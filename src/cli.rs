// src/cli.rs

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use daemon::DaemonConfig;
use daemon::config::validator::{parse_poll_interval, parse_umask};
use logging::LogFormat;

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "oc-sentineld",
    version,
    about = "Run a signal-driven background service"
)]
pub struct Opts {
    /// Read settings from FILE; command-line values take precedence.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Stay in the foreground.
    #[arg(long = "no-detach")]
    pub no_detach: bool,
    #[arg(long = "pid-file", value_name = "FILE")]
    pub pid_file: Option<PathBuf>,
    #[arg(long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,
    #[arg(long = "log-format", value_enum, value_name = "FORMAT")]
    pub log_format: Option<LogFormat>,
    #[arg(long)]
    pub syslog: bool,
    #[arg(long)]
    pub journald: bool,
    /// Change to DIR after detaching.
    #[arg(long = "chdir", value_name = "DIR")]
    pub chdir: Option<PathBuf>,
    #[arg(long, value_name = "OCTAL", value_parser = parse_umask)]
    pub umask: Option<u32>,
    #[arg(long = "poll-interval", value_name = "MS", value_parser = parse_poll_interval)]
    pub poll_interval: Option<Duration>,
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
    #[arg(short, long)]
    pub quiet: bool,
}

impl Opts {
    /// Settings given on the command line, in configuration form.
    ///
    /// Boolean switches only ever turn a setting on (or, for
    /// `--no-detach`, off); when absent the file value stands.
    pub fn overrides(&self) -> DaemonConfig {
        DaemonConfig {
            pid_file: self.pid_file.clone(),
            log_file: self.log_file.clone(),
            log_format: self.log_format,
            syslog: self.syslog.then_some(true),
            journald: self.journald.then_some(true),
            working_dir: self.chdir.clone(),
            umask: self.umask,
            poll_interval: self.poll_interval,
            close_fds_on_crash: None,
            detach: self.no_detach.then_some(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        Opts::command().debug_assert();
    }

    #[test]
    fn flags_map_to_overrides() {
        let opts = Opts::try_parse_from([
            "oc-sentineld",
            "--no-detach",
            "--pid-file",
            "/run/s.pid",
            "--umask",
            "027",
            "--poll-interval",
            "50",
            "--log-format",
            "json",
            "--syslog",
            "-vv",
        ])
        .unwrap();
        assert_eq!(opts.verbose, 2);
        let cfg = opts.overrides();
        assert_eq!(cfg.detach, Some(false));
        assert_eq!(cfg.pid_file, Some(PathBuf::from("/run/s.pid")));
        assert_eq!(cfg.umask, Some(0o027));
        assert_eq!(cfg.poll_interval, Some(Duration::from_millis(50)));
        assert_eq!(cfg.log_format, Some(LogFormat::Json));
        assert_eq!(cfg.syslog, Some(true));
        assert_eq!(cfg.journald, None);
    }

    #[test]
    fn absent_switches_leave_file_values() {
        let opts = Opts::try_parse_from(["oc-sentineld"]).unwrap();
        let file = DaemonConfig {
            detach: Some(false),
            syslog: Some(true),
            ..DaemonConfig::default()
        };
        let merged = file.merge(opts.overrides());
        assert_eq!(merged.detach, Some(false));
        assert_eq!(merged.syslog, Some(true));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(Opts::try_parse_from(["oc-sentineld", "--umask", "999"]).is_err());
        assert!(Opts::try_parse_from(["oc-sentineld", "--poll-interval", "0"]).is_err());
        assert!(Opts::try_parse_from(["oc-sentineld", "--log-format", "xml"]).is_err());
    }
}
