// crates/daemon/src/config/parser.rs

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::model::DaemonConfig;
use super::validator::{parse_bool, parse_log_format, parse_poll_interval, parse_umask};

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

/// Strip a trailing comment. `#` and `;` only start a comment at the
/// beginning of the line or after whitespace, and never inside quotes.
fn strip_comment(raw: &str) -> String {
    let mut line = String::new();
    let mut in_quotes: Option<char> = None;
    let mut prev_ws = true;
    for c in raw.chars() {
        match c {
            '"' | '\'' => {
                if let Some(q) = in_quotes {
                    if c == q {
                        in_quotes = None;
                    }
                } else {
                    in_quotes = Some(c);
                }
                line.push(c);
                prev_ws = false;
            }
            '#' | ';' if in_quotes.is_none() && prev_ws => break,
            c => {
                prev_ws = c.is_whitespace();
                line.push(c);
            }
        }
    }
    line
}

fn unquote(val: &str) -> &str {
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        &val[1..val.len() - 1]
    } else {
        val
    }
}

fn parse_path(key: &str, val: &str) -> io::Result<PathBuf> {
    let val = unquote(val);
    if val.is_empty() {
        return Err(invalid(format!("{key}: empty path")));
    }
    Ok(PathBuf::from(val))
}

pub fn parse_config(contents: &str) -> io::Result<DaemonConfig> {
    let mut cfg = DaemonConfig::default();
    for (idx, raw) in contents.lines().enumerate() {
        let lineno = idx + 1;
        let line = strip_comment(raw);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('[') {
            return Err(invalid(format!(
                "line {lineno}: sections are not supported: {line}"
            )));
        }
        let mut parts = line.splitn(2, '=');
        let key = parts
            .next()
            .ok_or_else(|| invalid(format!("line {lineno}: missing key")))?
            .trim()
            .to_lowercase()
            .replace(['-', '_'], " ");
        let key = key.split_whitespace().collect::<Vec<_>>().join(" ");
        let val = parts
            .next()
            .ok_or_else(|| invalid(format!("line {lineno}: missing value for {key}")))?
            .trim();
        let ctx = |e: io::Error| invalid(format!("line {lineno}: {key}: {e}"));
        match key.as_str() {
            "pid file" => cfg.pid_file = Some(parse_path(&key, val).map_err(ctx)?),
            "log file" => cfg.log_file = Some(parse_path(&key, val).map_err(ctx)?),
            "log format" => cfg.log_format = Some(parse_log_format(val).map_err(ctx)?),
            "syslog" => cfg.syslog = Some(parse_bool(val).map_err(ctx)?),
            "journald" => cfg.journald = Some(parse_bool(val).map_err(ctx)?),
            "working dir" => cfg.working_dir = Some(parse_path(&key, val).map_err(ctx)?),
            "umask" => cfg.umask = Some(parse_umask(val).map_err(ctx)?),
            "poll interval" => cfg.poll_interval = Some(parse_poll_interval(val).map_err(ctx)?),
            "close fds on crash" => {
                cfg.close_fds_on_crash = Some(parse_bool(val).map_err(ctx)?)
            }
            "detach" => cfg.detach = Some(parse_bool(val).map_err(ctx)?),
            _ => return Err(invalid(format!("line {lineno}: unknown option: {key}"))),
        }
    }
    Ok(cfg)
}

pub fn parse_config_file(path: &Path) -> io::Result<DaemonConfig> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents).map_err(|e| invalid(format!("{}: {e}", path.display())))
}
