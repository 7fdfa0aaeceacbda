// crates/daemon/src/config/validator.rs

use std::io;
use std::time::Duration;

use logging::LogFormat;

pub fn parse_bool(val: &str) -> io::Result<bool> {
    if ["1", "yes", "true", "on"]
        .iter()
        .any(|v| val.eq_ignore_ascii_case(v))
    {
        Ok(true)
    } else if ["0", "no", "false", "off"]
        .iter()
        .any(|v| val.eq_ignore_ascii_case(v))
    {
        Ok(false)
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid boolean: {val}"),
        ))
    }
}

/// Octal permission mask, with or without a leading `0` or `0o`.
pub fn parse_umask(val: &str) -> io::Result<u32> {
    let digits = val.strip_prefix("0o").unwrap_or(val);
    let mask = u32::from_str_radix(digits, 8).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid umask {val}: {e}"),
        )
    })?;
    if mask > 0o777 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("umask out of range: {val}"),
        ));
    }
    Ok(mask)
}

/// Poll interval in milliseconds; zero would spin.
pub fn parse_poll_interval(val: &str) -> io::Result<Duration> {
    let ms = val.parse::<u64>().map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid poll interval {val}: {e}"),
        )
    })?;
    if ms == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "poll interval must be positive",
        ));
    }
    Ok(Duration::from_millis(ms))
}

pub fn parse_log_format(val: &str) -> io::Result<LogFormat> {
    if val.eq_ignore_ascii_case("text") {
        Ok(LogFormat::Text)
    } else if val.eq_ignore_ascii_case("json") {
        Ok(LogFormat::Json)
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid log format: {val}"),
        ))
    }
}
