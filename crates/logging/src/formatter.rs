// crates/logging/src/formatter.rs
use std::fmt::{self, Write as _};

use time::{OffsetDateTime, macros::format_description};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, format::Writer};
use tracing_subscriber::registry::LookupSpan;

/// Collects the message and the remaining fields of an event in the order
/// they were recorded.
#[derive(Default)]
pub(crate) struct FieldVisitor {
    pub(crate) msg: String,
    pub(crate) fields: Vec<(&'static str, String)>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.msg.push_str(value);
        } else {
            self.fields.push((field.name(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.msg, "{value:?}");
        } else {
            self.fields.push((field.name(), format!("{value:?}")));
        }
    }
}

impl FieldVisitor {
    pub(crate) fn from_event(event: &Event<'_>) -> Self {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        visitor
    }

    /// `message key=value ...`, falling back to the target when the event
    /// carries no message.
    pub(crate) fn line(&self, target: &str) -> String {
        let mut out = if self.msg.is_empty() {
            target.to_string()
        } else {
            self.msg.clone()
        };
        for (name, value) in &self.fields {
            let _ = write!(out, " {name}={value}");
        }
        out
    }
}

pub(crate) fn timestamp() -> Result<String, fmt::Error> {
    OffsetDateTime::now_utc()
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second]Z"
        ))
        .map_err(|_| fmt::Error)
}

/// `[LEVEL] message key=value`, optionally prefixed with a UTC timestamp.
#[derive(Clone, Copy, Debug, Default)]
pub struct DaemonFormatter {
    timestamps: bool,
}

impl DaemonFormatter {
    pub fn new(timestamps: bool) -> Self {
        Self { timestamps }
    }
}

impl<S, N> FormatEvent<S, N> for DaemonFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'writer> FormatFields<'writer> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        if self.timestamps {
            write!(writer, "{} ", timestamp()?)?;
        }
        let visitor = FieldVisitor::from_event(event);
        let meta = event.metadata();
        write!(writer, "[{}] {}", meta.level(), visitor.line(meta.target()))?;
        writer.write_char('\n')
    }
}
