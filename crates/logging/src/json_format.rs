// crates/logging/src/json_format.rs
#![allow(missing_docs)]

use std::fmt::Write as _;

use serde_json::{Map, Value};
use tracing::{Event, Subscriber};
use tracing_serde::{AsSerde, fields::AsMap};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, format::Writer};
use tracing_subscriber::registry::LookupSpan;

use crate::formatter::timestamp;

/// One JSON object per line: `timestamp` (when enabled), `level`, `target`,
/// `pid` and the event `fields`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonFormatter {
    timestamps: bool,
}

impl JsonFormatter {
    pub fn new(timestamps: bool) -> Self {
        Self { timestamps }
    }
}

impl<S, N> FormatEvent<S, N> for JsonFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'writer> FormatFields<'writer> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let mut obj = Map::new();
        if self.timestamps {
            obj.insert("timestamp".into(), Value::String(timestamp()?));
        }
        obj.insert(
            "level".into(),
            serde_json::to_value(event.metadata().level().as_serde())
                .map_err(|_| std::fmt::Error)?,
        );
        obj.insert(
            "target".into(),
            Value::String(event.metadata().target().to_string()),
        );
        obj.insert("pid".into(), Value::from(std::process::id()));
        let fields = serde_json::to_value(event.field_map()).map_err(|_| std::fmt::Error)?;
        obj.insert("fields".into(), fields);
        let data = serde_json::to_string(&Value::Object(obj)).map_err(|_| std::fmt::Error)?;
        writer.write_str(&data)?;
        writer.write_char('\n')
    }
}
