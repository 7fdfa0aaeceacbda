// crates/signals/src/report.rs
//! Diagnostic reporter for panics that escape ordinary code.

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic;

use tracing::error;

/// Log panic payload, location, thread and a backtrace, then hand over to
/// whichever hook was installed before.
pub(crate) fn install_panic_reporter() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let thread = std::thread::current();
        let name = thread.name().unwrap_or("<unnamed>");
        let location = info
            .location()
            .map(|l| l.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        let backtrace = Backtrace::force_capture();
        error!(
            target: "signals::panic",
            thread = name,
            location = %location,
            "uncaught panic: {}\n{backtrace}",
            payload_message(info.payload())
        );
        previous(info);
    }));
}

pub(crate) fn payload_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "Box<dyn Any>"
    }
}

#[cfg(test)]
mod tests {
    use super::payload_message;
    use std::any::Any;

    #[test]
    fn payload_message_handles_common_payloads() {
        let s: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(payload_message(s.as_ref()), "static message");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(payload_message(owned.as_ref()), "owned message");
        let other: Box<dyn Any + Send> = Box::new(42u32);
        assert_eq!(payload_message(other.as_ref()), "Box<dyn Any>");
    }
}
