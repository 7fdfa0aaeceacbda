// crates/logging/src/sink.rs
use std::fs::File;
use std::sync::Arc;

use tracing_subscriber::fmt::MakeWriter;

/// Append-mode log file shared by every event.
#[derive(Clone, Debug)]
pub(crate) struct FileWriter {
    file: Arc<File>,
}

impl FileWriter {
    pub(crate) fn new(file: File) -> Self {
        Self {
            file: Arc::new(file),
        }
    }
}

impl<'a> MakeWriter<'a> for FileWriter {
    type Writer = &'a File;

    fn make_writer(&'a self) -> Self::Writer {
        &self.file
    }
}
