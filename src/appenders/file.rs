//! File appender implementation

use crate::core::{Appender, LogRecord, MonitorError, OutputFormat, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Appends one line per record to a file (JSON lines by default)
pub struct FileAppender {
    writer: BufWriter<File>,
    path: PathBuf,
    output_format: OutputFormat,
}

impl FileAppender {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                MonitorError::io_operation(format!("opening '{}'", path.display()), e)
            })?;

        Ok(Self {
            writer: BufWriter::new(file),
            path,
            output_format: OutputFormat::Structured,
        })
    }

    /// Set the output format for this appender
    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Appender for FileAppender {
    fn append(&mut self, record: &LogRecord) -> Result<()> {
        let line = self.output_format.format(record, false);
        self.writer.write_all(line.as_bytes())?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

impl Drop for FileAppender {
    fn drop(&mut self) {
        // Ensure all buffered data is flushed to disk
        let _ = self.flush();
    }
}
