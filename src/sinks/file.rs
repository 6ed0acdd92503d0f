//! File sink: renders events and hands lines to a [`FileTransport`]

use super::rotating_file::FileTransport;
use crate::core::config::FileConfig;
use crate::core::{LogEvent, OutputFormat, Result, Sink};
use std::sync::Arc;

pub struct FileSink {
    transport: Arc<FileTransport>,
    format: OutputFormat,
}

impl FileSink {
    pub fn new(transport: Arc<FileTransport>, format: OutputFormat) -> Self {
        Self { transport, format }
    }

    /// Open a transport for `config` and write JSON or text lines per
    /// `config.json_format`
    ///
    /// # Errors
    ///
    /// Returns error if the log directory or first file cannot be created
    pub fn from_config(config: &FileConfig) -> Result<Self> {
        let transport = FileTransport::from_config(config)?;
        Ok(Self::new(
            Arc::new(transport),
            OutputFormat::from_json_flag(config.json_format),
        ))
    }

    pub fn transport(&self) -> &Arc<FileTransport> {
        &self.transport
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }
}

impl Sink for FileSink {
    fn emit(&self, event: &LogEvent) -> Result<()> {
        let line = self.format.format(event)?;
        match self.transport.write(&line) {
            // Late events after shutdown are dropped quietly
            Err(e) if e.is_closed() => Ok(()),
            other => other,
        }
    }

    fn flush(&self) -> Result<()> {
        self.transport.flush()
    }

    fn close(&self) -> Result<()> {
        self.transport.close()
    }

    fn name(&self) -> &str {
        "file"
    }
}
