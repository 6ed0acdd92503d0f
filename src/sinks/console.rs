//! Console sink
//!
//! Two layouts: a fancy multi-line block for people reading a terminal, and
//! a compact single line for containers whose stdout is collected. Error and
//! Fatal go to stderr, everything else to stdout, unless a writer was
//! injected, in which case it receives everything.

use crate::core::config::ConsoleConfig;
use crate::core::log_event::sanitize;
use crate::core::{LogEvent, LogLevel, Result, Sink, TimestampFormat};
use colored::Colorize;
use parking_lot::Mutex;
use std::io::Write;

pub struct ConsoleSink {
    config: ConsoleConfig,
    timestamp_format: TimestampFormat,
    writer: Option<Mutex<Box<dyn Write + Send>>>,
}

impl ConsoleSink {
    pub fn new(config: ConsoleConfig) -> Self {
        let timestamp_format = TimestampFormat::Local(config.date_format.clone());
        Self {
            config,
            timestamp_format,
            writer: None,
        }
    }

    /// Send every line to `writer` instead of stdout/stderr
    ///
    /// # Example
    ///
    /// ```
    /// use applog::core::LoggerConfig;
    /// use applog::sinks::ConsoleSink;
    ///
    /// let config = LoggerConfig::default();
    /// let sink = ConsoleSink::with_writer(config.console, Box::new(std::io::sink()));
    /// ```
    pub fn with_writer(config: ConsoleConfig, writer: Box<dyn Write + Send>) -> Self {
        let mut sink = Self::new(config);
        sink.writer = Some(Mutex::new(writer));
        sink
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Render an event the way it will appear, without the final newline
    pub fn render(&self, event: &LogEvent) -> String {
        if self.config.fancy {
            self.render_fancy(event)
        } else {
            self.render_compact(event)
        }
    }

    fn level_label(&self, level: LogLevel) -> String {
        let label = format!("{:5}", level.to_str());
        if self.config.colors {
            label.color(level.color_code()).bold().to_string()
        } else {
            label
        }
    }

    fn tag_label(&self, tag: &str) -> String {
        let label = format!("[{}]", tag);
        if self.config.colors {
            label.dimmed().to_string()
        } else {
            label
        }
    }

    fn timestamp_prefix(&self, event: &LogEvent) -> Option<String> {
        if !self.config.timestamps {
            return None;
        }
        let stamp = self.timestamp_format.format(&event.timestamp);
        Some(if self.config.colors {
            stamp.dimmed().to_string()
        } else {
            stamp
        })
    }

    fn render_fancy(&self, event: &LogEvent) -> String {
        let mut header = Vec::with_capacity(5);
        if let Some(stamp) = self.timestamp_prefix(event) {
            header.push(stamp);
        }
        header.push(event.level.icon().to_string());
        header.push(self.level_label(event.level));
        header.push(self.tag_label(&event.tag));
        header.push(event.message.clone());

        let mut out = header.join(" ");

        for (key, value) in event.data.fields().iter().chain(event.context.fields()) {
            out.push_str(&format!("\n    {}: {}", key, value));
        }
        if let Some(ref error) = event.error {
            let label = if self.config.colors {
                "error".red().to_string()
            } else {
                "error".to_string()
            };
            out.push_str(&format!("\n    {}: {}", label, error.message));
            if let Some(ref stack) = error.stack {
                for line in stack.lines() {
                    out.push_str(&format!("\n        {}", line));
                }
            }
        }
        if let Some(memory) = event.memory {
            out.push_str(&format!(
                "\n    memory: rss={} virtual={}",
                memory.rss_bytes, memory.virtual_bytes
            ));
        }

        out
    }

    fn render_compact(&self, event: &LogEvent) -> String {
        let mut parts = Vec::with_capacity(6);
        if let Some(stamp) = self.timestamp_prefix(event) {
            parts.push(stamp);
        }
        parts.push(self.level_label(event.level));
        parts.push(self.tag_label(&event.tag));
        parts.push(event.sanitized_message());
        if !event.data.is_empty() {
            parts.push(sanitize(&event.data.format_fields()));
        }
        if !event.context.is_empty() {
            parts.push(sanitize(&event.context.format_fields()));
        }
        if let Some(ref error) = event.error {
            parts.push(format!("error={}", sanitize(&error.message)));
        }
        parts.join(" ")
    }
}

impl Sink for ConsoleSink {
    fn emit(&self, event: &LogEvent) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let output = self.render(event);
        if let Some(ref writer) = self.writer {
            writeln!(writer.lock(), "{}", output)?;
            return Ok(());
        }

        match event.level {
            LogLevel::Error | LogLevel::Fatal => writeln!(std::io::stderr().lock(), "{}", output)?,
            _ => writeln!(std::io::stdout().lock(), "{}", output)?,
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        if let Some(ref writer) = self.writer {
            writer.lock().flush()?;
            return Ok(());
        }
        std::io::stdout().flush()?;
        std::io::stderr().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}
