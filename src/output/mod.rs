// ABOUTME: Output handler module for execution snapshot formatting and persistence
// ABOUTME: Routes snapshots and execution listings through a named formatter to stdout or a file

pub mod error;
pub mod formatter;
pub mod writer;

use std::collections::HashMap;
use std::path::Path;

use self::error::{OutputError, Result};
use self::formatter::{JsonFormatter, OutputFormatter, TextFormatter, YamlFormatter};
use self::writer::{FileWriter, OutputWriter, StdoutWriter};
use crate::engine::{Execution, ExecutionSummary};

pub use self::formatter::{OutputFormat, OutputOptions};

pub struct OutputHandler {
    formatters: HashMap<String, Box<dyn OutputFormatter>>,
    options: OutputOptions,
}

impl OutputHandler {
    pub fn new() -> Self {
        let mut handler = Self {
            formatters: HashMap::new(),
            options: OutputOptions::default(),
        };

        handler.register_formatter("json", Box::new(JsonFormatter::new_pretty()));
        handler.register_formatter("yaml", Box::new(YamlFormatter::new()));
        handler.register_formatter("text", Box::new(TextFormatter::new()));

        handler
    }

    pub fn with_options(mut self, options: OutputOptions) -> Self {
        self.options = options;
        self
    }

    pub fn register_formatter(&mut self, name: &str, formatter: Box<dyn OutputFormatter>) {
        self.formatters.insert(name.to_string(), formatter);
    }

    fn formatter(&self, format: &str) -> Result<&dyn OutputFormatter> {
        self.formatters
            .get(format)
            .map(|f| f.as_ref())
            .ok_or_else(|| OutputError::FormatterNotFound {
                format: format.to_string(),
            })
    }

    pub fn render_execution(&self, format: OutputFormat, execution: &Execution) -> Result<String> {
        self.formatter(format.as_str())?
            .format_execution(execution, &self.options)
    }

    pub fn render_summaries(
        &self,
        format: OutputFormat,
        summaries: &[ExecutionSummary],
    ) -> Result<String> {
        self.formatter(format.as_str())?.format_summaries(summaries)
    }

    /// Render a snapshot and write it to `destination`, or stdout when `None`
    pub async fn output_execution(
        &self,
        format: OutputFormat,
        execution: &Execution,
        destination: Option<&Path>,
    ) -> Result<()> {
        let rendered = self.render_execution(format, execution)?;

        match destination {
            Some(path) => FileWriter::new(path).write(&rendered).await,
            None => StdoutWriter::new().write(&rendered).await,
        }
    }

    pub fn list_formatters(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.formatters.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}
