//! Emission of step outputs.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Writes named outputs to stdout and, when configured, to the file
/// GitHub Actions reads step outputs from.
#[derive(Debug, Clone, Default)]
pub struct ActionOutput {
    output_file: Option<PathBuf>,
}

impl ActionOutput {
    /// Creates an emitter appending to `output_file` if given.
    pub fn new(output_file: Option<PathBuf>) -> Self {
        Self { output_file }
    }

    /// Emits `name` with `value`.
    pub fn set_output(&self, name: &str, value: &str) -> Result<()> {
        println!("{value}");

        if let Some(path) = &self.output_file {
            append_output(path, name, value)?;
        }

        Ok(())
    }
}

/// Appends one output record to `path`.
///
/// Single-line values use `name=value`; anything else uses the heredoc
/// form with a delimiter that does not occur in the value.
pub fn append_output(path: &Path, name: &str, value: &str) -> Result<()> {
    let record = format_record(name, value);

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open output file: {}", path.display()))?;

    file.write_all(record.as_bytes())
        .with_context(|| format!("Failed to write output file: {}", path.display()))
}

fn format_record(name: &str, value: &str) -> String {
    if !value.contains('\n') && !value.contains('\r') {
        return format!("{name}={value}\n");
    }

    let mut delimiter = String::from("ghadelimiter");
    while value.contains(&delimiter) {
        delimiter.push('_');
    }
    format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
}

/// Prints a workflow error annotation.
pub fn annotate_error(message: &str) {
    let escaped = message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A");
    println!("::error::{escaped}");
}
