//! Transcript rendering into the requested output format.

use crate::task::OutputFormat;

/// Renders transcript text into the requested output format.
pub fn render_transcript(text: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => text.to_string(),
        OutputFormat::Markdown => format!("## Transcript\n\n{}", text),
    }
}

/// Canonical output file name for a rendered transcript.
pub fn output_file_name(format: OutputFormat) -> String {
    format!("transcript.{}", format.extension())
}
