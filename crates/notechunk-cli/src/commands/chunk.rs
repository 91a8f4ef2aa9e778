//! Chunk command implementation

use anyhow::Result;
use colored::Colorize;
use notechunk_core::ChunkOptions;

use super::chunk_file;
use crate::cli::NoteArgs;
use crate::output::{self, OutputFormat};

/// Chunk a note and print the chunks.
pub fn execute(note: &NoteArgs, format: OutputFormat, options: &ChunkOptions) -> Result<()> {
    let report = chunk_file(note, options)?;

    match format {
        OutputFormat::Json => output::print_json(&report)?,
        OutputFormat::Jsonl => output::print_jsonl(&report.chunks)?,
        OutputFormat::Text => {
            output::print_diagnostics(&report.diagnostics);
            output::print_chunks_text(&report.chunks);
            let footer = if report.truncated > 0 {
                format!(
                    "{} chunks, {} dropped by the soft cap",
                    report.chunks.len(),
                    report.truncated
                )
            } else {
                format!("{} chunks", report.chunks.len())
            };
            println!("{}", footer.dimmed());
        },
    }
    Ok(())
}
