//! Output formatting for command results.
//!
//! - **Text**: human-readable, colored unless `NO_COLOR` is set
//! - **JSON**: one pretty-printed document
//! - **JSONL**: one compact JSON object per line

use anyhow::Result;
use colored::Colorize;
use notechunk_core::{
    BaselineAnomaly, Chunk, Diagnostic, DiagnosticSeverity, SyncItemResult, SyncOutcome,
    SyncSummary,
};
use serde::Serialize;

/// Output format selector
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty text output (default)
    Text,
    /// Single JSON document
    Json,
    /// Newline-delimited JSON
    Jsonl,
}

impl OutputFormat {
    /// JSON or JSONL.
    pub const fn is_machine(self) -> bool {
        matches!(self, Self::Json | Self::Jsonl)
    }
}

/// Print `value` as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print each item as one compact JSON line.
pub fn print_jsonl<'a, T, I>(items: I) -> Result<()>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    for item in items {
        println!("{}", serde_json::to_string(item)?);
    }
    Ok(())
}

const PREVIEW_CHARS: usize = 160;

/// One header line and an indented preview per chunk.
pub fn print_chunks_text(chunks: &[Chunk]) {
    for chunk in chunks {
        let path = if chunk.headings_path.is_empty() {
            "(no heading)".to_string()
        } else {
            chunk.headings_path.join(" > ")
        };
        println!(
            "{} {} {} {}",
            format!("[{}]", chunk.meta.chunk_index).dimmed(),
            chunk.chunk_type.to_string().cyan(),
            path.bold(),
            short_id(&chunk.chunk_id).dimmed()
        );
        for line in preview(&chunk.content_raw).lines() {
            println!("    {line}");
        }
    }
}

/// Classification counts on one line.
pub fn print_summary_text(summary: &SyncSummary) {
    println!(
        "{} new, {} modified, {} unchanged, {} deleted",
        summary.new.to_string().green(),
        summary.modified.to_string().yellow(),
        summary.unchanged,
        summary.deleted.to_string().red()
    );
}

/// One line per store operation.
pub fn print_items_text(items: &[SyncItemResult]) {
    for item in items {
        let target = item.chunk_id.as_deref().unwrap_or(&item.record_id);
        match &item.outcome {
            SyncOutcome::Applied => {
                println!("  {} {:?} {}", "ok".green(), item.action, short_id(target));
            },
            SyncOutcome::Failed { error, recoverable } => {
                let retry = if *recoverable { " (retryable)" } else { "" };
                println!(
                    "  {} {:?} {}: {error}{retry}",
                    "failed".red(),
                    item.action,
                    short_id(target)
                );
            },
        }
    }
}

/// Baseline anomalies, to stderr.
pub fn print_anomalies_text(anomalies: &[BaselineAnomaly]) {
    for anomaly in anomalies {
        eprintln!("{} {}", "anomaly:".yellow(), anomaly.message);
    }
}

/// Diagnostics go to stderr so stdout stays parseable.
pub fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        let label = match diagnostic.severity {
            DiagnosticSeverity::Error => "error:".red(),
            DiagnosticSeverity::Warn => "warning:".yellow(),
            DiagnosticSeverity::Info => "note:".dimmed(),
        };
        match diagnostic.line {
            Some(line) => eprintln!("{label} line {}: {}", line + 1, diagnostic.message),
            None => eprintln!("{label} {}", diagnostic.message),
        }
    }
}

fn short_id(id: &str) -> String {
    if id.len() == 64 && id.bytes().all(|b| b.is_ascii_hexdigit()) {
        format!("{}…", &id[..12])
    } else {
        id.to_string()
    }
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}
