//! Diff command implementation
//!
//! Classifies a note's current chunks against a baseline file and prints
//! the plan a sync would apply, without touching any store.

use anyhow::{Context, Result};
use colored::Colorize;
use notechunk_core::{
    BaselineAnomaly, BaselineEntry, ChunkOptions, SyncStatus, SyncSummary,
    classify_against_baseline, plan_sync,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;

use super::chunk_file;
use crate::cli::NoteArgs;
use crate::output::{self, OutputFormat};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DiffView<'a> {
    original_id: &'a str,
    summary: SyncSummary,
    statuses: &'a BTreeMap<String, SyncStatus>,
    anomalies: &'a [BaselineAnomaly],
    to_upsert: Vec<&'a str>,
    to_delete_record_ids: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusLine<'a> {
    chunk_id: &'a str,
    status: SyncStatus,
}

/// Classify a note against a saved baseline and print the plan.
pub fn execute(
    note: &NoteArgs,
    baseline_path: &std::path::Path,
    format: OutputFormat,
    options: &ChunkOptions,
) -> Result<()> {
    let raw = fs::read_to_string(baseline_path)
        .with_context(|| format!("Failed to read baseline {}", baseline_path.display()))?;
    let baseline: Vec<BaselineEntry> = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid baseline {}", baseline_path.display()))?;

    let report = chunk_file(note, options)?;
    let classification = classify_against_baseline(&report.chunks, &baseline);
    let plan = plan_sync(&classification);

    let view = DiffView {
        original_id: &note.original_id,
        summary: classification.summary(),
        statuses: &classification.statuses,
        anomalies: &classification.anomalies,
        to_upsert: plan.to_upsert.iter().map(|c| c.chunk_id.as_str()).collect(),
        to_delete_record_ids: &plan.to_delete_record_ids,
    };

    match format {
        OutputFormat::Json => output::print_json(&view)?,
        OutputFormat::Jsonl => {
            let lines: Vec<StatusLine<'_>> = view
                .statuses
                .iter()
                .map(|(chunk_id, status)| StatusLine {
                    chunk_id,
                    status: *status,
                })
                .collect();
            output::print_jsonl(&lines)?;
        },
        OutputFormat::Text => {
            output::print_anomalies_text(view.anomalies);
            for (chunk_id, status) in view.statuses {
                let label = match status {
                    SyncStatus::New => "new".green(),
                    SyncStatus::Modified => "modified".yellow(),
                    SyncStatus::Unchanged => "unchanged".dimmed(),
                    SyncStatus::Deleted => "deleted".red(),
                };
                println!("{label:>9} {chunk_id}");
            }
            output::print_summary_text(&view.summary);
        },
    }
    Ok(())
}
