//! Command implementations for the notechunk CLI.

mod chunk;
mod config;
mod diff;
mod sync;

pub use chunk::execute as chunk;
pub use config::execute as config;
pub use diff::execute as diff;
pub use sync::{execute as sync, purge};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use notechunk_core::{
    ChunkOptions, ChunkReport, MemoryVectorStore, NoteContext, StoreRecord, StructureCache,
    chunk_markdown, chunk_note_with_report,
};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::cli::NoteArgs;

/// Read the note named by `args` and chunk it.
pub fn chunk_file(args: &NoteArgs, options: &ChunkOptions) -> Result<ChunkReport> {
    let markdown = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read note {}", args.file.display()))?;

    let mut options = options.clone();
    if let Some(max) = args.max_chunks {
        options.max_chunks_soft = max;
        options.validate()?;
    }

    let context = note_context(args)?;
    let report = match &args.cache {
        Some(path) => {
            let cache = read_cache(path)?;
            chunk_note_with_report(&markdown, &context, &options, Some(&cache))?
        },
        None => chunk_markdown(&markdown, &context, &options)?,
    };
    debug!(
        file = %args.file.display(),
        chunks = report.chunks.len(),
        truncated = report.truncated,
        "Chunked note"
    );
    Ok(report)
}

fn note_context(args: &NoteArgs) -> Result<NoteContext> {
    let metadata = fs::metadata(&args.file)
        .with_context(|| format!("Failed to stat {}", args.file.display()))?;

    let mut context = NoteContext::new(args.file.to_string_lossy(), args.original_id.clone())
        .with_tags(args.tags.clone());
    context.created_at = metadata.created().ok().map(DateTime::<Utc>::from);
    context.updated_at = metadata.modified().ok().map(DateTime::<Utc>::from);
    Ok(context)
}

fn read_cache(path: &Path) -> Result<StructureCache> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read structure cache {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Invalid structure cache {}", path.display()))
}

/// Open a JSON snapshot as an in-memory store. A missing file is an empty store.
pub fn open_store(path: &Path) -> Result<MemoryVectorStore> {
    if !path.exists() {
        return Ok(MemoryVectorStore::new());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read store {}", path.display()))?;
    let records: Vec<StoreRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid store snapshot {}", path.display()))?;
    Ok(MemoryVectorStore::from_records(records))
}

/// Write the store back as a pretty JSON snapshot.
pub async fn save_store(store: &MemoryVectorStore, path: &Path) -> Result<()> {
    let records = store.snapshot().await;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(&records)?)
        .with_context(|| format!("Failed to write store {}", path.display()))?;
    debug!(path = %path.display(), records = records.len(), "Saved store snapshot");
    Ok(())
}
