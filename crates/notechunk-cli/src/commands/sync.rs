//! Sync and purge command implementations
//!
//! The store is a JSON snapshot loaded into a [`MemoryVectorStore`] and written
//! back after the run, so partial failures still persist what was applied.

use anyhow::Result;
use notechunk_core::{Config, HashEmbedder, SyncEngine};
use std::path::Path;
use tracing::warn;

use super::{chunk_file, open_store, save_store};
use crate::cli::NoteArgs;
use crate::output::{self, OutputFormat};

/// Chunk a note and sync it into the store snapshot.
pub async fn execute(
    note: &NoteArgs,
    store_path: &Path,
    format: OutputFormat,
    config: &Config,
) -> Result<()> {
    let report = chunk_file(note, &config.chunking)?;
    if format == OutputFormat::Text {
        output::print_diagnostics(&report.diagnostics);
    }

    let store = open_store(store_path)?;
    let embedder = HashEmbedder::new(config.sync.embedding_dimensions);
    let engine = SyncEngine::with_options(embedder, store, &config.sync);

    let outcome = engine.sync_note(note.original_id.trim(), &report.chunks).await;
    save_store(engine.store(), store_path).await?;
    let sync = outcome?;

    match format {
        OutputFormat::Json => output::print_json(&sync)?,
        OutputFormat::Jsonl => output::print_jsonl(&sync.items)?,
        OutputFormat::Text => {
            output::print_anomalies_text(&sync.anomalies);
            output::print_items_text(&sync.items);
            output::print_summary_text(&sync.summary);
        },
    }

    let failed = sync.failures().count();
    if failed > 0 {
        warn!(failed, "Some store operations failed; rerun sync to retry them");
        anyhow::bail!("{failed} store operation(s) failed");
    }
    Ok(())
}

/// Remove every record of a document from the store snapshot.
pub async fn purge(original_id: &str, store_path: &Path, config: &Config) -> Result<()> {
    let original_id = original_id.trim();
    let store = open_store(store_path)?;
    let engine = SyncEngine::with_options(
        HashEmbedder::new(config.sync.embedding_dimensions),
        store,
        &config.sync,
    );

    let removed = engine.purge_note(original_id).await?;
    save_store(engine.store(), store_path).await?;
    println!("Removed {removed} record(s) for '{original_id}'");
    Ok(())
}
