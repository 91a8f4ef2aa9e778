use super::{
    BaselineAnomaly, ORIGINAL_ID_KEY, StoreRecord, SyncPlan, SyncSummary, baseline_from_records,
    classify_against_baseline, plan_sync,
};
use crate::identity::record_id_for;
use crate::{Chunk, ChunkPayload, Error, Result, SyncOptions};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Output of an embedding call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    /// The embedding.
    pub vector: Vec<f32>,
    /// Length of `vector`.
    pub dimensions: usize,
    /// Hash of the embedded text, when the generator reports one.
    pub content_hash: Option<String>,
}

/// Text to vector. Oversized input handling is the implementation's concern.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Embedding>;
}

/// Vector store client.
///
/// Timeouts and retries belong to the implementation; failures surface as
/// errors and are attributed to the affected item by [`SyncEngine`].
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite one record.
    async fn upsert(&self, record_id: &str, vector: Vec<f32>, payload: serde_json::Value)
    -> Result<()>;

    /// Remove one record. Removing an absent record is not an error.
    async fn delete(&self, record_id: &str) -> Result<()>;

    /// Remove every record whose payload `key` equals `value`; returns the count.
    async fn delete_by_filter(&self, key: &str, value: &str) -> Result<usize>;

    /// Every record whose payload `key` equals `value`.
    async fn scroll_by_filter(&self, key: &str, value: &str) -> Result<Vec<StoreRecord>>;
}

/// Kind of store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    /// Embed a chunk and write its record.
    Upsert,
    /// Remove a record.
    Delete,
}

/// Result of one store operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum SyncOutcome {
    /// The operation succeeded.
    Applied,
    /// The operation failed and the store may still hold the old state.
    Failed {
        /// Rendered error.
        error: String,
        /// Whether a retry may succeed.
        recoverable: bool,
    },
}

/// What happened to one planned store operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncItemResult {
    /// Chunk written, for upserts.
    pub chunk_id: Option<String>,
    /// Record written or removed.
    pub record_id: String,
    /// What was attempted.
    pub action: SyncAction,
    /// How it went.
    pub outcome: SyncOutcome,
}

impl SyncItemResult {
    fn from_result(
        chunk_id: Option<&str>,
        record_id: String,
        action: SyncAction,
        result: Result<()>,
    ) -> Self {
        let outcome = match result {
            Ok(()) => SyncOutcome::Applied,
            Err(e) => {
                warn!(record_id = %record_id, ?action, "Sync item failed: {e}");
                SyncOutcome::from(&e)
            },
        };
        Self {
            chunk_id: chunk_id.map(str::to_string),
            record_id,
            action,
            outcome,
        }
    }

    /// Whether the operation was applied.
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, SyncOutcome::Applied)
    }
}

/// Outcome of syncing one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Trimmed document identity that was synced.
    pub original_id: String,
    /// Classification counts.
    pub summary: SyncSummary,
    /// Unreadable or duplicate baseline records.
    pub anomalies: Vec<BaselineAnomaly>,
    /// One result per store operation, in the order applied.
    pub items: Vec<SyncItemResult>,
}

impl SyncReport {
    /// Operations that failed.
    pub fn failures(&self) -> impl Iterator<Item = &SyncItemResult> {
        self.items.iter().filter(|item| !item.is_success())
    }

    /// Every planned operation was applied.
    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Applies sync plans through injected collaborators.
///
/// Operations run sequentially with a pause between calls. Concurrent syncs
/// of the same `original_id` must be serialized by the caller.
pub struct SyncEngine<E, S> {
    embedder: E,
    store: S,
    delay: Duration,
}

impl<E: Embedder, S: VectorStore> SyncEngine<E, S> {
    /// Engine with default sync options.
    pub fn new(embedder: E, store: S) -> Self {
        Self::with_options(embedder, store, &SyncOptions::default())
    }

    /// Engine paced by `options`.
    pub fn with_options(embedder: E, store: S, options: &SyncOptions) -> Self {
        Self {
            embedder,
            store,
            delay: options.inter_call_delay(),
        }
    }

    /// Override the pause between store calls.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// The store collaborator.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The embedding collaborator.
    pub const fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Bring the store in line with `chunks` for one document.
    ///
    /// `original_id` is trimmed the same way chunking trims it. Fails when it
    /// is blank, when a chunk belongs to another document, or when the
    /// baseline cannot be read; individual upsert and delete failures are
    /// reported in [`SyncReport::items`].
    pub async fn sync_note(&self, original_id: &str, chunks: &[Chunk]) -> Result<SyncReport> {
        let original_id = document_identity(original_id)?;
        if let Some(foreign) = chunks.iter().find(|c| c.meta.original_id != original_id) {
            return Err(Error::DocumentMismatch {
                expected: original_id.to_string(),
                found: foreign.meta.original_id.clone(),
            });
        }

        let records = self
            .store
            .scroll_by_filter(ORIGINAL_ID_KEY, original_id)
            .await
            .map_err(|e| e.into_transport(original_id))?;

        let (baseline, mut anomalies) = baseline_from_records(&records);
        let classification = classify_against_baseline(chunks, &baseline);
        anomalies.extend(classification.anomalies.iter().cloned());
        let summary = classification.summary();

        let plan = plan_sync(&classification);
        let items = self.apply_plan(&plan).await;

        let report = SyncReport {
            original_id: original_id.to_string(),
            summary,
            anomalies,
            items,
        };
        info!(
            original_id,
            new = summary.new,
            modified = summary.modified,
            unchanged = summary.unchanged,
            deleted = summary.deleted,
            failed = report.failures().count(),
            "Synced note"
        );
        Ok(report)
    }

    /// Apply a plan, upserts first, one result per operation.
    pub async fn apply_plan(&self, plan: &SyncPlan<'_>) -> Vec<SyncItemResult> {
        let mut results = Vec::with_capacity(plan.to_upsert.len() + plan.to_delete_record_ids.len());

        for chunk in &plan.to_upsert {
            self.pace(results.len()).await;
            let record_id = record_id_for(&chunk.meta.original_id, &chunk.chunk_id);
            let result = self.upsert_chunk(chunk, &record_id).await;
            results.push(SyncItemResult::from_result(
                Some(&chunk.chunk_id),
                record_id,
                SyncAction::Upsert,
                result,
            ));
        }

        for record_id in &plan.to_delete_record_ids {
            self.pace(results.len()).await;
            let result = self
                .store
                .delete(record_id)
                .await
                .map_err(|e| e.into_transport(record_id.as_str()));
            results.push(SyncItemResult::from_result(
                None,
                record_id.clone(),
                SyncAction::Delete,
                result,
            ));
        }

        debug!(operations = results.len(), "Applied sync plan");
        results
    }

    /// Delete every stored record of a document.
    pub async fn purge_note(&self, original_id: &str) -> Result<usize> {
        let original_id = document_identity(original_id)?;
        let removed = self
            .store
            .delete_by_filter(ORIGINAL_ID_KEY, original_id)
            .await
            .map_err(|e| e.into_transport(original_id))?;
        info!(original_id, removed, "Purged note");
        Ok(removed)
    }

    async fn upsert_chunk(&self, chunk: &Chunk, record_id: &str) -> Result<()> {
        let embedding = self
            .embedder
            .embed(&chunk.content_for_embedding)
            .await
            .map_err(|e| e.into_transport(chunk.chunk_id.as_str()))?;
        let payload = serde_json::to_value(ChunkPayload::from(chunk))?;
        self.store
            .upsert(record_id, embedding.vector, payload)
            .await
            .map_err(|e| e.into_transport(chunk.chunk_id.as_str()))
    }

    /// Sleep before every call except the first.
    async fn pace(&self, calls_so_far: usize) {
        if calls_so_far > 0 && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

fn document_identity(original_id: &str) -> Result<&str> {
    Some(original_id.trim())
        .filter(|id| !id.is_empty())
        .ok_or(Error::MissingDocumentIdentity)
}

impl From<&Error> for SyncOutcome {
    fn from(error: &Error) -> Self {
        Self::Failed {
            error: error.to_string(),
            recoverable: error.is_recoverable(),
        }
    }
}
