//! Incremental sync: classify fresh chunks against the stored baseline and
//! plan the minimal set of upserts and deletes.
//!
//! Classification and planning are pure. [`SyncEngine`] applies a plan
//! through injected [`Embedder`] and [`VectorStore`] collaborators.

mod engine;
mod memory;

pub use engine::{
    Embedder, Embedding, SyncAction, SyncEngine, SyncItemResult, SyncOutcome, SyncReport,
    VectorStore,
};
pub use memory::{HashEmbedder, MemoryVectorStore};

use crate::identity::record_id_for;
use crate::{Chunk, Error};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

/// Payload key holding the document identity of a stored record.
pub const ORIGINAL_ID_KEY: &str = "originalId";
const CHUNK_ID_KEY: &str = "chunkId";
const CONTENT_HASH_KEY: &str = "contentHash";

/// A chunk previously persisted for a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineEntry {
    /// Chunk id recorded in the payload.
    pub chunk_id: String,
    /// Content hash recorded in the payload.
    pub stored_content_hash: String,
    /// Id of the store record holding it.
    pub store_record_id: String,
}

/// A record as returned by a vector store scroll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    /// Record id.
    pub id: String,
    /// Stored embedding.
    #[serde(default)]
    pub vector: Vec<f32>,
    /// Stored payload object.
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// How a chunk id compares between the current chunks and the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Present now, absent from the baseline.
    New,
    /// Present in both with a different content hash.
    Modified,
    /// Present in both with the same content hash.
    Unchanged,
    /// Absent now, present in the baseline.
    Deleted,
}

impl SyncStatus {
    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Modified => "modified",
            Self::Unchanged => "unchanged",
            Self::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A baseline inconsistency that was resolved deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineAnomaly {
    /// Chunk id involved, when the record had one.
    pub chunk_id: Option<String>,
    /// Store record involved.
    pub record_id: String,
    /// Description of the anomaly.
    pub message: String,
}

impl BaselineAnomaly {
    fn new(chunk_id: Option<&str>, record_id: &str, detail: String) -> Self {
        let message = Error::BaselineInconsistency(detail).to_string();
        warn!("{message}");
        Self {
            chunk_id: chunk_id.map(str::to_string),
            record_id: record_id.to_string(),
            message,
        }
    }
}

/// Counts per classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    /// Chunks to insert.
    pub new: usize,
    /// Chunks to overwrite.
    pub modified: usize,
    /// Chunks left alone.
    pub unchanged: usize,
    /// Stored chunks to remove.
    pub deleted: usize,
}

impl SyncSummary {
    /// Number of distinct chunk ids classified.
    pub const fn total(&self) -> usize {
        self.new + self.modified + self.unchanged + self.deleted
    }

    /// Whether applying the plan would touch the store at all.
    pub const fn is_noop(&self) -> bool {
        self.new == 0 && self.modified == 0 && self.deleted == 0
    }
}

/// Result of comparing current chunks with a baseline.
#[derive(Debug, Clone)]
pub struct Classification<'a> {
    /// Exactly one status per chunk id in `current ∪ baseline`.
    pub statuses: BTreeMap<String, SyncStatus>,
    /// Baseline inconsistencies found while classifying.
    pub anomalies: Vec<BaselineAnomaly>,
    current: &'a [Chunk],
    baseline: HashMap<String, BaselineEntry>,
    /// Record ids of duplicate baseline entries that lost to a later one.
    superseded: Vec<String>,
}

impl<'a> Classification<'a> {
    /// Status of `chunk_id`, if it was classified.
    pub fn status(&self, chunk_id: &str) -> Option<SyncStatus> {
        self.statuses.get(chunk_id).copied()
    }

    /// The chunks that were classified.
    pub fn current(&self) -> &'a [Chunk] {
        self.current
    }

    /// Counts per status.
    pub fn summary(&self) -> SyncSummary {
        self.statuses
            .values()
            .fold(SyncSummary::default(), |mut acc, status| {
                match status {
                    SyncStatus::New => acc.new += 1,
                    SyncStatus::Modified => acc.modified += 1,
                    SyncStatus::Unchanged => acc.unchanged += 1,
                    SyncStatus::Deleted => acc.deleted += 1,
                }
                acc
            })
    }
}

/// Classify `current` against `baseline`, keyed by chunk id.
///
/// Duplicate baseline ids are resolved in favour of the later entry and
/// reported as anomalies.
pub fn classify_against_baseline<'a>(
    current: &'a [Chunk],
    baseline: &[BaselineEntry],
) -> Classification<'a> {
    let mut anomalies = Vec::new();
    let mut superseded = Vec::new();
    let mut winners: HashMap<String, BaselineEntry> = HashMap::with_capacity(baseline.len());

    for entry in baseline {
        if let Some(previous) = winners.insert(entry.chunk_id.clone(), entry.clone()) {
            anomalies.push(BaselineAnomaly::new(
                Some(&entry.chunk_id),
                &previous.store_record_id,
                format!(
                    "duplicate baseline chunk id {}; record {} superseded by {}",
                    entry.chunk_id, previous.store_record_id, entry.store_record_id
                ),
            ));
            if previous.store_record_id != entry.store_record_id {
                superseded.push(previous.store_record_id);
            }
        }
    }

    let mut statuses = BTreeMap::new();
    for chunk in current {
        let status = match winners.get(&chunk.chunk_id) {
            None => SyncStatus::New,
            Some(entry) if entry.stored_content_hash == chunk.meta.content_hash => {
                SyncStatus::Unchanged
            },
            Some(_) => SyncStatus::Modified,
        };
        statuses.insert(chunk.chunk_id.clone(), status);
    }
    for chunk_id in winners.keys() {
        statuses
            .entry(chunk_id.clone())
            .or_insert(SyncStatus::Deleted);
    }

    let classification = Classification {
        statuses,
        anomalies,
        current,
        baseline: winners,
        superseded,
    };
    let summary = classification.summary();
    debug!(
        new = summary.new,
        modified = summary.modified,
        unchanged = summary.unchanged,
        deleted = summary.deleted,
        "Classified chunks against baseline"
    );
    classification
}

/// Work needed to bring the store in line with the current chunks.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPlan<'a> {
    /// New and modified chunks, in document order.
    pub to_upsert: Vec<&'a Chunk>,
    /// Store records to remove: deleted chunks by id, then superseded duplicates.
    pub to_delete_record_ids: Vec<String>,
}

impl SyncPlan<'_> {
    /// Whether the plan would touch the store at all.
    pub fn is_empty(&self) -> bool {
        self.to_upsert.is_empty() && self.to_delete_record_ids.is_empty()
    }
}

/// Turn a classification into upserts and deletes. Unchanged chunks cost
/// nothing.
///
/// A modified chunk whose stored record lives under a different id than the
/// one it will be written to also gets that old record deleted, so a record
/// id scheme change cannot leave orphans. A record id that is written by this
/// plan is never also deleted by it.
pub fn plan_sync<'a>(classification: &Classification<'a>) -> SyncPlan<'a> {
    let mut plan = SyncPlan::default();
    let mut planned: HashSet<&str> = HashSet::new();

    for chunk in classification.current {
        if !planned.insert(chunk.chunk_id.as_str()) {
            continue;
        }
        match classification.status(&chunk.chunk_id) {
            Some(SyncStatus::New) => plan.to_upsert.push(chunk),
            Some(SyncStatus::Modified) => {
                plan.to_upsert.push(chunk);
                if let Some(entry) = classification.baseline.get(&chunk.chunk_id) {
                    let target = record_id_for(&chunk.meta.original_id, &chunk.chunk_id);
                    if entry.store_record_id != target {
                        push_unique(&mut plan.to_delete_record_ids, &entry.store_record_id);
                    }
                }
            },
            Some(SyncStatus::Unchanged | SyncStatus::Deleted) | None => {},
        }
    }

    let mut deleted: Vec<&BaselineEntry> = classification
        .baseline
        .values()
        .filter(|e| classification.status(&e.chunk_id) == Some(SyncStatus::Deleted))
        .collect();
    deleted.sort_by(|a, b| a.chunk_id.cmp(&b.chunk_id));
    for entry in deleted {
        push_unique(&mut plan.to_delete_record_ids, &entry.store_record_id);
    }
    for record_id in &classification.superseded {
        push_unique(&mut plan.to_delete_record_ids, record_id);
    }

    let targets: HashSet<String> = plan
        .to_upsert
        .iter()
        .map(|c| record_id_for(&c.meta.original_id, &c.chunk_id))
        .collect();
    plan.to_delete_record_ids.retain(|id| !targets.contains(id));

    plan
}

fn push_unique(ids: &mut Vec<String>, id: &str) {
    if !ids.iter().any(|existing| existing == id) {
        ids.push(id.to_string());
    }
}

/// Build baseline entries from scrolled store records.
///
/// Records without a `chunkId` or `contentHash` payload string cannot be
/// matched and are reported as anomalies instead.
pub fn baseline_from_records(records: &[StoreRecord]) -> (Vec<BaselineEntry>, Vec<BaselineAnomaly>) {
    let mut entries = Vec::with_capacity(records.len());
    let mut anomalies = Vec::new();

    for record in records {
        let field = |key: &str| record.payload.get(key).and_then(serde_json::Value::as_str);
        match (field(CHUNK_ID_KEY), field(CONTENT_HASH_KEY)) {
            (Some(chunk_id), Some(hash)) => entries.push(BaselineEntry {
                chunk_id: chunk_id.to_string(),
                stored_content_hash: hash.to_string(),
                store_record_id: record.id.clone(),
            }),
            (chunk_id, _) => anomalies.push(BaselineAnomaly::new(
                chunk_id,
                &record.id,
                format!("record {} lacks {CHUNK_ID_KEY} or {CONTENT_HASH_KEY}", record.id),
            )),
        }
    }

    (entries, anomalies)
}
