//! # notechunk-core
//!
//! Structure-aware chunking of markdown notes, and incremental sync of the
//! resulting chunks into a vector index.
//!
//! A note is cut into small, independently addressable chunks whose ids are
//! content-addressed (or pinned by an author block reference), so re-chunking
//! an edited note yields the same ids for unchanged content. Comparing those
//! ids and hashes against what the index already holds drives the minimal
//! set of upserts and deletes.
//!
//! ## Architecture
//!
//! Data flows one way:
//!
//! - **Structure**: a [`StructureCache`] of regions, list items and headings,
//!   supplied by a host editor or built with [`StructureParser`]
//! - **Adapter**: validates the cache against the text and resolves heading paths
//! - **Blocks**: slices typed blocks out of the original text and filters noise
//! - **Shaper**: groups short list items and splits long paragraphs
//! - **Identity**: embedding text, content hashes and chunk ids
//! - **Chunker**: assembles linked [`Chunk`]s with payload metadata
//! - **Sync**: classifies chunks against a baseline and applies the plan
//!
//! ## Quick Start
//!
//! ```rust
//! use notechunk_core::{ChunkOptions, NoteContext, chunk_markdown};
//!
//! let context = NoteContext::new("notes/rust.md", "20240101120000");
//! let report = chunk_markdown(
//!     "# Rust\n\nOwnership rules.\n\n- borrow\n- move\n- copy\n",
//!     &context,
//!     &ChunkOptions::default(),
//! )?;
//!
//! assert_eq!(report.chunks.len(), 2);
//! assert_eq!(report.chunks[0].headings_path, vec!["Rust"]);
//! # Ok::<(), notechunk_core::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! Chunking never fails on malformed input; it degrades and records
//! [`Diagnostic`]s. The one hard error is a missing document identity:
//!
//! ```rust
//! use notechunk_core::{ChunkOptions, Error, NoteContext, chunk_note};
//!
//! let context = NoteContext::default();
//! let result = chunk_note("text", &context, &ChunkOptions::default(), None);
//! assert!(matches!(result, Err(Error::MissingDocumentIdentity)));
//! ```

/// Cache normalization and heading-path resolution
pub mod adapter;
/// Block parsing over normalized regions
pub mod blocks;
/// Public chunking entry points
pub mod chunker;
/// Configuration loading and tunables
pub mod config;
/// Error types and result aliases
pub mod error;
/// Noise filtering for parsed blocks
pub mod filter;
/// Leading YAML frontmatter handling
pub mod frontmatter;
/// Embedding text, hashes and ids
pub mod identity;
/// Link and emphasis normalization
pub mod normalize;
/// List grouping and paragraph splitting
pub mod shaper;
/// Structural cache types and the tree-sitter provider
pub mod structure;
/// Baseline classification and store sync
pub mod sync;
/// Core data types
pub mod types;
/// String helpers
pub mod utils;

pub use adapter::{HeadingCursor, HeadingResolver, LineIndex, NormalizedCache};
pub use chunker::{chunk_markdown, chunk_note, chunk_note_with_report};
pub use config::{ChunkOptions, Config, SyncOptions};
pub use error::{Error, Result};
pub use identity::{build_embedding_text, extract_block_id, note_hash, record_id_for};
pub use structure::{StructureCache, StructureParser};
pub use sync::{
    BaselineAnomaly, BaselineEntry, Classification, Embedder, Embedding, HashEmbedder,
    MemoryVectorStore, StoreRecord, SyncAction, SyncEngine, SyncItemResult, SyncOutcome, SyncPlan,
    SyncReport, SyncStatus, SyncSummary, VectorStore, baseline_from_records,
    classify_against_baseline, plan_sync,
};
pub use types::*;
