use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point in the original, unmodified document text.
///
/// `line` is 0-based; `offset` is a byte offset into the UTF-8 source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    /// 0-based line number.
    pub line: usize,
    /// Byte offset from the start of the text.
    pub offset: usize,
}

impl Position {
    /// Position at `line` and byte `offset`.
    pub const fn new(line: usize, offset: usize) -> Self {
        Self { line, offset }
    }
}

/// Half-open byte range `[start.offset, end.offset)` into the original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Inclusive start.
    pub start: Position,
    /// Exclusive end.
    pub end: Position,
}

impl Span {
    /// Span from `start` to `end`.
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Span running from the start of `first` to the end of `last`.
    pub const fn covering(first: &Self, last: &Self) -> Self {
        Self {
            start: first.start,
            end: last.end,
        }
    }

    /// Length in bytes; zero for inverted spans.
    pub const fn len(&self) -> usize {
        self.end.offset.saturating_sub(self.start.offset)
    }

    /// Whether the span covers no bytes.
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `other` lies entirely inside this span.
    pub const fn contains(&self, other: &Self) -> bool {
        other.start.offset >= self.start.offset && other.end.offset <= self.end.offset
    }
}

/// Kind of an intermediate block, and of the chunk it becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    /// Prose paragraph, or one window of a split paragraph.
    Paragraph,
    /// A single list item without its children.
    ListItem,
    /// A run of short sibling list items merged into one chunk.
    ListGroup,
    /// Fenced or indented code block, kept verbatim.
    Code,
    /// Markdown table.
    Table,
    /// Block quote.
    Quote,
}

/// Chunks keep the type of the block they were built from.
pub type ChunkType = BlockType;

impl BlockType {
    /// Wire name, as stored in payloads.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::ListItem => "list_item",
            Self::ListGroup => "list_group",
            Self::Code => "code",
            Self::Table => "table",
            Self::Quote => "quote",
        }
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed slice of the document before grouping/splitting.
///
/// `text` is the raw slice between `span.start.offset` and `span.end.offset`
/// (list items have their bullet marker removed). Blocks never escape a
/// single chunking run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBlock {
    /// What kind of block this is.
    pub block_type: BlockType,
    /// Raw block text.
    pub text: String,
    /// Titles of the enclosing headings, outermost first.
    pub heading_path: Vec<String>,
    /// Nesting depth for list items, 0 at the top level.
    pub list_depth: Option<usize>,
    /// Text of the enclosing list item, for nested items.
    pub parent_item_text: Option<String>,
    /// 0-based position among siblings at the same depth.
    pub item_index: Option<usize>,
    /// Location in the original text.
    pub span: Span,
}

impl ParsedBlock {
    /// Block with no heading path or list context.
    pub fn new(block_type: BlockType, text: impl Into<String>, span: Span) -> Self {
        Self {
            block_type,
            text: text.into(),
            heading_path: Vec::new(),
            list_depth: None,
            parent_item_text: None,
            item_index: None,
            span,
        }
    }

    /// Set the heading path.
    #[must_use]
    pub fn with_heading_path(mut self, heading_path: Vec<String>) -> Self {
        self.heading_path = heading_path;
        self
    }
}

/// Caller-supplied facts about the document being chunked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteContext {
    /// Vault- or repository-relative path of the note.
    pub note_path: String,
    /// Stable identity of the whole document, independent of its content.
    pub original_id: Option<String>,
    /// Already-parsed frontmatter; read from the document when absent.
    #[serde(default)]
    pub frontmatter: Option<serde_json::Value>,
    /// Tags for every chunk; frontmatter tags are used when empty.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Aliases for every chunk; frontmatter aliases are used when empty.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Note creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Note modification time.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl NoteContext {
    /// Context for the note at `note_path` with the given identity.
    pub fn new(note_path: impl Into<String>, original_id: impl Into<String>) -> Self {
        Self {
            note_path: note_path.into(),
            original_id: Some(original_id.into()),
            ..Self::default()
        }
    }

    /// Replace the tags.
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Replace the aliases.
    #[must_use]
    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }

    /// Supply frontmatter instead of reading it from the document.
    #[must_use]
    pub fn with_frontmatter(mut self, frontmatter: serde_json::Value) -> Self {
        self.frontmatter = Some(frontmatter);
        self
    }

    /// Set creation and modification times.
    #[must_use]
    pub const fn with_timestamps(
        mut self,
        created_at: Option<DateTime<Utc>>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }

    /// The trimmed identity, if one was supplied and is non-blank.
    pub fn identity(&self) -> Option<&str> {
        self.original_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Metadata stored alongside every chunk in the vector store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkPayloadMeta {
    /// Trimmed identity of the document the chunk belongs to.
    pub original_id: String,
    /// Stable id, unique within the document.
    pub chunk_id: String,
    /// Hash of the whole document at chunking time.
    pub note_hash: String,
    /// Hash of the embedding text; drives change detection.
    pub content_hash: String,
    /// Kind of the source block.
    pub chunk_type: ChunkType,
    /// 0-based position among the document's chunks.
    pub chunk_index: usize,
    /// Innermost heading title, or empty.
    pub section: String,
    /// Titles of the enclosing headings, outermost first.
    pub headings_path: Vec<String>,
    /// Nesting depth for list items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_depth: Option<usize>,
    /// Position among list siblings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_index: Option<usize>,
    /// Text of the enclosing list item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_item_text: Option<String>,
    /// Id of the preceding chunk.
    pub prev_chunk_id: Option<String>,
    /// Id of the following chunk.
    pub next_chunk_id: Option<String>,
    /// Path of the note the chunk came from.
    pub document_path: String,
    /// Note tags.
    pub tags: Vec<String>,
    /// Note aliases.
    pub aliases: Vec<String>,
    /// Creation time in Unix milliseconds, 0 when unknown.
    pub created_at_ts: i64,
    /// Modification time in Unix milliseconds, 0 when unknown.
    pub updated_at_ts: i64,
}

/// The smallest indexable unit produced from a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Stable id, unique within the document.
    pub chunk_id: String,
    /// Kind of the source block.
    pub chunk_type: ChunkType,
    /// Titles of the enclosing headings, outermost first.
    pub headings_path: Vec<String>,
    /// Innermost heading title, or empty.
    pub section: String,
    /// Source text as written.
    pub content_raw: String,
    /// Normalized text with heading and parent context prepended.
    pub content_for_embedding: String,
    /// Payload metadata.
    pub meta: ChunkPayloadMeta,
    /// Location in the original text.
    pub span: Span,
}

/// Record payload written to the vector store for one chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkPayload {
    /// Chunk metadata, flattened into the payload object.
    #[serde(flatten)]
    pub meta: ChunkPayloadMeta,
    /// Source text as written.
    pub content_raw: String,
    /// Text that was embedded.
    pub content_for_embedding: String,
}

impl From<&Chunk> for ChunkPayload {
    fn from(chunk: &Chunk) -> Self {
        Self {
            meta: chunk.meta.clone(),
            content_raw: chunk.content_raw.clone(),
            content_for_embedding: chunk.content_for_embedding.clone(),
        }
    }
}

/// A problem recovered from while chunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// How serious the problem is.
    pub severity: DiagnosticSeverity,
    /// Human-readable description.
    pub message: String,
    /// 0-based line the problem was found on, when known.
    pub line: Option<usize>,
}

impl Diagnostic {
    /// Warning diagnostic.
    pub fn warn(message: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warn,
            message: message.into(),
            line,
        }
    }

    /// Informational diagnostic.
    pub fn info(message: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            severity: DiagnosticSeverity::Info,
            message: message.into(),
            line,
        }
    }
}

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// Reserved for problems that lose content.
    Error,
    /// Input was inconsistent and was repaired.
    Warn,
    /// Expected fallback behaviour.
    Info,
}

/// Full output of a chunking run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkReport {
    /// Chunks in document order.
    pub chunks: Vec<Chunk>,
    /// Problems recovered from while chunking.
    pub diagnostics: Vec<Diagnostic>,
    /// Hash of the whole document.
    pub note_hash: String,
    /// Number of chunks dropped by the soft cap.
    pub truncated: usize,
}
