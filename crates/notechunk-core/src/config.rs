//! Configuration for chunking and sync.
//!
//! ## Configuration Hierarchy
//!
//! 1. **Built-in defaults**: see [`ChunkOptions::default`] and [`SyncOptions::default`]
//! 2. **Config file**: `<config dir>/notechunk/config.toml`, or an explicit path
//! 3. **Environment variables**: `NOTECHUNK_*` prefix
//!
//! ## Example Configuration File
//!
//! ```toml
//! [chunking]
//! long_paragraph_word_threshold = 300
//! long_paragraph_token_ceiling = 800
//! list_short_char_threshold = 120
//! list_group_min = 3
//! list_group_max = 7
//! max_chunks_soft = 50
//! sentence_overlap = 2
//!
//! [sync]
//! inter_call_delay_ms = 100
//! embedding_dimensions = 384
//! ```
//!
//! ```rust
//! use notechunk_core::{ChunkOptions, Config};
//!
//! let config: Config = toml::from_str("[chunking]\nmax_chunks_soft = 80\n")?;
//! assert_eq!(config.chunking.max_chunks_soft, 80);
//! assert_eq!(config.chunking.list_group_max, ChunkOptions::default().list_group_max);
//! # Ok::<(), toml::de::Error>(())
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "NOTECHUNK_";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chunking tunables
    pub chunking: ChunkOptions,
    /// Incremental sync tunables
    pub sync: SyncOptions,
}

/// Tunables for the block shaper and chunk assembler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkOptions {
    /// Paragraphs with more words than this are split by sentence.
    pub long_paragraph_word_threshold: usize,

    /// Paragraphs whose estimated token count (`ceil(chars / 4)`) exceeds
    /// this are split as well, regardless of word count.
    pub long_paragraph_token_ceiling: usize,

    /// List items shorter than this (in characters) are grouping candidates.
    pub list_short_char_threshold: usize,

    /// Minimum run of short sibling items that becomes a `list_group`.
    pub list_group_min: usize,

    /// Maximum number of items absorbed into one `list_group`.
    pub list_group_max: usize,

    /// Soft cap on chunks per note; the list is truncated in document order.
    pub max_chunks_soft: usize,

    /// Sentences repeated at the start of each split paragraph piece.
    pub sentence_overlap: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            long_paragraph_word_threshold: 300,
            long_paragraph_token_ceiling: 800,
            list_short_char_threshold: 120,
            list_group_min: 3,
            list_group_max: 7,
            max_chunks_soft: 50,
            sentence_overlap: 2,
        }
    }
}

impl ChunkOptions {
    /// Reject option combinations the shaper cannot honour.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("long_paragraph_word_threshold", self.long_paragraph_word_threshold),
            ("long_paragraph_token_ceiling", self.long_paragraph_token_ceiling),
            ("list_short_char_threshold", self.list_short_char_threshold),
            ("list_group_min", self.list_group_min),
            ("list_group_max", self.list_group_max),
            ("max_chunks_soft", self.max_chunks_soft),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(Error::Config(format!("{name} must be greater than zero")));
            }
        }
        if self.list_group_min > self.list_group_max {
            return Err(Error::Config(format!(
                "list_group_min ({}) exceeds list_group_max ({})",
                self.list_group_min, self.list_group_max
            )));
        }
        Ok(())
    }
}

/// Tunables for the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    /// Pause between consecutive collaborator calls, to respect rate limits.
    pub inter_call_delay_ms: u64,

    /// Vector size produced by the built-in `HashEmbedder`.
    pub embedding_dimensions: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            inter_call_delay_ms: 100,
            embedding_dimensions: 384,
        }
    }
}

impl SyncOptions {
    /// Pause between consecutive store calls.
    pub const fn inter_call_delay(&self) -> Duration {
        Duration::from_millis(self.inter_call_delay_ms)
    }
}

impl Config {
    /// Load configuration from the default location, then apply environment
    /// overrides. A missing file yields defaults; a malformed one is an error.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            Self::read_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from an explicit file, then apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Persist the configuration as pretty TOML, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;
        fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config: {e}")))?;
        Ok(())
    }

    /// Path of the default configuration file.
    ///
    /// - Linux: `~/.config/notechunk/config.toml`
    /// - macOS: `~/Library/Application Support/dev.outfitter.notechunk/config.toml`
    /// - Windows: `%APPDATA%\outfitter\notechunk\config\config.toml`
    pub fn config_path() -> Result<PathBuf> {
        let project_dirs = directories::ProjectDirs::from("dev", "outfitter", "notechunk")
            .ok_or_else(|| Error::Config("Failed to determine project directories".into()))?;
        Ok(project_dirs.config_dir().join("config.toml"))
    }

    fn read_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?;
        config.chunking.validate()?;
        Ok(config)
    }

    /// Apply `NOTECHUNK_*` variables from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup (`NOTECHUNK_` + upper-case field name).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let chunking = &mut self.chunking;
        let usize_fields: [(&str, &mut usize); 8] = [
            (
                "LONG_PARAGRAPH_WORD_THRESHOLD",
                &mut chunking.long_paragraph_word_threshold,
            ),
            (
                "LONG_PARAGRAPH_TOKEN_CEILING",
                &mut chunking.long_paragraph_token_ceiling,
            ),
            (
                "LIST_SHORT_CHAR_THRESHOLD",
                &mut chunking.list_short_char_threshold,
            ),
            ("LIST_GROUP_MIN", &mut chunking.list_group_min),
            ("LIST_GROUP_MAX", &mut chunking.list_group_max),
            ("MAX_CHUNKS_SOFT", &mut chunking.max_chunks_soft),
            ("SENTENCE_OVERLAP", &mut chunking.sentence_overlap),
            (
                "EMBEDDING_DIMENSIONS",
                &mut self.sync.embedding_dimensions,
            ),
        ];
        for (name, slot) in usize_fields {
            if let Some(raw) = lookup(&format!("{ENV_PREFIX}{name}")) {
                *slot = parse_override(name, &raw)?;
            }
        }
        if let Some(raw) = lookup(&format!("{ENV_PREFIX}INTER_CALL_DELAY_MS")) {
            self.sync.inter_call_delay_ms = parse_override("INTER_CALL_DELAY_MS", &raw)?;
        }
        self.chunking.validate()
    }
}

fn parse_override<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        Error::Config(format!(
            "Invalid value for {ENV_PREFIX}{name}: '{raw}' is not a non-negative integer"
        ))
    })
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_chunk_options() {
        // Given: Default options are requested
        let options = ChunkOptions::default();

        // Then: The documented defaults apply
        assert_eq!(options.long_paragraph_word_threshold, 300);
        assert_eq!(options.long_paragraph_token_ceiling, 800);
        assert_eq!(options.list_short_char_threshold, 120);
        assert_eq!(options.list_group_min, 3);
        assert_eq!(options.list_group_max, 7);
        assert_eq!(options.max_chunks_soft, 50);
        assert_eq!(options.sentence_overlap, 2);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str("[sync]\ninter_call_delay_ms = 0\n").unwrap();

        assert_eq!(config.sync.inter_call_delay_ms, 0);
        assert_eq!(config.sync.embedding_dimensions, 384);
        assert_eq!(config.chunking, ChunkOptions::default());
    }

    #[test]
    fn test_config_save_and_load_roundtrip() -> Result<()> {
        // Given: A temporary directory and a customised config
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("nested").join("config.toml");
        let mut original = Config::default();
        original.chunking.max_chunks_soft = 120;
        original.sync.inter_call_delay_ms = 5;

        // When: Saving and loading through the file helpers
        original.save_to(&path)?;
        let loaded = Config::read_file(&path)?;

        // Then: The configs match
        assert_eq!(loaded, original);
        Ok(())
    }

    #[test]
    fn test_config_parse_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("invalid.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();

        match Config::read_file(&path) {
            Err(Error::Config(msg)) => assert!(msg.contains("Failed to parse config")),
            other => panic!("Expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_config_load_missing_file() {
        let missing = PathBuf::from("/definitely/does/not/exist/config.toml");

        match Config::read_file(&missing) {
            Err(Error::Config(msg)) => assert!(msg.contains("Failed to read config")),
            other => panic!("Expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_inverted_group_bounds() {
        let options = ChunkOptions {
            list_group_min: 8,
            list_group_max: 4,
            ..ChunkOptions::default()
        };

        let err = options.validate().unwrap_err();
        assert!(err.to_string().contains("list_group_min"));
    }

    #[test]
    fn test_validate_rejects_zero_threshold() {
        let options = ChunkOptions {
            max_chunks_soft: 0,
            ..ChunkOptions::default()
        };

        assert!(matches!(options.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_overrides_apply_known_keys() -> Result<()> {
        // Given: Overrides for a chunking and a sync field
        let mut config = Config::default();
        let lookup = lookup_from(&[
            ("NOTECHUNK_MAX_CHUNKS_SOFT", "80"),
            ("NOTECHUNK_INTER_CALL_DELAY_MS", " 250 "),
            ("UNRELATED", "1"),
        ]);

        // When: Applying them
        config.apply_overrides(lookup)?;

        // Then: Only the named fields change
        assert_eq!(config.chunking.max_chunks_soft, 80);
        assert_eq!(config.sync.inter_call_delay_ms, 250);
        assert_eq!(config.chunking.list_group_max, 7);
        Ok(())
    }

    #[test]
    fn test_overrides_reject_garbage() {
        let mut config = Config::default();
        let lookup = lookup_from(&[("NOTECHUNK_LIST_GROUP_MIN", "three")]);

        let err = config.apply_overrides(lookup).unwrap_err();
        assert!(err.to_string().contains("NOTECHUNK_LIST_GROUP_MIN"));
    }

    #[test]
    fn test_overrides_are_validated() {
        let mut config = Config::default();
        let lookup = lookup_from(&[("NOTECHUNK_LIST_GROUP_MIN", "9")]);

        assert!(config.apply_overrides(lookup).is_err());
    }

    proptest! {
        #[test]
        fn test_chunk_options_roundtrip(
            word in 1usize..5_000,
            max_chunks in 1usize..1_000,
            min in 1usize..10,
            extra in 0usize..10,
        ) {
            let config = Config {
                chunking: ChunkOptions {
                    long_paragraph_word_threshold: word,
                    max_chunks_soft: max_chunks,
                    list_group_min: min,
                    list_group_max: min + extra,
                    ..ChunkOptions::default()
                },
                sync: SyncOptions::default(),
            };

            let serialized = toml::to_string_pretty(&config).unwrap();
            let deserialized: Config = toml::from_str(&serialized).unwrap();

            prop_assert_eq!(deserialized, config);
        }
    }
}
