//! Shaper: rewrite passes that bring blocks to chunk size.
//!
//! Grouping merges runs of short sibling list items; splitting breaks long
//! paragraphs into overlapping sentence windows. Both passes are pure and
//! preserve document order.

mod group;
mod split;

pub use group::group_list_items;
pub use split::{split_long_paragraphs, split_sentences};

use crate::{ChunkOptions, ParsedBlock};

/// Grouping then splitting.
pub fn shape(blocks: Vec<ParsedBlock>, options: &ChunkOptions) -> Vec<ParsedBlock> {
    split_long_paragraphs(group_list_items(blocks, options), options)
}
