use crate::{BlockType, ChunkOptions, ParsedBlock, Span};

const BULLET: &str = "• ";

fn is_short_item(block: &ParsedBlock, options: &ChunkOptions) -> bool {
    block.block_type == BlockType::ListItem
        && block.text.trim().chars().count() < options.list_short_char_threshold
}

fn is_sibling(first: &ParsedBlock, next: &ParsedBlock) -> bool {
    first.heading_path == next.heading_path && first.list_depth == next.list_depth
}

/// Merge runs of short sibling list items into `list_group` blocks.
///
/// A run needs at least `list_group_min` items and absorbs at most
/// `list_group_max`. Shorter runs pass through unchanged, as does every
/// non-`list_item` block, so the pass is idempotent.
pub fn group_list_items(blocks: Vec<ParsedBlock>, options: &ChunkOptions) -> Vec<ParsedBlock> {
    let mut out = Vec::with_capacity(blocks.len());
    let mut iter = blocks.into_iter().peekable();

    while let Some(block) = iter.next() {
        if !is_short_item(&block, options) {
            out.push(block);
            continue;
        }

        let mut run = vec![block];
        while run.len() < options.list_group_max {
            let Some(next) = iter.next_if(|n| is_short_item(n, options) && is_sibling(&run[0], n))
            else {
                break;
            };
            run.push(next);
        }

        if run.len() >= options.list_group_min {
            out.push(merge(run));
        } else {
            out.extend(run);
        }
    }

    out
}

fn merge(run: Vec<ParsedBlock>) -> ParsedBlock {
    let text = run
        .iter()
        .map(|item| format!("{BULLET}{}", item.text.trim()))
        .collect::<Vec<_>>()
        .join("\n");

    let first = &run[0];
    let last = &run[run.len() - 1];
    let mut group = ParsedBlock::new(
        BlockType::ListGroup,
        text,
        Span::covering(&first.span, &last.span),
    )
    .with_heading_path(first.heading_path.clone());
    group.list_depth = first.list_depth;
    group.parent_item_text = first.parent_item_text.clone();
    group.item_index = first.item_index;
    group
}
