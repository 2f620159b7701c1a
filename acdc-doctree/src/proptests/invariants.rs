//! Parser invariant tests using property-based testing.
//!
//! - Panics: no input, however malformed, makes the parser panic.
//! - Blank accounting: every blank sentinel names a blank source line, once.
//! - Determinism: the same input always yields the same document.
#![allow(clippy::wildcard_enum_match_arm)]

use proptest::prelude::*;

use crate::{Block, BlockContent, Document, Options, model::CellContent, normalizer, parse, parse_lines};

use super::generators::*;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 500,
        max_shrink_iters: 5000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn parser_never_panics(input in any_document_string()) {
        let _ = parse(&input, &Options::default());
    }

    #[test]
    fn line_entry_never_panics(input in ascii_document()) {
        let lines: Vec<&str> = input.split('\n').collect();
        let _ = parse_lines(&lines, &Options::default());
    }

    #[test]
    fn blank_sentinels_name_blank_lines(input in structured_document()) {
        let doc = parse(&input, &Options::default()).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let source = normalizer::normalize(&input, None);
        let mut seen = Vec::new();
        collect_blanks(&doc.blocks, &mut seen);

        for number in &seen {
            let line = source.iter().find(|line| line.number == *number);
            prop_assert!(
                line.is_some_and(normalizer::Line::is_blank),
                "sentinel for line {number} does not name a blank line"
            );
        }
        let mut sorted = seen.clone();
        sorted.sort_unstable();
        sorted.dedup();
        prop_assert_eq!(sorted.len(), seen.len(), "a blank line was emitted twice");
    }

    #[test]
    fn lists_open_on_an_item(input in structured_document()) {
        let doc = parse(&input, &Options::default()).map_err(|e| TestCaseError::fail(e.to_string()))?;
        for list in lists(&doc) {
            let first_item = list.items.iter().position(Block::is_list_item);
            // a list opens on an item, never on a sentinel
            prop_assert_eq!(first_item, Some(0));
        }
    }

    #[test]
    fn parsing_is_deterministic(input in structured_document()) {
        let options = Options::default();
        let first = parse(&input, &options);
        let second = parse(&input, &options);
        match (first, second) {
            (Ok(first), Ok(second)) => prop_assert_eq!(first, second),
            (Err(first), Err(second)) => prop_assert_eq!(first.to_string(), second.to_string()),
            (Ok(_), Err(_)) | (Err(_), Ok(_)) => prop_assert!(false, "outcomes differ"),
        }
    }
}

// ========================================================================
// Helper functions
// ========================================================================

fn collect_blanks(blocks: &[Block], seen: &mut Vec<usize>) {
    for block in blocks {
        match block {
            Block::Blank(blank) => seen.push(blank.line),
            _ => visit_children(block, &mut |children| collect_blanks(children, seen)),
        }
    }
}

/// Calls `visit` with every block sequence directly nested in `block`.
fn visit_children(block: &Block, visit: &mut dyn FnMut(&[Block])) {
    match block {
        Block::Section(section) => visit(&section.blocks),
        Block::List(list) => visit(&list.items),
        Block::DescriptionListItem(item) => visit(&item.body),
        Block::ListContinuation(continuation) => visit(std::slice::from_ref(&*continuation.block)),
        Block::Delimited(delimited) => {
            if let BlockContent::Blocks(inner) = &delimited.content {
                visit(inner);
            }
        }
        Block::Table(table) => {
            let rows = table.header.iter().chain(&table.rows).chain(&table.footer);
            for cell in rows.flat_map(|row| &row.cells) {
                if let CellContent::Blocks(inner) = &cell.content {
                    visit(inner);
                }
            }
        }
        _ => {}
    }
}

fn lists(doc: &Document) -> Vec<&crate::List> {
    fn walk<'a>(blocks: &'a [Block], found: &mut Vec<&'a crate::List>) {
        for block in blocks {
            if let Block::List(list) = block {
                found.push(list);
            }
            match block {
                Block::Section(section) => walk(&section.blocks, found),
                Block::List(list) => walk(&list.items, found),
                Block::DescriptionListItem(item) => walk(&item.body, found),
                Block::ListContinuation(continuation) => walk(std::slice::from_ref(&*continuation.block), found),
                Block::Delimited(delimited) => {
                    if let BlockContent::Blocks(inner) = &delimited.content {
                        walk(inner, found);
                    }
                }
                _ => {}
            }
        }
    }
    let mut found = Vec::new();
    walk(&doc.blocks, &mut found);
    found
}
