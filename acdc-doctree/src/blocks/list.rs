//! Unordered, ordered, description and callout lists.
//!
//! Items of every level are kept in one flat sequence. A stack of frames holds the
//! marker family and indent of each open level: a marker matching a frame is a
//! sibling at that level, a marker not seen yet opens the next level down.
use super::{
    Parser, Scope, Step,
    classify::{self, ListMarker, MarkerKey},
    span_blocks,
};
use crate::{
    anchor::{AnchorKind, Registration},
    callouts::{Mark, parse_list_item},
    diagnostic::DiagnosticKind,
    grammar::{
        anchors::{parse_bibliography_anchor, parse_block_anchor},
        attributes::{is_attribute_list_line, parse_entry},
    },
    inlines,
    model::{
        Blank, Block, BlockMetadata, CalloutListItem, CheckState, Comment, CommentKind,
        DescriptionListItem, InlineAnchor, InlineNode, List, ListContinuation, ListKind, Numbering,
        OrderedListItem, UnorderedListItem,
    },
    normalizer::Line,
    preprocessor::span,
};

/// One open nesting level.
#[derive(Debug)]
struct Frame {
    key: MarkerKey,
    indent: usize,
    last_ordinal: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Placement {
    /// A sibling of the open item at this frame index.
    Sibling(usize),
    /// The first item of a new, deeper level.
    Nested,
}

/// Where an item with `marker` goes in the list described by `frames`. `None` when
/// the item starts a list of its own.
///
/// `-` and explicitly numbered markers can repeat at any depth, so they only nest by
/// indent, and only when a blank line separates them from the item above.
fn placement(frames: &[Frame], root: ListKind, marker: &ListMarker, separated: bool) -> Option<Placement> {
    let Some(root_frame) = frames.first() else {
        return Some(Placement::Nested);
    };
    let matching: Vec<usize> = frames
        .iter()
        .enumerate()
        .filter(|(_, frame)| frame.key == marker.key)
        .map(|(index, _)| index)
        .collect();
    if marker.key.nests_by_indent() {
        let chosen = matching
            .iter()
            .rev()
            .find(|&&index| frames.get(index).is_some_and(|frame| frame.indent <= marker.indent))
            .or(matching.first())
            .copied();
        if let Some(index) = chosen {
            let deeper = frames.get(index).is_some_and(|frame| marker.indent > frame.indent);
            if deeper && separated && matching.last() == Some(&index) {
                return Some(Placement::Nested);
            }
            return Some(Placement::Sibling(index));
        }
    } else if let Some(&index) = matching.last() {
        return Some(Placement::Sibling(index));
    }
    if marker.kind != root && marker.indent <= root_frame.indent {
        return None;
    }
    Some(Placement::Nested)
}

/// Lines a description without text on its term line never absorbs.
fn is_structural(text: &str) -> bool {
    classify::fence(text).is_some()
        || classify::is_continuation(text)
        || classify::line_comment(text).is_some()
        || classify::heading(text).is_some()
        || classify::is_thematic_break(text)
        || classify::is_page_break(text)
        || classify::block_title(text).is_some()
        || classify::block_macro(text).is_some()
        || parse_entry(text).is_some()
        || is_attribute_list_line(text)
        || parse_block_anchor(text).is_some()
}

impl Parser<'_> {
    #[tracing::instrument(level = "trace", skip_all, fields(line = first.number, marker = %marker.marker))]
    pub(super) fn list(&mut self, first: Line, marker: ListMarker) -> Block {
        let metadata = self.take_metadata();
        self.register_block_anchor(&metadata, &first);
        let kind = marker.kind;
        let bibliography = self.bibliography || metadata.style_is("bibliography");
        let first_location = first.location();
        let mut frames: Vec<Frame> = Vec::new();
        let mut items = Vec::new();
        let mut start = None;

        let mut next = Some((first, marker, Placement::Nested));
        while let Some((line, marker, placement)) = next.take() {
            let level = match placement {
                Placement::Sibling(index) => {
                    frames.truncate(index + 1);
                    index + 1
                }
                Placement::Nested => {
                    frames.push(Frame {
                        key: marker.key,
                        indent: marker.indent,
                        last_ordinal: None,
                    });
                    frames.len()
                }
            };
            if let Some(ordinal) = marker.ordinal
                && let Some(frame) = frames.last_mut()
            {
                match frame.last_ordinal {
                    Some(previous) if ordinal != previous.saturating_add(1) => {
                        self.state.diagnostics.warn(
                            DiagnosticKind::OutOfSequenceListItem,
                            &line,
                            format!(
                                "list item index: expected {}, got {ordinal}",
                                previous.saturating_add(1)
                            ),
                        );
                    }
                    Some(_) => {}
                    None if level == 1 && ordinal != 1 => start = Some(ordinal),
                    None => {}
                }
                frame.last_ordinal = Some(ordinal);
            }
            let item = self.list_item(line, marker, level, bibliography);
            items.push(item);
            next = self.list_tail(&mut items, &frames, kind);
        }

        if kind == ListKind::Callout {
            self.state.callouts.finish_list();
        }
        let location = span_blocks(first_location, &items);
        tracing::trace!(?kind, items = items.len(), "list closed");
        Block::List(List {
            kind,
            metadata,
            start,
            items,
            location,
        })
    }

    fn list_item(&mut self, line: Line, marker: ListMarker, level: usize, bibliography: bool) -> Block {
        let ListMarker {
            kind,
            key,
            marker,
            indent,
            text,
            term,
            ordinal,
        } = marker;
        if kind == ListKind::Description {
            return self.description_item(line, marker, term.unwrap_or_default(), text, level);
        }
        let lines = self.paragraph_lines(
            Line {
                text,
                ..line.clone()
            },
            true,
        );
        let location = span(&line, lines.last().unwrap_or(&line));
        let mut texts: Vec<String> = lines
            .iter()
            .map(|line| line.text.trim_start().to_string())
            .collect();

        match kind {
            ListKind::Unordered => {
                let checkbox = texts
                    .first()
                    .and_then(|text| classify::checkbox(text))
                    .map(|(checked, rest)| (checked, rest.to_string()));
                let checked = checkbox.map(|(checked, rest)| {
                    if let Some(first) = texts.first_mut() {
                        *first = rest;
                    }
                    if checked {
                        CheckState::Checked
                    } else {
                        CheckState::Unchecked
                    }
                });
                let principal = self.principal(texts, &line, bibliography);
                Block::UnorderedListItem(UnorderedListItem {
                    marker,
                    indent,
                    level,
                    checked,
                    principal,
                    location,
                })
            }
            ListKind::Ordered => {
                let numbering = match key {
                    MarkerKey::Explicit(numbering) => numbering,
                    MarkerKey::Star(_)
                    | MarkerKey::Dash
                    | MarkerKey::Dot(_)
                    | MarkerKey::Colons(_)
                    | MarkerKey::Semicolons
                    | MarkerKey::Callout => Numbering::Implicit,
                };
                let principal = self.principal(texts, &line, bibliography);
                Block::OrderedListItem(OrderedListItem {
                    marker,
                    indent,
                    level,
                    numbering,
                    ordinal,
                    principal,
                    location,
                })
            }
            ListKind::Callout | ListKind::Description => {
                let mark = parse_list_item(&line.text).map_or(Mark::Auto, |(mark, _)| mark);
                let resolved = self.state.callouts.resolve_item(mark);
                if resolved.number != resolved.expected {
                    self.state.diagnostics.warn(
                        DiagnosticKind::OutOfSequenceCallout,
                        &line,
                        format!(
                            "callout list item index: expected {}, got {}",
                            resolved.expected, resolved.number
                        ),
                    );
                }
                if resolved.targets.is_empty() {
                    self.state.diagnostics.warn(
                        DiagnosticKind::CalloutWithoutTarget,
                        &line,
                        format!("no callout found for <{}>", resolved.number),
                    );
                }
                let principal = inlines::parse_lines(&texts, &line, &mut self.state);
                Block::CalloutListItem(CalloutListItem {
                    number: resolved.number,
                    marker,
                    principal,
                    targets: resolved.targets,
                    location,
                })
            }
        }
    }

    /// Item text, led by the `[[[id]]]` anchor in a bibliography list.
    fn principal(&mut self, mut texts: Vec<String>, origin: &Line, bibliography: bool) -> Vec<InlineNode> {
        let mut principal = Vec::new();
        if bibliography
            && let Some((id, reftext, consumed)) = texts
                .first()
                .and_then(|text| parse_bibliography_anchor(text))
                .map(|(id, reftext, consumed)| (id.to_string(), reftext.map(ToString::to_string), consumed))
        {
            let registration =
                self.state
                    .anchors
                    .register(&id, AnchorKind::Bibliography, reftext.clone(), origin.location());
            if registration == Registration::Duplicate {
                self.state.diagnostics.warn(
                    DiagnosticKind::DuplicateBibliographyAnchor,
                    origin,
                    format!("id assigned to bibliography anchor already in use: {id}"),
                );
            }
            if let Some(first) = texts.first_mut() {
                *first = first.get(consumed..).unwrap_or_default().trim_start().to_string();
            }
            principal.push(InlineNode::BibliographyAnchor(InlineAnchor { id, reftext }));
        }
        principal.extend(inlines::parse_lines(&texts, origin, &mut self.state));
        principal
    }

    fn description_item(
        &mut self,
        line: Line,
        marker: String,
        term: String,
        text: String,
        level: usize,
    ) -> Block {
        let term = inlines::parse_text(&term, &line, &mut self.state);
        if text.is_empty() {
            let body = self.description_body();
            return Block::DescriptionListItem(DescriptionListItem {
                term,
                marker,
                level,
                principal: Vec::new(),
                location: span_blocks(line.location(), &body),
                body,
            });
        }
        let lines = self.paragraph_lines(
            Line {
                text,
                ..line.clone()
            },
            true,
        );
        let location = span(&line, lines.last().unwrap_or(&line));
        let texts: Vec<String> = lines
            .iter()
            .map(|line| line.text.trim_start().to_string())
            .collect();
        let principal = inlines::parse_lines(&texts, &line, &mut self.state);
        Block::DescriptionListItem(DescriptionListItem {
            term,
            marker,
            level,
            principal,
            body: Vec::new(),
            location,
        })
    }

    /// The description of a term with nothing after its marker: the next paragraph,
    /// indented literal or list of another kind, adjacent or after blank lines.
    fn description_body(&mut self) -> Vec<Block> {
        let blanks = self.blank_run();
        let Some(text) = self.peek_text(blanks) else {
            return Vec::new();
        };
        if self.peek_is(blanks, |line| line.synthetic) {
            return Vec::new();
        }
        let marker = classify::list_marker(&text).filter(|marker| marker.kind != ListKind::Description);
        if marker.is_none() && (classify::list_marker(&text).is_some() || is_structural(&text)) {
            return Vec::new();
        }
        let mut body = self.take_blanks(blanks);
        let Some(line) = self.next_line() else {
            return body;
        };
        let in_list = std::mem::replace(&mut self.in_list, true);
        let block = match marker {
            Some(marker) => self.list(line, marker),
            None if line.text.starts_with(' ') => self.literal_paragraph(line),
            None => self.paragraph(line, true),
        };
        self.in_list = in_list;
        body.push(block);
        body
    }

    /// Decides what follows an item: blank lines, continuations and comments that
    /// stay in the list, then the next item if the list goes on.
    fn list_tail(
        &mut self,
        items: &mut Vec<Block>,
        frames: &[Frame],
        root: ListKind,
    ) -> Option<(Line, ListMarker, Placement)> {
        loop {
            let blanks = self.blank_run();
            let text = self.peek_text(blanks)?;
            if self.peek_is(blanks, |line| line.synthetic) {
                return None;
            }
            if let Some(marker) = classify::list_marker(&text) {
                let placement = placement(frames, root, &marker, blanks > 0)?;
                items.extend(self.take_blanks(blanks));
                let line = self.next_line()?;
                return Some((line, marker, placement));
            }
            let innermost = frames.len();
            if classify::is_continuation(&text) {
                items.extend(self.take_blanks(blanks));
                self.continuation(items, innermost.saturating_sub(blanks).max(1));
                continue;
            }
            if blanks == 0 {
                if classify::line_comment(&text).is_some() {
                    self.interstitial_comment(items);
                    continue;
                }
                return None;
            }
            if text.starts_with("  ") {
                items.extend(self.take_blanks(blanks));
                let block = self.swallowing_literal();
                let location = block.location().unwrap_or_default();
                items.push(Block::ListContinuation(ListContinuation {
                    depth: innermost.max(1),
                    block: Box::new(block),
                    location,
                }));
                continue;
            }
            // A comment between blank lines splits the list; one directly above the
            // next item stays inside it.
            let comment_then_item = classify::line_comment(&text).is_some()
                && self.peek_is(blanks + 1, |line| {
                    classify::list_marker(&line.text)
                        .is_some_and(|marker| placement(frames, root, &marker, true).is_some())
                });
            if comment_then_item {
                items.extend(self.take_blanks(blanks));
                self.interstitial_comment(items);
                continue;
            }
            return None;
        }
    }

    fn interstitial_comment(&mut self, items: &mut Vec<Block>) {
        if let Some(line) = self.next_line()
            && let Some(text) = classify::line_comment(&line.text)
        {
            items.push(Block::Comment(Comment {
                kind: CommentKind::Line,
                lines: vec![text.to_string()],
                location: line.location(),
            }));
        }
    }

    /// Attaches the blocks following a run of `+` lines. Each repeated `+` moves the
    /// attachment one level up and takes one more block.
    fn continuation(&mut self, items: &mut Vec<Block>, depth: usize) {
        let Some(plus) = self.next_line() else {
            return;
        };
        let mut repeats = 1;
        while self.peek_is(0, |line| classify::is_continuation(&line.text)) {
            self.next_line();
            repeats += 1;
        }
        let depth = depth.saturating_sub(repeats - 1).max(1);
        let mut attached = 0;
        while attached < repeats {
            let follows = self.peek_is(0, |line| {
                !line.is_blank()
                    && (attached == 0
                        || (classify::list_marker(&line.text).is_none()
                            && !classify::is_continuation(&line.text)))
            });
            if !follows {
                if attached == 0 {
                    self.state.diagnostics.warn(
                        DiagnosticKind::DanglingContinuation,
                        &plus,
                        "dropping list continuation with no block to attach to",
                    );
                }
                break;
            }
            let Some(block) = self.continuation_block(items) else {
                break;
            };
            let location = span_blocks(plus.location(), std::slice::from_ref(&block));
            items.push(Block::ListContinuation(ListContinuation {
                depth,
                block: Box::new(block),
                location,
            }));
            attached += 1;
        }
    }

    /// One block for a continuation. Directives met on the way stay in the list.
    fn continuation_block(&mut self, items: &mut Vec<Block>) -> Option<Block> {
        let in_list = std::mem::replace(&mut self.in_list, true);
        let block = loop {
            match self.next_block(Scope::Nested) {
                Some(Step::Block(directive @ (Block::Conditional(_) | Block::Include(_)))) => {
                    items.push(directive);
                }
                Some(Step::Block(Block::Blank(blank))) => {
                    self.discard_dangling_metadata();
                    items.push(Block::Blank(blank));
                    break None;
                }
                Some(Step::Block(block)) => break Some(block),
                Some(Step::Heading(heading)) => {
                    self.unread(heading.line);
                    break None;
                }
                None => {
                    self.discard_dangling_metadata();
                    break None;
                }
            }
        };
        self.in_list = in_list;
        block
    }

    /// An indented run after a blank line inside a list, attached as a literal block.
    ///
    /// Intentional Asciidoctor compatibility quirk, kept as is: the run only ends at
    /// a blank line followed by an unindented line. Without that trailing blank line
    /// it swallows the list items and paragraphs that come after it.
    fn swallowing_literal(&mut self) -> Block {
        let mut lines = Vec::new();
        loop {
            if self.peek_is(0, |line| line.synthetic) {
                break;
            }
            if self.peek_is(0, Line::is_blank) && !self.peek_is(1, |line| line.text.starts_with(' ')) {
                break;
            }
            let Some(line) = self.next_line() else {
                break;
            };
            lines.push(line);
        }
        self.literal_from(BlockMetadata::default(), &lines)
    }

    fn blank_run(&mut self) -> usize {
        let mut count = 0;
        while self.peek_is(count, Line::is_blank) {
            count += 1;
        }
        count
    }

    fn take_blanks(&mut self, count: usize) -> Vec<Block> {
        (0..count)
            .filter_map(|_| self.next_line())
            .map(|line| Block::Blank(Blank { line: line.number }))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::wildcard_enum_match_arm)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::super::test_support::{content, parse_body};
    use crate::{
        diagnostic::DiagnosticKind,
        model::{Block, BlockContent, CheckState, DelimitedKind, List, ListKind, Numbering, inlines_to_string},
    };

    fn lists(blocks: &[Block]) -> Vec<&List> {
        blocks
            .iter()
            .filter_map(|block| match block {
                Block::List(list) => Some(list),
                _ => None,
            })
            .collect()
    }

    fn levels(list: &List) -> Vec<usize> {
        list.list_items()
            .filter_map(|item| match item {
                Block::UnorderedListItem(item) => Some(item.level),
                Block::OrderedListItem(item) => Some(item.level),
                Block::DescriptionListItem(item) => Some(item.level),
                _ => None,
            })
            .collect()
    }

    fn diagnostics(state: &crate::state::ParserState) -> Vec<DiagnosticKind> {
        state.diagnostics.entries().iter().map(|d| d.kind).collect()
    }

    #[test]
    fn blank_separated_items_merge() {
        let (blocks, _) = parse_body("- Foo\n\n- Boo\n\n\n- Blech\n");
        let lists = lists(&blocks);
        assert_eq!(lists.len(), 1);
        let list = lists.first().copied().unwrap_or_else(|| panic!("no list"));
        assert_eq!(list.list_items().count(), 3);
        assert_eq!(list.items.iter().filter(|item| item.is_blank()).count(), 3);
    }

    #[rstest::rstest]
    #[case("* one\n\n// note\n\n* two")]
    #[case("* one\n\n'''\n\n* two")]
    #[case("* one\n\n.Second\n\n* two")]
    #[case("* one\n\n:attr: value\n\n* two")]
    fn sandwiched_lines_split_lists(#[case] input: &str) {
        let (blocks, _) = parse_body(input);
        assert_eq!(lists(&blocks).len(), 2);
    }

    #[test]
    fn comment_right_above_an_item_keeps_the_list() {
        let (blocks, _) = parse_body("* one\n\n// note\n* two");
        let lists = lists(&blocks);
        assert_eq!(lists.len(), 1);
        assert!(lists.first().is_some_and(|list| list.items.iter().any(|b| matches!(b, Block::Comment(_)))));
    }

    #[test]
    fn title_between_lists_belongs_to_the_second() {
        let (blocks, _) = parse_body("* one\n\n.Second\n\n* two");
        let lists = lists(&blocks);
        assert_eq!(
            lists.get(1).and_then(|list| list.metadata.title.as_ref()).map(|t| t.plain_text()),
            Some("Second".to_string())
        );
    }

    #[test]
    fn marker_depth_nests() {
        let (blocks, _) = parse_body("* a\n** b\n*** c\n** d\n* e");
        let lists = lists(&blocks);
        assert_eq!(lists.len(), 1);
        assert_eq!(lists.first().map(|list| levels(list)), Some(vec![1, 2, 3, 2, 1]));
    }

    #[test]
    fn dashes_nest_by_indent_after_a_blank_line() {
        let (blocks, _) = parse_body("- a\n\n  - b\n- c\n  - d");
        let lists = lists(&blocks);
        assert_eq!(lists.first().map(|list| levels(list)), Some(vec![1, 2, 1, 1]));
    }

    #[test]
    fn different_kind_at_same_indent_starts_a_new_list() {
        let (blocks, _) = parse_body("* a\n. b");
        let kinds: Vec<ListKind> = lists(&blocks).iter().map(|list| list.kind).collect();
        assert_eq!(kinds, vec![ListKind::Unordered, ListKind::Ordered]);
    }

    #[test]
    fn folded_text_and_heading_boundary() {
        let (blocks, _) = parse_body("* first line\n  second line\n== Section");
        let content = content(&blocks);
        let Some(Block::List(list)) = content.first() else {
            panic!("expected a list, got {blocks:?}");
        };
        let Some(Block::UnorderedListItem(item)) = list.items.first() else {
            panic!("expected an item");
        };
        assert_eq!(inlines_to_string(&item.principal), "first line second line");
        assert!(matches!(content.get(1), Some(Block::Section(_))));
    }

    #[test]
    fn checklist_items() {
        let (blocks, _) = parse_body("* [x] done\n* [ ] todo\n* plain");
        let list = lists(&blocks).first().copied().unwrap_or_else(|| panic!("no list"));
        let states: Vec<Option<CheckState>> = list
            .list_items()
            .filter_map(|item| match item {
                Block::UnorderedListItem(item) => Some(item.checked),
                _ => None,
            })
            .collect();
        assert_eq!(states, vec![Some(CheckState::Checked), Some(CheckState::Unchecked), None]);
        assert!(list.is_checklist());
    }

    #[test]
    fn roman_numerals_out_of_sequence_warn() {
        let (blocks, state) = parse_body("I) one\nIII) three");
        let list = lists(&blocks).first().copied().unwrap_or_else(|| panic!("no list"));
        let ordinals: Vec<(Numbering, Option<u32>)> = list
            .list_items()
            .filter_map(|item| match item {
                Block::OrderedListItem(item) => Some((item.numbering, item.ordinal)),
                _ => None,
            })
            .collect();
        assert_eq!(
            ordinals,
            vec![(Numbering::UpperRoman, Some(1)), (Numbering::UpperRoman, Some(3))]
        );
        assert_eq!(diagnostics(&state), vec![DiagnosticKind::OutOfSequenceListItem]);
    }

    #[test]
    fn ordered_list_start() {
        let (blocks, state) = parse_body("4. four\n5. five");
        assert_eq!(lists(&blocks).first().and_then(|list| list.start), Some(4));
        assert!(diagnostics(&state).is_empty());
    }

    #[test]
    fn continuation_attaches_blocks() {
        let (blocks, _) = parse_body("* item\n+\n----\ncode\n----\n* next");
        let list = lists(&blocks).first().copied().unwrap_or_else(|| panic!("no list"));
        let Some(Block::ListContinuation(continuation)) = list.items.get(1) else {
            panic!("expected a continuation, got {:?}", list.items);
        };
        assert_eq!(continuation.depth, 1);
        assert!(matches!(*continuation.block, Block::Delimited(ref b) if b.kind == DelimitedKind::Listing));
        assert_eq!(list.list_items().count(), 2);
    }

    #[test]
    fn continuation_after_blank_line_targets_the_parent() {
        let (blocks, _) = parse_body("* a\n** b\n\n+\nFor a.");
        let list = lists(&blocks).first().copied().unwrap_or_else(|| panic!("no list"));
        let depths: Vec<usize> = list
            .items
            .iter()
            .filter_map(|item| match item {
                Block::ListContinuation(continuation) => Some(continuation.depth),
                _ => None,
            })
            .collect();
        assert_eq!(depths, vec![1]);
    }

    #[test]
    #[tracing_test::traced_test]
    fn dangling_continuation_is_dropped() {
        let (blocks, state) = parse_body("* item\n+\n\nafter");
        assert_eq!(diagnostics(&state), vec![DiagnosticKind::DanglingContinuation]);
        assert!(logs_contain("dropping list continuation"));
        assert!(matches!(content(&blocks).last(), Some(Block::Paragraph(_))));
    }

    #[test]
    fn dangling_metadata_after_continuation_is_dropped() {
        let (_, state) = parse_body("* item\n+\n[source]\n\nafter");
        assert_eq!(diagnostics(&state), vec![DiagnosticKind::DanglingBlockMetadata]);
    }

    #[test]
    fn description_term_with_text_does_not_absorb() {
        let (blocks, _) = parse_body("CPU:: The brain\n\nNot a description.");
        let content = content(&blocks);
        let Some(Block::List(list)) = content.first() else {
            panic!("expected a list, got {blocks:?}");
        };
        let Some(Block::DescriptionListItem(item)) = list.items.first() else {
            panic!("expected a description item");
        };
        assert_eq!(inlines_to_string(&item.principal), "The brain");
        assert!(item.body.is_empty());
        assert!(matches!(content.get(1), Some(Block::Paragraph(_))));
    }

    #[test]
    fn description_term_without_text_absorbs_one_block() {
        let (blocks, _) = parse_body("CPU::\n\nThe brain.\n\nAfter.");
        let content = content(&blocks);
        let Some(Block::List(list)) = content.first() else {
            panic!("expected a list, got {blocks:?}");
        };
        let Some(Block::DescriptionListItem(item)) = list.items.first() else {
            panic!("expected a description item");
        };
        assert!(item.principal.is_empty());
        assert_eq!(item.body.iter().filter(|b| !b.is_blank()).count(), 1);
        assert!(matches!(content.get(1), Some(Block::Paragraph(_))));
    }

    #[test]
    fn nested_description_on_next_line() {
        let (blocks, _) = parse_body("Fruit:: sweet\nApple::: red");
        let lists = lists(&blocks);
        assert_eq!(lists.first().map(|list| levels(list)), Some(vec![1, 2]));
    }

    #[test]
    fn description_body_can_be_a_list() {
        let (blocks, _) = parse_body("Colors::\n* red\n* blue\nShapes:: round");
        let list = lists(&blocks).first().copied().unwrap_or_else(|| panic!("no list"));
        assert_eq!(list.list_items().count(), 2);
        let Some(Block::DescriptionListItem(item)) = list.items.first() else {
            panic!("expected a description item");
        };
        assert!(matches!(item.body.first(), Some(Block::List(inner)) if inner.list_items().count() == 2));
    }

    #[test]
    fn indented_literal_swallows_without_trailing_blank() {
        let (blocks, _) = parse_body("* item\n\n  literal\n* swallowed\n\nafter");
        let content = content(&blocks);
        let Some(Block::List(list)) = content.first() else {
            panic!("expected a list, got {blocks:?}");
        };
        assert_eq!(list.list_items().count(), 1);
        let Some(Block::ListContinuation(continuation)) = list.items.iter().find(|b| !b.is_blank() && !b.is_list_item()) else {
            panic!("expected an attached literal");
        };
        let Block::Delimited(literal) = continuation.block.as_ref() else {
            panic!("expected a literal block");
        };
        assert_eq!(
            literal.content,
            BlockContent::Raw(vec!["  literal".to_string(), "* swallowed".to_string()])
        );
        assert!(matches!(content.get(1), Some(Block::Paragraph(_))));
    }

    #[test]
    fn bibliography_items_register_anchors() {
        let (_, state) = parse_body("[bibliography]\n- [[[pp]]] Pragmatic\n- [[[pp]]] Again");
        assert!(state.anchors.contains("pp"));
        assert_eq!(diagnostics(&state), vec![DiagnosticKind::DuplicateBibliographyAnchor]);
    }

    #[test]
    fn callout_list_correlates_with_listing() {
        let input = "[source,ruby]\n----\nrequire 'x' # <1>\nputs 1 # <2>\nexit # <3>\n----\n<1> Load\n<2> Print\n<3> Leave";
        let (blocks, state) = parse_body(input);
        let list = lists(&blocks).first().copied().unwrap_or_else(|| panic!("no list"));
        assert_eq!(list.kind, ListKind::Callout);
        let lines: Vec<usize> = list
            .list_items()
            .filter_map(|item| match item {
                Block::CalloutListItem(item) => item.targets.first().map(|target| target.line),
                _ => None,
            })
            .collect();
        assert_eq!(lines, vec![1, 2, 3]);
        assert!(diagnostics(&state).is_empty());
    }

    #[test]
    fn callout_out_of_sequence_and_missing() {
        let input = "----\na <1>\n----\n<2> Two\n<1> One";
        let (_, state) = parse_body(input);
        assert_eq!(
            diagnostics(&state),
            vec![
                DiagnosticKind::OutOfSequenceCallout,
                DiagnosticKind::CalloutWithoutTarget,
                DiagnosticKind::OutOfSequenceCallout,
            ]
        );
    }
}
