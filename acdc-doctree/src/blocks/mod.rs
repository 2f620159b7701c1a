//! The block engine: classifies the line at the cursor and builds block nodes.
//!
//! [`Parser::next_block`] consumes exactly one block, or hands a section heading back
//! as [`Step::Heading`] so the section loop can decide which section the heading
//! closes and which one it opens. Delimited block content and `a` table cells are
//! parsed by the same loop over a reader holding only their lines.
use std::collections::VecDeque;

use crate::{
    anchor::{AnchorKind, Registration},
    attributes::AttributeMissing,
    diagnostic::DiagnosticKind,
    grammar::{
        anchors::parse_block_anchor,
        attributes::{is_attribute_list_line, parse_attribute_list, parse_entry},
    },
    inlines,
    model::{
        Blank, Block, BlockMacro, BlockMetadata, Break, Comment, CommentKind, Image, Location,
    },
    normalizer::Line,
    preprocessor::Reader,
    state::ParserState,
};

mod classify;
mod delimited;
mod entry;
mod header;
mod list;
mod paragraph;
mod section;
mod table;

pub(crate) use section::Heading;

/// Block macro names that belong to the preprocessor. When one of these reaches
/// the engine it was escaped and is plain text.
const PREPROCESSOR_MACROS: [&str; 5] = ["include", "ifdef", "ifndef", "ifeval", "endif"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Scope {
    /// The document body and section bodies. Headings open sections.
    Document,
    /// The content of a delimited block. Headings are only recognized when styled
    /// `discrete`.
    Nested,
}

/// What [`Parser::next_block`] just closed.
#[derive(Debug)]
pub(crate) enum Step {
    Block(Block),
    Heading(Heading),
}

/// Metadata lines seen since the last block, with the first of them.
#[derive(Debug)]
struct Pending {
    metadata: BlockMetadata,
    line: Line,
}

#[derive(Debug)]
pub(crate) struct Parser<'r> {
    reader: Reader<'r>,
    pub(crate) state: ParserState,
    /// Directive nodes ready to be emitted before the next block.
    queued: VecDeque<Block>,
    pending: Option<Pending>,
    /// 0 while parsing the document itself, deeper inside delimited blocks and cells.
    nesting: usize,
    /// Set while inside a section styled `bibliography`.
    bibliography: bool,
    /// Set while reading a block attached to a list item.
    in_list: bool,
    seen_section: bool,
}

impl<'r> Parser<'r> {
    pub(crate) fn new(reader: Reader<'r>, state: ParserState) -> Self {
        Self {
            reader,
            state,
            queued: VecDeque::new(),
            pending: None,
            nesting: 0,
            bibliography: false,
            in_list: false,
            seen_section: false,
        }
    }

    pub(crate) fn into_state(self) -> ParserState {
        self.state
    }

    fn peek_text(&mut self, offset: usize) -> Option<String> {
        self.reader
            .peek(offset, &mut self.state)
            .map(|line| line.text.clone())
    }

    fn peek_is(&mut self, offset: usize, test: impl FnOnce(&Line) -> bool) -> bool {
        self.reader.peek(offset, &mut self.state).is_some_and(test)
    }

    fn next_line(&mut self) -> Option<Line> {
        self.reader.next_line(&mut self.state)
    }

    fn unread(&mut self, line: Line) {
        self.reader.unread(line);
    }

    /// Directive nodes recorded before the line at the cursor.
    fn take_directive(&mut self) -> Option<Block> {
        let _ = self.reader.peek(0, &mut self.state);
        self.queued.extend(self.reader.take_directives());
        self.queued.pop_front()
    }

    /// Parses blocks and sections until the reader is exhausted.
    #[tracing::instrument(level = "trace", skip(self))]
    pub(crate) fn parse_body(&mut self, scope: Scope) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut heading = self.collect_until_heading(&mut blocks, scope);
        while let Some(next) = heading {
            let (section, after) = self.parse_section(next, None);
            blocks.push(section);
            heading = after;
        }
        blocks
    }

    /// Appends blocks to `blocks` until a section heading or the end of input.
    fn collect_until_heading(&mut self, blocks: &mut Vec<Block>, scope: Scope) -> Option<Heading> {
        loop {
            match self.next_block(scope) {
                Some(Step::Block(block)) => blocks.push(block),
                Some(Step::Heading(heading)) => return Some(heading),
                None => {
                    self.discard_dangling_metadata();
                    return None;
                }
            }
        }
    }

    /// Consumes the next block. `None` once the input is exhausted.
    pub(crate) fn next_block(&mut self, scope: Scope) -> Option<Step> {
        loop {
            if let Some(directive) = self.take_directive() {
                return Some(Step::Block(directive));
            }
            let Some(line) = self.next_line() else {
                let remaining = self.reader.drain_directives();
                if remaining.is_empty() {
                    return None;
                }
                self.queued.extend(remaining);
                continue;
            };
            if line.synthetic {
                self.apply_synthetic(&line);
                continue;
            }
            if line.is_blank() {
                return Some(Step::Block(Block::Blank(Blank { line: line.number })));
            }
            if let Some(step) = self.classify(line, scope) {
                return Some(step);
            }
        }
    }

    /// Dispatches a content line. Returns `None` for metadata lines, which only
    /// accumulate until the block they belong to.
    fn classify(&mut self, line: Line, scope: Scope) -> Option<Step> {
        tracing::trace!(line = line.number, text = %line.text, "classifying");
        if let Some(fence) = classify::fence(&line.text) {
            return Some(Step::Block(self.delimited(line, fence)));
        }
        if let Some(text) = classify::line_comment(&line.text) {
            return Some(Step::Block(Block::Comment(Comment {
                kind: CommentKind::Line,
                lines: vec![text.to_string()],
                location: line.location(),
            })));
        }
        if parse_entry(&line.text).is_some() {
            return Some(Step::Block(self.attribute_entry(line)));
        }
        if self.metadata_line(&line) {
            return None;
        }
        if let Some((level, title, setext)) = self.heading_shape(&line, scope) {
            return Some(self.heading(line, level, title, setext));
        }
        if classify::is_thematic_break(&line.text) {
            self.take_metadata();
            return Some(Step::Block(Block::ThematicBreak(Break {
                location: line.location(),
            })));
        }
        if classify::is_page_break(&line.text) {
            self.take_metadata();
            return Some(Step::Block(Block::PageBreak(Break {
                location: line.location(),
            })));
        }
        if let Some((name, target, attributes)) = classify::block_macro(&line.text)
            && !PREPROCESSOR_MACROS.contains(&name)
        {
            return Some(Step::Block(self.block_macro(&line, name, target, attributes)));
        }
        if let Some(marker) = classify::list_marker(&line.text) {
            return Some(Step::Block(self.list(line, marker)));
        }
        if line.text.starts_with(' ') {
            return Some(Step::Block(self.literal_paragraph(line)));
        }
        Some(Step::Block(self.paragraph(line, self.in_list)))
    }

    /// Folds a block anchor, attribute list or block title line into the pending
    /// metadata.
    fn metadata_line(&mut self, line: &Line) -> bool {
        if let Some((id, reftext)) = parse_block_anchor(&line.text) {
            let id = id.to_string();
            let reftext = reftext.map(ToString::to_string);
            self.pending_metadata(line).id = Some(id);
            if reftext.is_some() {
                self.pending_metadata(line).reftext = reftext;
            }
            return true;
        }
        if is_attribute_list_line(&line.text) {
            let inner = line
                .text
                .strip_prefix('[')
                .and_then(|text| text.strip_suffix(']'))
                .unwrap_or_default()
                .to_string();
            if let Some(inner) = self.substitute(&inner, line) {
                let list = parse_attribute_list(&inner);
                self.pending_metadata(line).merge(list);
            }
            return true;
        }
        if let Some(title) = classify::block_title(&line.text) {
            let title = inlines::parse_title(title, line, &mut self.state);
            self.pending_metadata(line).title = Some(title);
            return true;
        }
        false
    }

    fn pending_metadata(&mut self, line: &Line) -> &mut BlockMetadata {
        &mut self
            .pending
            .get_or_insert_with(|| Pending {
                metadata: BlockMetadata::default(),
                line: line.clone(),
            })
            .metadata
    }

    fn pending_style_is(&self, styles: &[&str]) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| styles.iter().any(|style| pending.metadata.style_is(style)))
    }

    fn take_metadata(&mut self) -> BlockMetadata {
        self.pending
            .take()
            .map(|pending| pending.metadata)
            .unwrap_or_default()
    }

    /// Drops metadata lines that ended up with no block after them.
    fn discard_dangling_metadata(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.state.diagnostics.warn(
                DiagnosticKind::DanglingBlockMetadata,
                &pending.line,
                format!("dropping block metadata with no block to attach to: {}", pending.line.text),
            );
        }
    }

    /// Registers the explicit id of a block.
    fn register_block_anchor(&mut self, metadata: &BlockMetadata, line: &Line) {
        let Some(id) = &metadata.id else {
            return;
        };
        let reftext = metadata
            .reftext
            .clone()
            .or_else(|| metadata.title.as_ref().map(|title| title.plain_text()));
        if self
            .state
            .anchors
            .register(id, AnchorKind::Block, reftext, line.location())
            == Registration::Duplicate
        {
            self.state.diagnostics.warn(
                DiagnosticKind::DuplicateAnchor,
                line,
                format!("id assigned to block already in use: {id}"),
            );
        }
    }

    /// Parses already-read lines as a nested block sequence with the same state.
    fn parse_nested(&mut self, lines: Vec<Line>, scope: Scope) -> Vec<Block> {
        let reader = std::mem::replace(&mut self.reader, Reader::preprocessed(lines));
        let queued = std::mem::take(&mut self.queued);
        let pending = self.pending.take();
        let in_list = std::mem::replace(&mut self.in_list, false);
        self.nesting += 1;
        let blocks = self.parse_body(scope);
        self.nesting -= 1;
        self.reader = reader;
        self.queued = queued;
        self.pending = pending;
        self.in_list = in_list;
        blocks
    }

    /// Substitutes attribute references in block-level text such as attribute values
    /// and macro targets, reporting missing ones per `attribute-missing`. `None` when
    /// the line is to be dropped.
    pub(crate) fn substitute(&mut self, text: &str, line: &Line) -> Option<String> {
        let substituted = self.state.attributes.substitute(text);
        let policy = self.state.attributes.attribute_missing();
        for name in &substituted.missing {
            match policy {
                AttributeMissing::Warn => self.state.diagnostics.warn(
                    DiagnosticKind::UnresolvedAttribute,
                    line,
                    format!("skipping reference to missing attribute: {name}"),
                ),
                AttributeMissing::DropLine => self.state.diagnostics.info(
                    DiagnosticKind::UnresolvedAttribute,
                    line,
                    format!("dropping line containing reference to missing attribute: {name}"),
                ),
                AttributeMissing::Skip | AttributeMissing::Drop => {
                    tracing::debug!(name, line = line.number, "missing attribute reference");
                }
            }
        }
        substituted.text
    }

    fn block_macro(&mut self, line: &Line, name: &str, target: &str, attributes: &str) -> Block {
        let metadata = self.take_metadata();
        let target = self.substitute(target, line).unwrap_or_default();
        let attributes = self
            .substitute(attributes, line)
            .map(|attributes| parse_attribute_list(&attributes))
            .unwrap_or_default();
        self.register_block_anchor(&metadata, line);
        let location = line.location();
        if name == "image" {
            return Block::Image(Image {
                target,
                metadata,
                attributes,
                location,
            });
        }
        Block::BlockMacro(BlockMacro {
            name: name.to_string(),
            target,
            metadata,
            attributes,
            location,
        })
    }
}

/// The span from `first` to the end of the last located block, or `first` alone.
pub(crate) fn span_blocks(first: Location, blocks: &[Block]) -> Location {
    blocks
        .iter()
        .rev()
        .filter(|block| !block.is_blank())
        .find_map(Block::location)
        .map_or(first, |last| first.to(last))
}

#[cfg(test)]
pub(crate) mod test_support {
    use acdc_core::Backend;

    use super::{Parser, Scope};
    use crate::{Options, model::Block, normalizer, preprocessor::Reader, state::ParserState};

    /// Parses `input` as a body (no header) and returns blocks plus the final state.
    pub(crate) fn parse_body(input: &str) -> (Vec<Block>, ParserState) {
        parse_body_with(input, &Options::default())
    }

    pub(crate) fn parse_body_with(input: &str, options: &Options) -> (Vec<Block>, ParserState) {
        let state = ParserState::new(options, Backend::default());
        let reader = Reader::new(normalizer::normalize(input, None), None);
        let mut parser = Parser::new(reader, state);
        let blocks = parser.parse_body(Scope::Document);
        (blocks, parser.into_state())
    }

    /// Blocks without blank line sentinels.
    pub(crate) fn content(blocks: &[Block]) -> Vec<&Block> {
        blocks.iter().filter(|block| !block.is_blank()).collect()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::test_support::{content, parse_body};
    use crate::{diagnostic::DiagnosticKind, model::Block};

    #[test]
    fn blank_lines_become_sentinels() {
        let (blocks, _) = parse_body("first\n\n\nsecond");
        let kinds: Vec<bool> = blocks.iter().map(Block::is_blank).collect();
        assert_eq!(kinds, vec![false, true, true, false]);
    }

    #[test]
    fn metadata_attaches_across_blank_lines() {
        let (blocks, state) = parse_body("[[intro,Intro]]\n.Welcome\n[.lead]\n\nHello.");
        let Some(Block::Paragraph(paragraph)) = content(&blocks).first().copied() else {
            panic!("expected a paragraph, got {blocks:?}");
        };
        assert_eq!(paragraph.metadata.id.as_deref(), Some("intro"));
        assert_eq!(paragraph.metadata.roles, vec!["lead"]);
        assert_eq!(
            paragraph.metadata.title.as_ref().map(|t| t.plain_text()),
            Some("Welcome".to_string())
        );
        assert_eq!(
            state.anchors.get("intro").and_then(|a| a.reftext.as_deref()),
            Some("Intro")
        );
    }

    #[test]
    #[tracing_test::traced_test]
    fn dangling_metadata_is_dropped() {
        let (blocks, state) = parse_body("para\n\n[source]\n.Title");
        assert_eq!(content(&blocks).len(), 1);
        let kinds: Vec<DiagnosticKind> = state.diagnostics.entries().iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::DanglingBlockMetadata]);
        assert!(logs_contain("dropping block metadata"));
    }

    #[test]
    fn breaks_comments_and_macros() {
        let (blocks, _) = parse_body("'''\n\n<<<\n\n// note\n\nimage::a.png[Alt,200]\n\ntoc::[]\n\n\\include::x.adoc[]");
        let blocks = content(&blocks);
        assert!(matches!(blocks.first(), Some(Block::ThematicBreak(_))));
        assert!(matches!(blocks.get(1), Some(Block::PageBreak(_))));
        assert!(matches!(blocks.get(2), Some(Block::Comment(c)) if c.lines == vec!["note"]));
        let Some(Block::Image(image)) = blocks.get(3) else {
            panic!("expected an image, got {blocks:?}");
        };
        assert_eq!(image.target, "a.png");
        assert_eq!(image.attributes.positional(1), Some("200"));
        assert!(matches!(blocks.get(4), Some(Block::BlockMacro(m)) if m.name == "toc"));
        assert!(matches!(blocks.get(5), Some(Block::Paragraph(_))));
    }

    #[test]
    fn duplicate_block_ids_are_reported() {
        let (_, state) = parse_body("[#a]\none\n\n[[a]]\ntwo");
        let kinds: Vec<DiagnosticKind> = state.diagnostics.entries().iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::DuplicateAnchor]);
        assert_eq!(state.anchors.len(), 1);
    }

    #[test]
    fn directives_are_emitted_in_place() {
        let (blocks, _) = parse_body("ifdef::nope[]\nhidden\nendif::[]\n\nshown");
        let blocks = content(&blocks);
        assert!(matches!(blocks.first(), Some(Block::Conditional(c)) if !c.satisfied));
        assert!(matches!(blocks.last(), Some(Block::Paragraph(_))));
    }
}
