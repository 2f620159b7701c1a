//! Paragraphs, admonition paragraphs, indented literal paragraphs and paragraphs
//! whose style turns them into a fenceless delimited block.
use super::{Parser, classify};
use crate::{
    grammar::{anchors::parse_block_anchor, attributes::is_attribute_list_line},
    inlines,
    model::{
        AdmonitionVariant, Block, BlockContent, BlockMetadata, DelimitedBlock, DelimitedKind,
        Paragraph,
    },
    normalizer::Line,
    preprocessor::span,
};

impl Parser<'_> {
    /// Reads paragraph lines up to a blank line or a line that starts a block of its
    /// own. In a list, item markers, continuations, breaks and headings end the
    /// paragraph too.
    pub(super) fn paragraph_lines(&mut self, first: Line, in_list: bool) -> Vec<Line> {
        let mut lines = vec![first];
        loop {
            let ends = self.peek_is(0, |line| {
                line.is_blank()
                    || line.synthetic
                    || classify::fence(&line.text).is_some()
                    || is_attribute_list_line(&line.text)
                    || parse_block_anchor(&line.text).is_some()
                    || (in_list && ends_list_text(&line.text))
            });
            if ends || (in_list && self.at_setext_heading()) {
                break;
            }
            let Some(line) = self.next_line() else {
                break;
            };
            if classify::line_comment(&line.text).is_none() {
                lines.push(line);
            }
        }
        lines
    }

    fn at_setext_heading(&mut self) -> bool {
        match (self.peek_text(0), self.peek_text(1)) {
            (Some(title), Some(underline)) => classify::setext_level(&title, &underline).is_some(),
            (Some(_) | None, None) | (None, Some(_)) => false,
        }
    }

    pub(super) fn paragraph(&mut self, first: Line, in_list: bool) -> Block {
        let metadata = self.take_metadata();
        let lines = self.paragraph_lines(first, in_list);
        self.paragraph_from(metadata, lines)
    }

    /// Builds the node for paragraph lines under the given metadata.
    pub(super) fn paragraph_from(&mut self, metadata: BlockMetadata, lines: Vec<Line>) -> Block {
        let (Some(first), Some(last)) = (lines.first(), lines.last()) else {
            return Block::Paragraph(Paragraph {
                metadata,
                admonition: None,
                content: Vec::new(),
                location: crate::model::Location::default(),
            });
        };
        let location = span(first, last);
        let first = first.clone();
        self.register_block_anchor(&metadata, &first);
        let texts: Vec<String> = lines.iter().map(|line| line.text.clone()).collect();

        let style = metadata.style.as_deref().unwrap_or_default();
        let verbatim = match style {
            "source" | "listing" => Some(DelimitedKind::Listing),
            "literal" => Some(DelimitedKind::Literal),
            "pass" => Some(DelimitedKind::Pass),
            "verse" => Some(DelimitedKind::Quote),
            _ => None,
        };
        if let Some(kind) = verbatim {
            let listing = self.record_callouts(kind, &metadata, location, &texts);
            return Block::Delimited(DelimitedBlock {
                kind,
                delimiter: None,
                metadata,
                content: BlockContent::Raw(texts),
                listing,
                location,
            });
        }
        let wrapper = match style {
            "quote" => Some(DelimitedKind::Quote),
            "example" => Some(DelimitedKind::Example),
            "sidebar" => Some(DelimitedKind::Sidebar),
            _ => None,
        };
        if let Some(kind) = wrapper {
            let content = inlines::parse_lines(&texts, &first, &mut self.state);
            let inner = Block::Paragraph(Paragraph {
                metadata: BlockMetadata::default(),
                admonition: None,
                content,
                location,
            });
            return Block::Delimited(DelimitedBlock {
                kind,
                delimiter: None,
                metadata,
                content: BlockContent::Blocks(vec![inner]),
                listing: None,
                location,
            });
        }

        let mut admonition = style.parse::<AdmonitionVariant>().ok();
        let mut texts = texts;
        if admonition.is_none()
            && let Some((variant, rest)) = texts.first().and_then(|text| admonition_prefix(text))
        {
            admonition = Some(variant);
            let rest = rest.to_string();
            if let Some(text) = texts.first_mut() {
                *text = rest;
            }
        }
        let content = inlines::parse_lines(&texts, &first, &mut self.state);
        Block::Paragraph(Paragraph {
            metadata,
            admonition,
            content,
            location,
        })
    }

    /// An indented paragraph: literal text up to the next blank line, with the
    /// common indent removed.
    pub(super) fn literal_paragraph(&mut self, first: Line) -> Block {
        let metadata = self.take_metadata();
        let mut lines = vec![first];
        while self.peek_is(0, |line| !line.is_blank() && !line.synthetic) {
            let Some(line) = self.next_line() else {
                break;
            };
            lines.push(line);
        }
        self.literal_from(metadata, &lines)
    }

    pub(super) fn literal_from(&mut self, metadata: BlockMetadata, lines: &[Line]) -> Block {
        let (Some(first), Some(last)) = (lines.first(), lines.last()) else {
            return self.paragraph_from(metadata, Vec::new());
        };
        let location = span(first, last);
        let first = first.clone();
        self.register_block_anchor(&metadata, &first);
        let texts = strip_common_indent(lines);
        let listing = self.record_callouts(DelimitedKind::Literal, &metadata, location, &texts);
        Block::Delimited(DelimitedBlock {
            kind: DelimitedKind::Literal,
            delimiter: None,
            metadata,
            content: BlockContent::Raw(texts),
            listing,
            location,
        })
    }
}

/// Lines that end the text of a list item.
fn ends_list_text(text: &str) -> bool {
    classify::list_marker(text).is_some()
        || classify::is_continuation(text)
        || classify::heading(text).is_some()
        || classify::is_thematic_break(text)
}

/// `NOTE: text` and friends.
fn admonition_prefix(text: &str) -> Option<(AdmonitionVariant, &str)> {
    let (label, rest) = text.split_once(": ")?;
    let variant = label.parse::<AdmonitionVariant>().ok()?;
    Some((variant, rest.trim_start()))
}

/// Removes the indent shared by every non-blank line.
pub(super) fn strip_common_indent(lines: &[Line]) -> Vec<String> {
    let indent = lines
        .iter()
        .filter(|line| !line.is_blank())
        .map(Line::indent)
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|line| line.text.get(indent..).unwrap_or_default().to_string())
        .collect()
}
