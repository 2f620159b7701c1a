//! Fenced blocks: listing, literal, example, sidebar, quote, open, passthrough,
//! comment blocks and markdown code fences.
use super::{
    Parser, Scope,
    classify::{Fence, FenceKind},
};
use crate::{
    callouts::CommentPrefix,
    diagnostic::DiagnosticKind,
    model::{
        AttributeList, AttributeListEntry, Block, BlockContent, BlockMetadata, Comment, CommentKind,
        DelimitedBlock, DelimitedKind, Delimiter, Location,
    },
    normalizer::Line,
    preprocessor::span,
};

/// What an open block turns into under its style.
fn masquerade(kind: DelimitedKind, metadata: &BlockMetadata) -> Option<DelimitedKind> {
    if kind != DelimitedKind::Open {
        return Some(kind);
    }
    let masked = match metadata.style.as_deref() {
        Some("source" | "listing") => DelimitedKind::Listing,
        Some("literal") => DelimitedKind::Literal,
        Some("pass") => DelimitedKind::Pass,
        Some("quote" | "verse") => DelimitedKind::Quote,
        Some("example") => DelimitedKind::Example,
        Some("sidebar") => DelimitedKind::Sidebar,
        Some("comment") => return None,
        Some(_) | None => DelimitedKind::Open,
    };
    Some(masked)
}

impl Parser<'_> {
    /// Reads lines up to the closing fence. An unterminated block is closed at the
    /// end of input with a warning. Returns the content and the closing line.
    pub(super) fn read_fenced(&mut self, open: &Line, fence: &Fence, name: &str) -> (Vec<Line>, Option<Line>) {
        let mut lines = Vec::new();
        while let Some(line) = self.next_line() {
            if fence.closes(&line.text) {
                return (lines, Some(line));
            }
            lines.push(line);
        }
        self.state.diagnostics.warn(
            DiagnosticKind::UnterminatedDelimitedBlock,
            open,
            format!("unterminated {name} block"),
        );
        (lines, None)
    }

    #[tracing::instrument(level = "trace", skip_all, fields(line = open.number, fence = %fence.text))]
    pub(super) fn delimited(&mut self, open: Line, fence: Fence) -> Block {
        let kind = match &fence.kind {
            FenceKind::Comment => return self.comment_block(open, &fence),
            FenceKind::Table(format, separator) => {
                let (format, separator) = (*format, *separator);
                return self.table(open, &fence, format, separator);
            }
            FenceKind::Fenced(_) => DelimitedKind::Listing,
            FenceKind::Delimited(kind) => *kind,
        };
        let mut metadata = self.take_metadata();
        if let FenceKind::Fenced(language) = &fence.kind
            && metadata.style.is_none()
        {
            let mut entries = vec![AttributeListEntry::Positional {
                value: "source".to_string(),
            }];
            entries.extend(language.iter().map(|language| AttributeListEntry::Positional {
                value: language.clone(),
            }));
            metadata.merge(AttributeList { entries });
        }
        let Some(kind) = masquerade(kind, &metadata) else {
            let (lines, close) = self.read_fenced(&open, &fence, "comment");
            let location = span(&open, close.as_ref().or(lines.last()).unwrap_or(&open));
            return Block::Comment(Comment {
                kind: CommentKind::Block,
                lines: lines.into_iter().map(|line| line.text).collect(),
                location,
            });
        };
        let name = format!("{kind:?}").to_lowercase();
        let (lines, close) = self.read_fenced(&open, &fence, &name);
        let location = span(&open, close.as_ref().or(lines.last()).unwrap_or(&open));
        self.register_block_anchor(&metadata, &open);

        let raw = kind.is_verbatim()
            || kind == DelimitedKind::Pass
            || (kind == DelimitedKind::Quote && metadata.style_is("verse"));
        let (content, listing) = if raw {
            let texts: Vec<String> = lines.into_iter().map(|line| line.text).collect();
            let listing = self.record_callouts(kind, &metadata, location, &texts);
            (BlockContent::Raw(texts), listing)
        } else {
            (BlockContent::Blocks(self.parse_nested(lines, Scope::Nested)), None)
        };
        Block::Delimited(DelimitedBlock {
            kind,
            delimiter: Some(Delimiter {
                length: fence.length(),
                text: fence.text,
            }),
            metadata,
            content,
            listing,
            location,
        })
    }

    pub(super) fn comment_block(&mut self, open: Line, fence: &Fence) -> Block {
        let (lines, close) = self.read_fenced(&open, fence, "comment");
        let location = span(&open, close.as_ref().or(lines.last()).unwrap_or(&open));
        Block::Comment(Comment {
            kind: CommentKind::Block,
            lines: lines.into_iter().map(|line| line.text).collect(),
            location,
        })
    }

    /// Records the callouts of a verbatim block and returns its listing index.
    pub(super) fn record_callouts(
        &mut self,
        kind: DelimitedKind,
        metadata: &BlockMetadata,
        location: Location,
        lines: &[String],
    ) -> Option<usize> {
        if !kind.is_verbatim() {
            return None;
        }
        let language = if metadata.style_is("source") {
            metadata
                .positional(1)
                .or_else(|| metadata.attribute("language"))
                .or_else(|| self.state.attributes.get("source-language"))
        } else {
            metadata.attribute("language")
        };
        let prefix = CommentPrefix::for_block(metadata.attribute("line-comment"), language);
        Some(self.state.callouts.record(location, lines, &prefix))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::super::test_support::{content, parse_body};
    use crate::{
        diagnostic::DiagnosticKind,
        model::{Block, BlockContent, CommentKind, DelimitedBlock, DelimitedKind},
    };

    fn delimited(block: Option<&Block>) -> &DelimitedBlock {
        match block {
            Some(Block::Delimited(block)) => block,
            other => panic!("expected a delimited block, got {other:?}"),
        }
    }

    #[test]
    fn listing_keeps_raw_lines() {
        let (blocks, state) = parse_body("[source,rust]\n----\nfn main() {}\n\n* not a list\n----");
        let block = delimited(blocks.first());
        assert_eq!(block.kind, DelimitedKind::Listing);
        assert_eq!(block.delimiter.as_ref().map(|d| d.length), Some(4));
        assert_eq!(
            block.content,
            BlockContent::Raw(vec![
                "fn main() {}".to_string(),
                String::new(),
                "* not a list".to_string()
            ])
        );
        assert_eq!(block.listing, Some(0));
        assert_eq!(state.callouts.len(), 1);
    }

    #[test]
    fn compound_blocks_parse_their_content() {
        let (blocks, _) = parse_body("====\nInside.\n\n* item\n====");
        let block = delimited(blocks.first());
        assert_eq!(block.kind, DelimitedKind::Example);
        let BlockContent::Blocks(inner) = &block.content else {
            panic!("expected parsed content");
        };
        let inner = content(inner);
        assert!(matches!(inner.first(), Some(Block::Paragraph(_))));
        assert!(matches!(inner.get(1), Some(Block::List(_))));
    }

    #[test]
    fn nested_fences_of_other_lengths() {
        let (blocks, _) = parse_body("======\n====\ninner\n====\n======");
        let outer = delimited(blocks.first());
        let BlockContent::Blocks(inner) = &outer.content else {
            panic!("expected parsed content");
        };
        assert_eq!(delimited(inner.first()).kind, DelimitedKind::Example);
    }

    #[test]
    fn headings_inside_blocks_are_text() {
        let (blocks, _) = parse_body("****\n== Not a section\n****");
        let BlockContent::Blocks(inner) = &delimited(blocks.first()).content else {
            panic!("expected parsed content");
        };
        assert!(matches!(inner.first(), Some(Block::Paragraph(_))));
    }

    #[test]
    #[tracing_test::traced_test]
    fn unterminated_block_closes_at_end() {
        let (blocks, state) = parse_body("....\nliteral\nstill literal");
        let block = delimited(blocks.first());
        assert_eq!(block.kind, DelimitedKind::Literal);
        assert!(matches!(&block.content, BlockContent::Raw(lines) if lines.len() == 2));
        let kinds: Vec<DiagnosticKind> = state.diagnostics.entries().iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::UnterminatedDelimitedBlock]);
        assert!(logs_contain("unterminated literal block"));
    }

    #[rstest::rstest]
    #[case("[source]\n--\nputs 1\n--", DelimitedKind::Listing)]
    #[case("[verse]\n--\nline\n--", DelimitedKind::Quote)]
    #[case("[sidebar]\n--\ntext\n--", DelimitedKind::Sidebar)]
    #[case("--\ntext\n--", DelimitedKind::Open)]
    fn open_block_masquerades(#[case] input: &str, #[case] kind: DelimitedKind) {
        let (blocks, _) = parse_body(input);
        assert_eq!(delimited(blocks.first()).kind, kind);
    }

    #[test]
    fn markdown_fence_sets_source_style() {
        let (blocks, _) = parse_body("```ruby\nputs 1 # <1>\n```\n<1> prints");
        let block = delimited(blocks.first());
        assert_eq!(block.metadata.style.as_deref(), Some("source"));
        assert_eq!(block.metadata.positional(1), Some("ruby"));
        assert!(matches!(blocks.get(1), Some(Block::List(_))));
    }

    #[test]
    fn comment_blocks_and_comment_style() {
        let (blocks, _) = parse_body("////\nhidden\n////\n\n[comment]\n--\nalso hidden\n--");
        let blocks = content(&blocks);
        assert!(matches!(blocks.first(), Some(Block::Comment(c)) if c.kind == CommentKind::Block));
        assert!(matches!(blocks.get(1), Some(Block::Comment(c)) if c.lines == vec!["also hidden"]));
    }

    #[test]
    fn passthrough_is_raw() {
        let (blocks, state) = parse_body("++++\n<video/>\n++++");
        let block = delimited(blocks.first());
        assert_eq!(block.kind, DelimitedKind::Pass);
        assert_eq!(block.listing, None);
        assert!(state.callouts.is_empty());
    }
}
