//! Section nesting: headings, levels, generated ids and the manpage NAME section.
use acdc_core::Doctype;

use super::{Parser, Scope, Step, span_blocks};
use crate::{
    anchor::{AnchorKind, Registration},
    diagnostic::DiagnosticKind,
    inlines,
    model::{Block, BlockMetadata, DiscreteHeading, Section, Title},
    normalizer::Line,
};

/// A section heading the engine read but has not yet placed.
#[derive(Debug)]
pub(crate) struct Heading {
    pub(crate) line: Line,
    pub(crate) level: usize,
    pub(crate) title: String,
    pub(crate) metadata: BlockMetadata,
}

impl Parser<'_> {
    /// The level and title of a heading at the cursor, without consuming anything.
    pub(super) fn heading_shape(&mut self, line: &Line, scope: Scope) -> Option<(usize, String, bool)> {
        let discrete = self.pending_style_is(&["discrete", "float"]);
        if scope == Scope::Nested && !discrete {
            return None;
        }
        if let Some((marks, title)) = super::classify::heading(&line.text) {
            return Some((marks - 1, title.to_string(), false));
        }
        let underline = self.peek_text(0)?;
        super::classify::setext_level(&line.text, &underline).map(|level| (level, line.text.clone(), true))
    }

    pub(super) fn heading(&mut self, line: Line, level: usize, title: String, setext: bool) -> Step {
        if setext {
            let _ = self.next_line();
        }
        let level = self.offset_level(level);
        let metadata = self.take_metadata();
        if metadata.style_is("discrete") || metadata.style_is("float") {
            let title = inlines::parse_title(&title, &line, &mut self.state);
            let id = self.section_id(&metadata, &title, &line);
            return Step::Block(Block::DiscreteHeading(DiscreteHeading {
                title,
                level,
                id,
                metadata,
                location: line.location(),
            }));
        }
        Step::Heading(Heading {
            line,
            level,
            title,
            metadata,
        })
    }

    /// Applies `leveloffset`, keeping the level between 0 and 5.
    fn offset_level(&self, level: usize) -> usize {
        let offset = self
            .state
            .attributes
            .get("leveloffset")
            .and_then(|offset| offset.trim().parse::<i64>().ok())
            .unwrap_or(0);
        let level = i64::try_from(level).unwrap_or(0).saturating_add(offset).clamp(0, 5);
        usize::try_from(level).unwrap_or(0)
    }

    /// Builds a section from its heading, taking blocks and deeper sections until a
    /// heading at the same or a shallower level. That heading is handed back.
    #[tracing::instrument(level = "debug", skip_all, fields(title = %heading.title, level = heading.level))]
    pub(super) fn parse_section(&mut self, heading: Heading, parent: Option<usize>) -> (Block, Option<Heading>) {
        let Heading {
            line,
            level,
            title,
            metadata,
        } = heading;
        self.check_level(&line, level, parent);
        let is_name_section = self.check_manpage_name(&line, &title, parent);
        let title = inlines::parse_title(&title, &line, &mut self.state);
        let id = self.section_id(&metadata, &title, &line);
        let outer_bibliography = self.bibliography;
        self.bibliography |= metadata.style_is("bibliography");

        let mut blocks = Vec::new();
        let mut next = self.collect_until_heading(&mut blocks, Scope::Document);
        while let Some(child) = next.take_if(|heading| heading.level > level) {
            let (section, after) = self.parse_section(child, Some(level));
            blocks.push(section);
            next = after;
        }
        self.bibliography = outer_bibliography;
        if is_name_section {
            self.read_manpage_name(&line, &blocks);
        }
        let location = span_blocks(line.location(), &blocks);
        (
            Block::Section(Section {
                title,
                level,
                id,
                metadata,
                blocks,
                location,
            }),
            next,
        )
    }

    fn check_level(&mut self, line: &Line, level: usize, parent: Option<usize>) {
        if level == 0 && self.state.doctype() != Doctype::Book {
            self.state.diagnostics.error(
                DiagnosticKind::LevelZeroSection,
                line,
                "level 0 sections can only be used when doctype is book",
            );
        }
        let expected = parent.map_or(1, |parent| parent + 1);
        if level > expected {
            self.state.diagnostics.warn(
                DiagnosticKind::SectionLevelSkipped,
                line,
                format!("section title out of sequence: expected level {expected}, got level {level}"),
            );
        }
    }

    /// The first top-level section of a manpage must be NAME. Returns whether this
    /// heading is that section.
    fn check_manpage_name(&mut self, line: &Line, title: &str, parent: Option<usize>) -> bool {
        if self.nesting > 0 || parent.is_some() || self.seen_section {
            return false;
        }
        self.seen_section = true;
        if self.state.doctype() != Doctype::Manpage {
            return false;
        }
        let is_name = title.trim().eq_ignore_ascii_case("name");
        if !is_name {
            self.state.diagnostics.error(
                DiagnosticKind::ManpageNameSection,
                line,
                format!("non-conforming manpage: first section must be named NAME, found: {title}"),
            );
        }
        is_name
    }

    /// `name - purpose` in the first paragraph of the NAME section.
    fn read_manpage_name(&mut self, line: &Line, blocks: &[Block]) {
        let text = blocks.iter().find_map(|block| match block {
            Block::Paragraph(paragraph) => Some(crate::model::inlines_to_string(&paragraph.content)),
            Block::Section(_)
            | Block::DiscreteHeading(_)
            | Block::Delimited(_)
            | Block::List(_)
            | Block::UnorderedListItem(_)
            | Block::OrderedListItem(_)
            | Block::DescriptionListItem(_)
            | Block::CalloutListItem(_)
            | Block::ListContinuation(_)
            | Block::Table(_)
            | Block::Image(_)
            | Block::BlockMacro(_)
            | Block::Comment(_)
            | Block::ThematicBreak(_)
            | Block::PageBreak(_)
            | Block::AttributeEntry(_)
            | Block::AttributeReset(_)
            | Block::Conditional(_)
            | Block::Include(_)
            | Block::Blank(_) => None,
        });
        let Some((names, purpose)) = text.as_deref().and_then(|text| text.split_once(" - ")) else {
            self.state.diagnostics.error(
                DiagnosticKind::ManpageNameSection,
                line,
                "non-conforming manpage: NAME section must contain name - purpose",
            );
            return;
        };
        let names = names.trim();
        let manname = names.split(',').next().unwrap_or(names).trim().to_string();
        self.state.attributes.set("manname", manname);
        self.state.attributes.set("mannames", names.to_string());
        self.state.attributes.set("manpurpose", purpose.trim().to_string());
    }

    /// The explicit id from the metadata, or one generated from the title when
    /// `sectids` is set. Either way it is registered.
    pub(super) fn section_id(&mut self, metadata: &BlockMetadata, title: &Title, line: &Line) -> Option<String> {
        let reftext = metadata.reftext.clone().unwrap_or_else(|| title.plain_text());
        if let Some(id) = &metadata.id {
            if self
                .state
                .anchors
                .register(id, AnchorKind::Section, Some(reftext), line.location())
                == Registration::Duplicate
            {
                self.state.diagnostics.warn(
                    DiagnosticKind::DuplicateAnchor,
                    line,
                    format!("id assigned to section already in use: {id}"),
                );
            }
            return Some(id.clone());
        }
        if !self.state.attributes.is_set("sectids") {
            return None;
        }
        let prefix = self.state.attributes.get("idprefix").unwrap_or_default();
        let separator = self.state.attributes.get("idseparator").unwrap_or_default();
        let base = generate_id(&title.plain_text(), prefix, separator);
        let joiner = if separator.is_empty() { "_" } else { separator };
        let mut id = base.clone();
        let mut counter = 2;
        while self.state.anchors.contains(&id) {
            id = format!("{base}{joiner}{counter}");
            counter += 1;
        }
        self.state
            .anchors
            .register(&id, AnchorKind::Section, Some(reftext), line.location());
        Some(id)
    }
}

/// Lowercases the title, keeps alphanumerics, turns whitespace, `-` and `.` into
/// the separator and drops everything else. Runs of separators collapse and
/// trailing ones are trimmed.
fn generate_id(title: &str, prefix: &str, separator: &str) -> String {
    let mut id = String::from(prefix);
    let mut pending_separator = false;
    for c in title.to_lowercase().chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_separator && id.len() > prefix.len() {
                id.push_str(separator);
            }
            pending_separator = false;
            id.push(c);
        } else if c.is_whitespace() || c == '-' || c == '.' {
            pending_separator = true;
        }
    }
    id
}
