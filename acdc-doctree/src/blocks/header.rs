//! The document header: the doctitle, the author and revision lines and the attribute
//! entries around them, up to the first blank line or a `///` line.
//!
//! Attribute entries may also sit above the doctitle. Without a doctitle those entries
//! still make up a header of their own.
use acdc_core::Doctype;

use super::{
    Parser,
    classify::{self, FenceKind},
    entry::RawEntry,
};
use crate::{
    diagnostic::DiagnosticKind,
    grammar::{
        attributes::parse_entry,
        author_revision::{parse_author, parse_authors, parse_revision},
    },
    inlines,
    model::{Author, Block, Comment, CommentKind, Header, Location, Revision, TitleSource},
    normalizer::Line,
};

const HEADER_TERMINATOR: &str = "///";

const DOCTYPES: [Doctype; 4] = [
    Doctype::Article,
    Doctype::Book,
    Doctype::Manpage,
    Doctype::Inline,
];

/// What the top of the document holds before its first content line.
#[derive(Debug, Clone, Copy, Default)]
struct Ahead {
    entry: bool,
    title: bool,
}

/// The pieces of the header gathered while reading it.
#[derive(Debug, Default)]
struct Parts {
    first: Option<Line>,
    end: Location,
    entries: Vec<Block>,
    title: Option<(String, Line)>,
    authors: Vec<Author>,
    revision: Option<Revision>,
    doctitle_entry: bool,
}

impl Parts {
    fn saw(&mut self, line: &Line) {
        if self.first.is_none() {
            self.first = Some(line.clone());
        }
        self.end = line.location();
    }

    /// The value the revision line gave `name`, if any.
    fn revision_value(&self, name: &str) -> Option<&str> {
        let revision = self.revision.as_ref()?;
        match name {
            "revnumber" => revision.number.as_deref(),
            "revdate" => revision.date.as_deref(),
            "revremark" => revision.remark.as_deref(),
            _ => None,
        }
    }
}

/// Whether an entry value goes on with the next line.
fn wraps(value: &str) -> bool {
    value.strip_suffix('\\').is_some_and(|rest| rest.ends_with(' '))
}

impl Parser<'_> {
    /// Reads the header, if the document has one. Lines after the header, including
    /// the blank line that ends it, stay in the reader for the body.
    #[tracing::instrument(level = "debug", skip(self))]
    pub(crate) fn parse_header(&mut self) -> Option<Header> {
        let mut ahead = self.look_ahead();
        if !ahead.title && !ahead.entry {
            self.check_manpage_without_title();
            return None;
        }
        let mut parts = Parts::default();
        // The reader holds back directives behind unread entries, so every consumed
        // entry can reveal more of the header.
        while !ahead.title && ahead.entry {
            if !self.skip_blank(&mut parts) && !self.header_line(&mut parts) {
                break;
            }
            ahead = self.look_ahead();
        }
        if ahead.title {
            while !self.at_doctitle() {
                if !self.skip_blank(&mut parts) && !self.header_line(&mut parts) {
                    break;
                }
            }
            if self.at_doctitle() {
                self.doctitle_line(&mut parts);
                self.author_and_revision(&mut parts);
                self.header_entries(&mut parts);
            }
        }
        self.finish_header(parts)
    }

    /// Scans the leading blank, comment and entry lines without consuming them.
    fn look_ahead(&mut self) -> Ahead {
        let mut ahead = Ahead::default();
        let mut offset = 0;
        let mut comment_fence = None;
        let mut wrapped = false;
        while let Some(line) = self.reader.peek(offset, &mut self.state).cloned() {
            offset += 1;
            if let Some(fence) = &comment_fence {
                if fence == &line.text {
                    comment_fence = None;
                }
                continue;
            }
            if wrapped && !line.is_blank() {
                wrapped = wraps(&format!(" {}", line.text.trim()));
                continue;
            }
            wrapped = false;
            if line.synthetic || line.is_blank() || classify::line_comment(&line.text).is_some() {
                continue;
            }
            if let Some(fence) = classify::fence(&line.text)
                && fence.kind == FenceKind::Comment
            {
                comment_fence = Some(fence.text);
                continue;
            }
            if let Some(entry) = parse_entry(&line.text) {
                ahead.entry = true;
                wrapped = entry.value.is_some_and(wraps);
                continue;
            }
            ahead.title = self.is_doctitle(&line.text, offset);
            break;
        }
        ahead
    }

    /// `= Title`, or a title underlined with `=` when `next` holds the underline.
    fn is_doctitle(&mut self, text: &str, next: usize) -> bool {
        if matches!(classify::heading(text), Some((1, _))) {
            return true;
        }
        self.reader
            .peek(next, &mut self.state)
            .is_some_and(|underline| classify::setext_level(text, &underline.text) == Some(0))
    }

    fn at_doctitle(&mut self) -> bool {
        match self.peek_text(0) {
            Some(text) => self.is_doctitle(&text, 1),
            None => false,
        }
    }

    fn header_directives(&mut self, parts: &mut Parts) {
        let _ = self.reader.peek(0, &mut self.state);
        parts.entries.extend(self.reader.take_directives());
    }

    fn skip_blank(&mut self, parts: &mut Parts) -> bool {
        self.header_directives(parts);
        if !self.peek_is(0, Line::is_blank) {
            return false;
        }
        let _ = self.next_line();
        true
    }

    /// Consumes a comment or an attribute entry. Any other line is left in place and
    /// ends the header.
    fn header_line(&mut self, parts: &mut Parts) -> bool {
        if self.header_comment(parts) {
            return true;
        }
        let Some(line) = self.next_line() else {
            return false;
        };
        if line.synthetic {
            self.apply_synthetic(&line);
            return true;
        }
        match self.read_entry(line) {
            Ok(entry) => {
                self.header_entry(&entry, parts);
                true
            }
            Err(line) => {
                self.unread(line);
                false
            }
        }
    }

    fn header_comment(&mut self, parts: &mut Parts) -> bool {
        self.header_directives(parts);
        let Some(line) = self.next_line() else {
            return false;
        };
        if let Some(text) = classify::line_comment(&line.text) {
            parts.saw(&line);
            parts.entries.push(Block::Comment(Comment {
                kind: CommentKind::Line,
                lines: vec![text.to_string()],
                location: line.location(),
            }));
            return true;
        }
        if let Some(fence) = classify::fence(&line.text)
            && fence.kind == FenceKind::Comment
        {
            parts.saw(&line);
            let block = self.comment_block(line, &fence);
            if let Some(location) = block.location() {
                parts.end = location;
            }
            parts.entries.push(block);
            return true;
        }
        self.unread(line);
        false
    }

    fn header_entry(&mut self, entry: &RawEntry, parts: &mut Parts) {
        parts.saw(&entry.first);
        parts.saw(&entry.last);
        let name = entry.name.to_lowercase();
        let block = self.apply_entry(entry, true);
        if let Block::AttributeEntry(applied) = &block
            && applied.applied
        {
            if name == "doctitle" {
                parts.doctitle_entry = true;
            }
            let current = self.state.attributes.get(&name);
            if let Some(from_line) = parts.revision_value(&name)
                && current != Some(from_line)
            {
                self.state.diagnostics.warn(
                    DiagnosticKind::RevisionOverridden,
                    &entry.first,
                    format!("attribute entry {name} overrides the value from the revision line: {from_line}"),
                );
            }
        }
        parts.entries.push(block);
    }

    fn doctitle_line(&mut self, parts: &mut Parts) {
        let Some(line) = self.next_line() else {
            return;
        };
        parts.saw(&line);
        let text = match classify::heading(&line.text) {
            Some((_, title)) => title.to_string(),
            None => {
                if let Some(underline) = self.next_line() {
                    parts.saw(&underline);
                }
                line.text.clone()
            }
        };
        let text = self.substitute(&text, &line).unwrap_or_default();
        if !parts.doctitle_entry {
            self.state.attributes.set("doctitle", text.clone());
        }
        tracing::debug!(title = %text, "document title");
        parts.title = Some((text, line));
    }

    /// The line after the doctitle is the author line and the one after that the
    /// revision line, unless either is blank, a comment or an attribute entry.
    fn author_and_revision(&mut self, parts: &mut Parts) {
        let Some(line) = self.header_text_line(parts) else {
            return;
        };
        parts.authors = parse_authors(&line.text);
        self.set_author_attributes(&parts.authors);
        let Some(line) = self.header_text_line(parts) else {
            return;
        };
        let revision = parse_revision(&line.text);
        if let Some(revision) = &revision {
            for (name, value) in [
                ("revnumber", &revision.number),
                ("revdate", &revision.date),
                ("revremark", &revision.remark),
            ] {
                if let Some(value) = value {
                    self.state.attributes.set(name, value.clone());
                }
            }
        }
        parts.revision = revision;
    }

    fn header_text_line(&mut self, parts: &mut Parts) -> Option<Line> {
        while self.header_comment(parts) {}
        let line = self.next_line()?;
        if line.is_blank()
            || line.synthetic
            || line.text == HEADER_TERMINATOR
            || parse_entry(&line.text).is_some()
        {
            self.unread(line);
            return None;
        }
        parts.saw(&line);
        Some(line)
    }

    fn header_entries(&mut self, parts: &mut Parts) {
        loop {
            self.header_directives(parts);
            if self.peek_is(0, |line| line.text == HEADER_TERMINATOR) {
                if let Some(line) = self.next_line() {
                    parts.saw(&line);
                }
                return;
            }
            if self.peek_is(0, Line::is_blank) || !self.header_line(parts) {
                return;
            }
        }
    }

    /// Sets `author`, `firstname`, `email` and friends for the first author and the
    /// `_N` suffixed forms for every author when there are several.
    fn set_author_attributes(&mut self, authors: &[Author]) {
        let attributes = &mut self.state.attributes;
        attributes.set("authorcount", authors.len().to_string());
        if authors.is_empty() {
            return;
        }
        let names: Vec<String> = authors.iter().map(Author::full_name).collect();
        attributes.set("authors", names.join(", "));
        for (index, author) in authors.iter().enumerate() {
            let mut suffixes = Vec::new();
            if index == 0 {
                suffixes.push(String::new());
            }
            if authors.len() > 1 {
                suffixes.push(format!("_{}", index + 1));
            }
            for suffix in suffixes {
                attributes.set(&format!("author{suffix}"), author.full_name());
                attributes.set(&format!("firstname{suffix}"), author.first_name.clone());
                if let Some(middle) = &author.middle_name {
                    attributes.set(&format!("middlename{suffix}"), middle.clone());
                }
                if let Some(last) = &author.last_name {
                    attributes.set(&format!("lastname{suffix}"), last.clone());
                }
                attributes.set(&format!("authorinitials{suffix}"), author.initials.clone());
                if let Some(email) = &author.email {
                    attributes.set(&format!("email{suffix}"), email.clone());
                }
            }
        }
    }

    /// Authors from the author line, unless `authors`, `author` or `authorinitials`
    /// entries disagree with what the line gave.
    fn resolve_authors(&mut self, implicit: Vec<Author>) -> Vec<Author> {
        let attributes = &self.state.attributes;
        let email = attributes.get("email").map(ToString::to_string);
        let with_email = |mut author: Author| {
            if author.email.is_none() {
                author.email.clone_from(&email);
            }
            author
        };
        let listed = |list: &str| -> Vec<Author> { parse_authors(&list.replace(',', ";")) };
        let mut authors = implicit;
        let changed = if authors.is_empty() {
            authors = match (attributes.get("authors"), attributes.get("author")) {
                (Some(list), _) if !list.is_empty() => listed(list),
                (_, Some(author)) if !author.is_empty() => vec![with_email(parse_author(author))],
                (Some(_) | None, Some(_) | None) => Vec::new(),
            };
            !authors.is_empty()
        } else {
            let names: Vec<String> = authors.iter().map(Author::full_name).collect();
            let first_name = names.first().cloned().unwrap_or_default();
            match (attributes.get("authors"), attributes.get("author")) {
                (Some(list), _) if !list.is_empty() && list != names.join(", ") => {
                    authors = listed(list);
                    true
                }
                (_, Some(author)) if !author.is_empty() && author != first_name => {
                    if let Some(first) = authors.first_mut() {
                        *first = with_email(parse_author(author));
                    }
                    true
                }
                (Some(_) | None, Some(_) | None) => false,
            }
        };
        let initials = attributes.get("authorinitials").map(ToString::to_string);
        if let (Some(initials), Some(first)) = (initials, authors.first_mut())
            && !initials.is_empty()
            && initials != first.initials
        {
            first.initials = initials;
        }
        if changed {
            self.set_author_attributes(&authors);
        }
        authors
    }

    fn finish_header(&mut self, parts: Parts) -> Option<Header> {
        let Parts {
            first,
            end,
            entries,
            title,
            authors,
            revision: _,
            doctitle_entry,
        } = parts;
        let first = first?;
        let origin = title.as_ref().map_or(&first, |(_, line)| line).clone();

        let attributes = &self.state.attributes;
        let resolved = match (attributes.get("title"), &title) {
            (Some(text), _) if !text.is_empty() => Some((text.to_string(), TitleSource::TitleAttribute)),
            _ if doctitle_entry => attributes
                .get("doctitle")
                .map(|text| (text.to_string(), TitleSource::DoctitleAttribute)),
            (_, Some((text, _))) => Some((text.clone(), TitleSource::Implicit)),
            (Some(_) | None, None) => None,
        };
        let (title, subtitle, title_source) = match &resolved {
            Some((text, source)) => {
                let (main, subtitle) = match text.rsplit_once(": ") {
                    Some((main, subtitle)) => (main.trim(), Some(subtitle.trim())),
                    None => (text.as_str(), None),
                };
                let title = inlines::parse_title(main, &origin, &mut self.state);
                let subtitle = subtitle.map(|subtitle| inlines::parse_title(subtitle, &origin, &mut self.state));
                (Some(title), subtitle, Some(*source))
            }
            None => (None, None, None),
        };

        let authors = self.resolve_authors(authors);
        let attributes = &self.state.attributes;
        let revision = Revision {
            number: attributes.get("revnumber").map(ToString::to_string),
            date: attributes.get("revdate").map(ToString::to_string),
            remark: attributes.get("revremark").map(ToString::to_string),
        };
        let revision = (revision != Revision::default()).then_some(revision);

        self.refresh_doctype();
        if self.state.doctype() == Doctype::Manpage {
            let text = resolved.as_ref().map(|(text, _)| text.as_str());
            self.manpage_title(text, &origin);
        }
        tracing::debug!(?title_source, authors = authors.len(), "parsed header");
        Some(Header {
            title,
            subtitle,
            title_source,
            authors,
            revision,
            entries,
            location: first.location().to(end),
        })
    }

    /// Keeps the `doctype-<name>` flag in line with a `doctype` set in the header.
    fn refresh_doctype(&mut self) {
        let current = self.state.doctype();
        for doctype in DOCTYPES {
            let name = format!("doctype-{doctype}");
            if doctype == current {
                self.state.attributes.set(&name, "");
            } else {
                self.state.attributes.unset(&name);
            }
        }
    }

    /// A manpage doctitle reads `name(volume)` and gives `mantitle` and `manvolnum`.
    /// Any other title falls back to the document name and volume 1.
    fn manpage_title(&mut self, title: Option<&str>, origin: &Line) {
        if let Some((name, volume)) = title.and_then(parse_manpage_title) {
            self.state.attributes.set("mantitle", name.to_lowercase());
            self.state.attributes.set("manvolnum", volume.to_string());
            return;
        }
        let fallback = self
            .state
            .attributes
            .get("docname")
            .or(title)
            .unwrap_or("manpage")
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-");
        self.state.diagnostics.warn(
            DiagnosticKind::ManpageTitle,
            origin,
            format!(
                "non-conforming manpage title: {}, expected name(volume)",
                title.unwrap_or_default()
            ),
        );
        self.state.attributes.set("mantitle", fallback);
        self.state.attributes.set("manvolnum", "1");
    }

    fn check_manpage_without_title(&mut self) {
        if self.state.doctype() != Doctype::Manpage {
            return;
        }
        if let Some(line) = self.reader.peek(0, &mut self.state).cloned() {
            self.manpage_title(None, &line);
        }
    }
}

/// Splits `git-commit(1)` into its name and volume. The volume is a digit with an
/// optional letter.
fn parse_manpage_title(title: &str) -> Option<(&str, &str)> {
    let inner = title.trim().strip_suffix(')')?;
    let (name, volume) = inner.rsplit_once('(')?;
    let name = name.trim();
    let mut chars = volume.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_digit())
        && chars.next().is_none_or(|c| c.is_ascii_alphabetic())
        && chars.next().is_none();
    (valid && !name.is_empty()).then_some((name, volume))
}
