//! Inline recognition for paragraph text, titles, list item text and table cells.
//!
//! The scanner walks the characters once and turns every construct it recognizes
//! into an [`InlineNode`]. Anything it does not recognize stays text.
use crate::{
    anchor::{AnchorKind, Registration},
    attributes::{AttributeMissing, Reference, parse_reference},
    diagnostic::DiagnosticKind,
    grammar::anchors::parse_inline_anchor,
    model::{
        AttributeReference, CharReplacement, CrossReference, Email, Form, Formatted,
        InlineAnchor, InlineNode, Link, Replacement, Title,
    },
    normalizer::Line,
    state::ParserState,
};

mod replacements;

use replacements::{match_entity, match_replacement};

const URL_SCHEMES: [&str; 5] = ["https://", "http://", "ftp://", "irc://", "mailto:"];

/// Parses the source lines of one block into inline nodes. Lines holding a missing
/// attribute reference are dropped first when `attribute-missing` is `drop-line`.
pub(crate) fn parse_lines<T: AsRef<str>>(
    lines: &[T],
    origin: &Line,
    state: &mut ParserState,
) -> Vec<InlineNode> {
    let kept: Vec<&str> = lines
        .iter()
        .map(AsRef::as_ref)
        .filter(|line| keep_line(line, origin, state))
        .collect();
    parse_text(&kept.join("\n"), origin, state)
}

pub(crate) fn parse_title(text: &str, origin: &Line, state: &mut ParserState) -> Title {
    Title::new(parse_lines(&[text], origin, state))
}

pub(crate) fn parse_text(text: &str, origin: &Line, state: &mut ParserState) -> Vec<InlineNode> {
    let mut scanner = Scanner::new(text, origin, state);
    scanner.run();
    scanner.finish()
}

fn keep_line(line: &str, origin: &Line, state: &mut ParserState) -> bool {
    if state.attributes.attribute_missing() != AttributeMissing::DropLine {
        return true;
    }
    let mut rest = line;
    while let Some(open) = rest.find('{') {
        let escaped = rest.get(..open).is_some_and(|before| before.ends_with('\\'));
        let from_brace = rest.get(open..).unwrap_or_default();
        if let Some((Reference::Name(name), _)) = parse_reference(from_brace)
            && !escaped
            && !state.attributes.is_set(name)
        {
            state.diagnostics.info(
                DiagnosticKind::UnresolvedAttribute,
                origin,
                format!("dropping line containing reference to missing attribute: {name}"),
            );
            return false;
        }
        rest = from_brace.get(1..).unwrap_or_default();
    }
    true
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_mark(c: char) -> bool {
    matches!(c, '*' | '_' | '`' | '#')
}

struct Scanner<'s, 'p> {
    chars: Vec<char>,
    pos: usize,
    buffer: String,
    nodes: Vec<InlineNode>,
    origin: &'p Line,
    state: &'s mut ParserState,
}

impl<'s, 'p> Scanner<'s, 'p> {
    fn new(text: &str, origin: &'p Line, state: &'s mut ParserState) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            buffer: String::new(),
            nodes: Vec::new(),
            origin,
            state,
        }
    }

    fn finish(mut self) -> Vec<InlineNode> {
        if self.buffer.ends_with(" +") {
            self.buffer.truncate(self.buffer.len() - 2);
            self.flush();
            self.nodes.push(InlineNode::LineBreak);
        }
        self.flush();
        self.nodes
    }

    fn at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn previous(&self) -> Option<char> {
        self.pos.checked_sub(1).and_then(|i| self.chars.get(i)).copied()
    }

    fn rest(&self) -> String {
        self.chars.get(self.pos..).unwrap_or_default().iter().collect()
    }

    fn starts_with(&self, needle: &str) -> bool {
        needle
            .chars()
            .enumerate()
            .all(|(i, c)| self.at(i) == Some(c))
    }

    fn slice(&self, from: usize, to: usize) -> String {
        self.chars.get(from..to).unwrap_or_default().iter().collect()
    }

    fn flush(&mut self) {
        if !self.buffer.is_empty() {
            self.nodes.push(InlineNode::text(std::mem::take(&mut self.buffer)));
        }
    }

    fn emit(&mut self, node: InlineNode) {
        self.flush();
        self.nodes.push(node);
    }

    fn run(&mut self) {
        while let Some(c) = self.at(0) {
            if !self.step(c) {
                self.buffer.push(c);
                self.pos += 1;
            }
        }
    }

    /// Tries every construct that can start at the cursor. Returns `false` when none
    /// matched and the character is plain text.
    fn step(&mut self, c: char) -> bool {
        match c {
            '\\' => self.escape(),
            '\n' => {
                self.newline();
                true
            }
            '{' => self.attribute_reference(),
            '[' => self.anchor() || self.role_formatting(),
            '<' => self.cross_reference() || self.replacement(),
            '&' => self.entity(),
            '*' | '_' | '`' | '#' => self.formatting(None),
            'a' if self.starts_with("anchor:") => self.anchor_macro(),
            'x' if self.starts_with("xref:") => self.xref_macro(),
            'l' if self.starts_with("link:") => self.link_macro(),
            '(' | '.' | '-' | '=' => self.replacement(),
            c if c.is_alphanumeric() => self.url() || self.email(),
            _ => false,
        }
    }

    fn escape(&mut self) -> bool {
        let Some(next) = self.at(1) else {
            return false;
        };
        let rest = self.rest();
        let after = rest.get(1..).unwrap_or_default();
        if let Some((_, consumed)) = parse_reference(after) {
            let raw = after.get(..consumed).unwrap_or_default();
            self.buffer.push_str(raw);
            self.pos += 1 + raw.chars().count();
            return true;
        }
        if is_mark(next) || matches!(next, '[' | '<' | '(' | '&' | '-' | '.' | '=') {
            self.buffer.push(next);
            self.pos += 2;
            // A doubled mark is escaped as a whole.
            if is_mark(next) && self.at(0) == Some(next) {
                self.buffer.push(next);
                self.pos += 1;
            }
            return true;
        }
        if URL_SCHEMES.iter().any(|scheme| after.starts_with(scheme)) {
            self.pos += 1;
            while let Some(c) = self.at(0).filter(|c| !c.is_whitespace()) {
                self.buffer.push(c);
                self.pos += 1;
            }
            return true;
        }
        false
    }

    fn newline(&mut self) {
        if self.buffer.ends_with(" +") {
            self.buffer.truncate(self.buffer.len() - 2);
            self.emit(InlineNode::LineBreak);
        } else {
            self.emit(InlineNode::Newline);
        }
        self.pos += 1;
    }

    fn attribute_reference(&mut self) -> bool {
        let rest = self.rest();
        let Some((reference, consumed)) = parse_reference(&rest) else {
            return false;
        };
        self.pos += rest.get(..consumed).map_or(0, |raw| raw.chars().count());
        let name = reference.name().to_string();
        match reference {
            Reference::Counter { emit: true, .. } | Reference::Name(_) => {}
            Reference::Counter { emit: false, .. } | Reference::Set { .. } => {
                self.state.attributes.resolve(&reference);
                return true;
            }
        }
        let value = self.state.attributes.resolve(&reference);
        if value.is_none() {
            match self.state.attributes.attribute_missing() {
                AttributeMissing::Drop => return true,
                AttributeMissing::Warn => self.state.diagnostics.warn(
                    DiagnosticKind::UnresolvedAttribute,
                    self.origin,
                    format!("skipping reference to missing attribute: {name}"),
                ),
                AttributeMissing::Skip | AttributeMissing::DropLine => {
                    tracing::debug!(name, "reference to missing attribute kept as written");
                }
            }
        }
        self.emit(InlineNode::AttributeReference(AttributeReference { name, value }));
        true
    }

    fn anchor(&mut self) -> bool {
        let rest = self.rest();
        if rest.starts_with("[[[") {
            return false;
        }
        let Some((id, reftext, consumed)) = parse_inline_anchor(&rest) else {
            return false;
        };
        let id = id.to_string();
        let reftext = reftext.map(ToString::to_string);
        self.pos += rest.get(..consumed).map_or(0, |raw| raw.chars().count());
        self.register_anchor(&id, reftext.clone());
        self.emit(InlineNode::Anchor(InlineAnchor { id, reftext }));
        true
    }

    fn anchor_macro(&mut self) -> bool {
        if self.previous().is_some_and(is_word) {
            return false;
        }
        let Some((target, text, end)) = self.macro_at("anchor:".len()) else {
            return false;
        };
        if !crate::grammar::anchors::is_valid_id(&target) {
            return false;
        }
        self.pos = end;
        self.register_anchor(&target, text.clone());
        self.emit(InlineNode::Anchor(InlineAnchor {
            id: target,
            reftext: text,
        }));
        true
    }

    fn register_anchor(&mut self, id: &str, reftext: Option<String>) {
        let location = self.origin.location();
        if self.state.anchors.register(id, AnchorKind::Inline, reftext, location)
            == Registration::Duplicate
        {
            self.state.diagnostics.warn(
                DiagnosticKind::DuplicateAnchor,
                self.origin,
                format!("id assigned to anchor already in use: {id}"),
            );
        }
    }

    /// Reads `target[text]` after a macro name of `skip` characters. Returns the
    /// target, the text when non-empty, and the position after the closing bracket.
    fn macro_at(&self, skip: usize) -> Option<(String, Option<String>, usize)> {
        let start = self.pos + skip;
        let mut i = start;
        while let Some(&c) = self.chars.get(i) {
            if c == '[' {
                break;
            }
            if c.is_whitespace() {
                return None;
            }
            i += 1;
        }
        let open = i;
        let close = (open + 1..self.chars.len()).find(|&j| self.chars.get(j) == Some(&']'))?;
        let target = self.slice(start, open);
        if target.is_empty() {
            return None;
        }
        let text = self.slice(open + 1, close);
        let text = (!text.trim().is_empty()).then(|| text.trim().to_string());
        Some((target, text, close + 1))
    }

    fn cross_reference(&mut self) -> bool {
        if !self.starts_with("<<") {
            return false;
        }
        let start = self.pos + 2;
        let Some(close) = (start..self.chars.len().saturating_sub(1)).find(|&j| {
            self.chars.get(j) == Some(&'>') && self.chars.get(j + 1) == Some(&'>')
        }) else {
            return false;
        };
        let inner = self.slice(start, close);
        if inner.is_empty() || inner.contains('\n') || inner.starts_with(' ') {
            return false;
        }
        let (target, text) = match inner.split_once(',') {
            Some((target, text)) => (target.trim().to_string(), Some(text.trim().to_string())),
            None => (inner.trim().to_string(), None),
        };
        self.pos = close + 2;
        self.state.anchors.reference(&target, self.origin.location());
        self.emit(InlineNode::CrossReference(CrossReference {
            target,
            text: text.filter(|text| !text.is_empty()),
        }));
        true
    }

    fn xref_macro(&mut self) -> bool {
        if self.previous().is_some_and(is_word) {
            return false;
        }
        let Some((target, text, end)) = self.macro_at("xref:".len()) else {
            return false;
        };
        self.pos = end;
        self.state.anchors.reference(&target, self.origin.location());
        self.emit(InlineNode::CrossReference(CrossReference { target, text }));
        true
    }

    fn link_macro(&mut self) -> bool {
        if self.previous().is_some_and(is_word) {
            return false;
        }
        let Some((target, text, end)) = self.macro_at("link:".len()) else {
            return false;
        };
        self.pos = end;
        self.emit(InlineNode::Link(Link { target, text }));
        true
    }

    fn url(&mut self) -> bool {
        if self.previous().is_some_and(|c| is_word(c) || c == '/') {
            return false;
        }
        let Some(scheme) = URL_SCHEMES.iter().find(|scheme| self.starts_with(scheme)) else {
            return false;
        };
        if let Some((target, text, end)) = self.macro_at(0) {
            if target.len() > scheme.len() {
                self.pos = end;
                self.emit(InlineNode::Link(Link { target, text }));
                return true;
            }
        }
        let start = self.pos;
        let mut end = start + scheme.chars().count();
        while let Some(&c) = self.chars.get(end) {
            if c.is_whitespace() || matches!(c, '<' | '>' | '[' | '"') {
                break;
            }
            end += 1;
        }
        while end > start
            && self
                .chars
                .get(end - 1)
                .is_some_and(|c| matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | ')'))
        {
            end -= 1;
        }
        if end <= start + scheme.chars().count() {
            return false;
        }
        let target = self.slice(start, end);
        self.pos = end;
        self.emit(InlineNode::Link(Link { target, text: None }));
        true
    }

    fn email(&mut self) -> bool {
        if self.previous().is_some_and(|c| is_word(c) || matches!(c, '.' | '%' | '+' | '-' | '@')) {
            return false;
        }
        let local_char = |c: &char| c.is_alphanumeric() || matches!(c, '.' | '_' | '%' | '+' | '-');
        let domain_char = |c: &char| c.is_alphanumeric() || matches!(c, '.' | '-');
        let start = self.pos;
        let mut i = start;
        while self.chars.get(i).is_some_and(local_char) {
            i += 1;
        }
        if i == start || self.chars.get(i) != Some(&'@') {
            return false;
        }
        let domain_start = i + 1;
        let mut end = domain_start;
        while self.chars.get(end).is_some_and(domain_char) {
            end += 1;
        }
        while end > domain_start && self.chars.get(end - 1).is_some_and(|c| matches!(c, '.' | '-')) {
            end -= 1;
        }
        let domain = self.slice(domain_start, end);
        let Some((name, tld)) = domain.rsplit_once('.') else {
            return false;
        };
        if name.is_empty() || tld.chars().count() < 2 || !tld.chars().all(char::is_alphabetic) {
            return false;
        }
        let address = self.slice(start, end);
        self.pos = end;
        self.emit(InlineNode::Email(Email { address }));
        true
    }

    /// `[role]` directly in front of a formatting mark.
    fn role_formatting(&mut self) -> bool {
        let start = self.pos + 1;
        let Some(close) = (start..self.chars.len()).find(|&j| {
            self.chars
                .get(j)
                .is_some_and(|&c| c == ']' || c == '[' || c == '\n')
        }) else {
            return false;
        };
        if self.chars.get(close) != Some(&']') || close == start {
            return false;
        }
        if !self.chars.get(close + 1).copied().is_some_and(is_mark) {
            return false;
        }
        let role = self.slice(start, close);
        let role = role.strip_prefix('.').unwrap_or(&role).replace('.', " ");
        let saved = self.pos;
        self.pos = close + 1;
        if self.formatting_after(Some(role), self.chars.get(saved.wrapping_sub(1)).copied()) {
            return true;
        }
        self.pos = saved;
        false
    }

    fn formatting(&mut self, role: Option<String>) -> bool {
        let previous = self.previous();
        self.formatting_after(role, previous)
    }

    /// Matches a formatting pair at the cursor. `previous` is the character in front
    /// of the construct, role prefix included.
    fn formatting_after(&mut self, role: Option<String>, previous: Option<char>) -> bool {
        let Some(mark) = self.at(0).filter(|&c| is_mark(c)) else {
            return false;
        };
        if self.at(1) == Some(mark) && self.unconstrained(mark, role.clone()) {
            return true;
        }
        self.constrained(mark, role, previous)
    }

    fn unconstrained(&mut self, mark: char, role: Option<String>) -> bool {
        let start = self.pos + 2;
        let Some(close) = (start + 1..self.chars.len()).find(|&j| {
            self.chars.get(j) == Some(&mark) && self.chars.get(j + 1) == Some(&mark)
        }) else {
            return false;
        };
        let inner = self.slice(start, close);
        if inner.trim().is_empty() {
            return false;
        }
        self.pos = close + 2;
        let content = parse_text(&inner, self.origin, self.state);
        self.emit(formatted(mark, Form::Unconstrained, role, content));
        true
    }

    fn constrained(&mut self, mark: char, role: Option<String>, previous: Option<char>) -> bool {
        if previous.is_some_and(|c| is_word(c) || c == mark || c == ':' || c == ';') {
            return false;
        }
        let start = self.pos + 1;
        if self.chars.get(start).is_none_or(|c| c.is_whitespace() || *c == mark) {
            return false;
        }
        let Some(close) = (start..self.chars.len()).find(|&j| {
            self.chars.get(j) == Some(&mark)
                && self.chars.get(j - 1).is_some_and(|c| !c.is_whitespace())
                && self.chars.get(j + 1).is_none_or(|&c| !is_word(c) && c != mark)
        }) else {
            return false;
        };
        let inner = self.slice(start, close);
        self.pos = close + 1;
        let content = parse_text(&inner, self.origin, self.state);
        self.emit(formatted(mark, Form::Constrained, role, content));
        true
    }

    fn replacement(&mut self) -> bool {
        let rest: String = self
            .chars
            .get(self.pos..(self.pos + 4).min(self.chars.len()))
            .unwrap_or_default()
            .iter()
            .collect();
        let Some((source, kind)) = match_replacement(&rest) else {
            return false;
        };
        if kind == Replacement::EmDash && !self.em_dash_context(source.len()) {
            return false;
        }
        self.pos += source.chars().count();
        self.emit(InlineNode::CharReplacement(CharReplacement {
            source: source.to_string(),
            kind,
        }));
        true
    }

    /// `--` is an em dash between two word characters or between two spaces.
    fn em_dash_context(&self, width: usize) -> bool {
        let before = self.previous();
        let after = self.at(width);
        if after == Some('-') || before == Some('-') {
            return false;
        }
        let word = before.is_some_and(is_word) && after.is_some_and(is_word);
        let spaced = before.is_none_or(|c| c == ' ' || c == '\n')
            && after.is_none_or(|c| c == ' ' || c == '\n');
        word || spaced
    }

    fn entity(&mut self) -> bool {
        let rest: String = self
            .chars
            .get(self.pos..(self.pos + 12).min(self.chars.len()))
            .unwrap_or_default()
            .iter()
            .collect();
        let Some(source) = match_entity(&rest) else {
            return false;
        };
        self.pos += source.chars().count();
        self.emit(InlineNode::CharReplacement(CharReplacement {
            source: source.to_string(),
            kind: Replacement::Entity,
        }));
        true
    }
}

fn formatted(mark: char, form: Form, role: Option<String>, content: Vec<InlineNode>) -> InlineNode {
    let formatted = Formatted {
        form,
        role,
        content,
    };
    match mark {
        '*' => InlineNode::Bold(formatted),
        '_' => InlineNode::Italic(formatted),
        '`' => InlineNode::Monospace(formatted),
        _ => InlineNode::Highlight(formatted),
    }
}

#[cfg(test)]
mod tests {
    use acdc_core::Backend;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{Options, model::Text};

    fn state() -> ParserState {
        ParserState::new(&Options::default(), Backend::default())
    }

    fn parse(text: &str, state: &mut ParserState) -> Vec<InlineNode> {
        parse_text(text, &Line::new(text, 1, None), state)
    }

    fn bold(form: Form, content: &str) -> InlineNode {
        InlineNode::Bold(Formatted {
            form,
            role: None,
            content: vec![InlineNode::text(content)],
        })
    }

    #[test]
    fn constrained_and_unconstrained_bold() {
        let mut state = state();
        assert_eq!(
            parse("a *b* c**d**e", &mut state),
            vec![
                InlineNode::text("a "),
                bold(Form::Constrained, "b"),
                InlineNode::text(" c"),
                bold(Form::Unconstrained, "d"),
                InlineNode::text("e"),
            ]
        );
    }

    #[rstest::rstest]
    #[case("2*3*4")]
    #[case("a * b * c")]
    #[case("snake_case_name")]
    #[case(r"\*not bold*")]
    fn not_formatting(#[case] text: &str) {
        let mut state = state();
        let nodes = parse(text, &mut state);
        assert!(
            nodes.iter().all(|node| matches!(node, InlineNode::Text(_))),
            "{nodes:?}"
        );
    }

    #[test]
    fn role_and_nesting() {
        let mut state = state();
        let nodes = parse("[.big]#_loud_#", &mut state);
        assert_eq!(
            nodes,
            vec![InlineNode::Highlight(Formatted {
                form: Form::Constrained,
                role: Some("big".to_string()),
                content: vec![InlineNode::Italic(Formatted {
                    form: Form::Constrained,
                    role: None,
                    content: vec![InlineNode::text("loud")],
                })],
            })]
        );
    }

    #[test]
    fn newlines_and_hard_breaks() {
        let mut state = state();
        assert_eq!(
            parse("one +\ntwo\nthree +", &mut state),
            vec![
                InlineNode::text("one"),
                InlineNode::LineBreak,
                InlineNode::text("two"),
                InlineNode::Newline,
                InlineNode::text("three"),
                InlineNode::LineBreak,
            ]
        );
    }

    #[test]
    fn anchors_and_cross_references() {
        let mut state = state();
        let nodes = parse("[[here]]See <<there,That>> and xref:here[].", &mut state);
        assert_eq!(
            nodes,
            vec![
                InlineNode::Anchor(InlineAnchor {
                    id: "here".to_string(),
                    reftext: None,
                }),
                InlineNode::text("See "),
                InlineNode::CrossReference(CrossReference {
                    target: "there".to_string(),
                    text: Some("That".to_string()),
                }),
                InlineNode::text(" and "),
                InlineNode::CrossReference(CrossReference {
                    target: "here".to_string(),
                    text: None,
                }),
                InlineNode::text("."),
            ]
        );
        assert!(state.anchors.contains("here"));
        let unresolved: Vec<&str> = state
            .anchors
            .unresolved_xrefs()
            .map(|reference| reference.target.as_str())
            .collect();
        assert_eq!(unresolved, vec!["there"]);
    }

    #[test]
    fn attribute_references_resolve_in_place() {
        let mut state = state();
        state.attributes.set("product", "acdc");
        let nodes = parse("{product} {missing}{set:x:1}", &mut state);
        assert_eq!(
            nodes,
            vec![
                InlineNode::AttributeReference(AttributeReference {
                    name: "product".to_string(),
                    value: Some("acdc".to_string()),
                }),
                InlineNode::text(" "),
                InlineNode::AttributeReference(AttributeReference {
                    name: "missing".to_string(),
                    value: None,
                }),
            ]
        );
        assert_eq!(state.attributes.get("x"), Some("1"));
    }

    #[test]
    #[tracing_test::traced_test]
    fn drop_line_policy_removes_lines() {
        let mut state = state();
        state.attributes.set("attribute-missing", "drop-line");
        let origin = Line::new("", 1, None);
        let nodes = parse_lines(&["keep", "drop {gone}", "also kept"], &origin, &mut state);
        assert_eq!(inlines_text(&nodes), "keep\nalso kept");
        assert!(logs_contain("dropping line containing reference to missing attribute"));
    }

    fn inlines_text(nodes: &[InlineNode]) -> String {
        nodes
            .iter()
            .map(|node| {
                if let InlineNode::Text(Text { content }) = node {
                    content.clone()
                } else if *node == InlineNode::Newline {
                    "\n".to_string()
                } else {
                    format!("{node:?}")
                }
            })
            .collect()
    }

    #[test]
    fn replacements_and_entities() {
        let mut state = state();
        let kinds: Vec<Replacement> = parse("(C) a -- b... x->y &amp; &#169; word--word", &mut state)
            .into_iter()
            .filter_map(|node| {
                if let InlineNode::CharReplacement(replacement) = node {
                    Some(replacement.kind)
                } else {
                    None
                }
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                Replacement::Copyright,
                Replacement::EmDash,
                Replacement::Ellipsis,
                Replacement::RightArrow,
                Replacement::Entity,
                Replacement::Entity,
                Replacement::EmDash,
            ]
        );
    }

    #[test]
    fn links_and_emails() {
        let mut state = state();
        let nodes = parse(
            "Visit https://asciidoctor.org. Or link:index.html[Home], mail doc@example.com",
            &mut state,
        );
        let found: Vec<InlineNode> = nodes
            .into_iter()
            .filter(|node| !matches!(node, InlineNode::Text(_)))
            .collect();
        assert_eq!(
            found,
            vec![
                InlineNode::Link(Link {
                    target: "https://asciidoctor.org".to_string(),
                    text: None,
                }),
                InlineNode::Link(Link {
                    target: "index.html".to_string(),
                    text: Some("Home".to_string()),
                }),
                InlineNode::Email(Email {
                    address: "doc@example.com".to_string(),
                }),
            ]
        );
    }
}
