//! The line reader: feeds normalized lines to the parser, resolving conditionals and
//! includes on the way.
//!
//! Preprocessing is lazy. A directive is only handled when the parser looks at or past
//! its line, so attribute entries applied before that point are honoured.
use std::{collections::VecDeque, path::Path, rc::Rc};

use crate::{
    diagnostic::DiagnosticKind,
    error::IncludeError,
    grammar::attributes::parse_entry,
    model::{self, Block, ConditionalKind, Location},
    normalizer::{self, Line},
    state::ParserState,
};

mod conditional;
mod include;
mod tag;

use conditional::{Conditional, Directive, is_directive_line, parse_directive};
pub use include::{FileIncludeResolver, IncludeRequest, IncludeResolver, ResolvedInclude};
use include::{IncludeDirective, LinesRange};
pub(crate) use include::{decode, encoding_for_label};

/// An open `ifdef` / `ifndef` / `ifeval`.
#[derive(Debug)]
struct Frame {
    conditional: Conditional,
    satisfied: bool,
    line: Line,
}

pub(crate) struct Reader<'r> {
    pending: VecDeque<Line>,
    ready: VecDeque<Line>,
    frames: Vec<Frame>,
    /// Directive nodes keyed by how many lines had been made ready before them.
    directives: VecDeque<(usize, Block)>,
    pushed: usize,
    consumed: usize,
    resolver: Option<&'r mut dyn IncludeResolver>,
    exhausted: bool,
}

impl std::fmt::Debug for Reader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("pending", &self.pending.len())
            .field("ready", &self.ready.len())
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

impl<'r> Reader<'r> {
    pub(crate) fn new(lines: Vec<Line>, resolver: Option<&'r mut dyn IncludeResolver>) -> Self {
        Self {
            pending: lines.into(),
            ready: VecDeque::new(),
            frames: Vec::new(),
            directives: VecDeque::new(),
            pushed: 0,
            consumed: 0,
            resolver,
            exhausted: false,
        }
    }

    /// A reader over lines that already went through preprocessing, such as the
    /// content of a delimited block.
    pub(crate) fn preprocessed(lines: Vec<Line>) -> Self {
        let count = lines.len();
        Self {
            pending: VecDeque::new(),
            ready: lines.into(),
            frames: Vec::new(),
            directives: VecDeque::new(),
            pushed: count,
            consumed: 0,
            resolver: None,
            exhausted: true,
        }
    }

    /// The line `offset` positions ahead of the cursor.
    pub(crate) fn peek(&mut self, offset: usize, state: &mut ParserState) -> Option<&Line> {
        self.fill(offset, state);
        self.ready.get(offset)
    }

    pub(crate) fn next_line(&mut self, state: &mut ParserState) -> Option<Line> {
        self.fill(0, state);
        let line = self.ready.pop_front()?;
        self.consumed += 1;
        Some(line)
    }

    /// Puts a line back in front of the cursor.
    pub(crate) fn unread(&mut self, line: Line) {
        self.consumed = self.consumed.saturating_sub(1);
        self.ready.push_front(line);
    }

    /// Directive nodes found before the line at the cursor.
    pub(crate) fn take_directives(&mut self) -> Vec<Block> {
        let mut taken = Vec::new();
        while self
            .directives
            .front()
            .is_some_and(|(position, _)| *position <= self.consumed)
        {
            if let Some((_, block)) = self.directives.pop_front() {
                taken.push(block);
            }
        }
        taken
    }

    /// Every remaining directive node, once the input is exhausted.
    pub(crate) fn drain_directives(&mut self) -> Vec<Block> {
        self.directives.drain(..).map(|(_, block)| block).collect()
    }

    fn fill(&mut self, offset: usize, state: &mut ParserState) {
        while self.ready.len() <= offset {
            if self.directive_awaits_entry() {
                return;
            }
            let Some(line) = self.pending.pop_front() else {
                self.finish(state);
                return;
            };
            self.process(line, state);
        }
    }

    /// A directive is next in line, but an attribute entry ahead of it has not been
    /// read yet. The directive is held back until the entry is applied, so peeking
    /// stops short of it.
    fn directive_awaits_entry(&self) -> bool {
        self.pending
            .front()
            .is_some_and(|line| is_directive_line(&line.text) || line.text.starts_with("include::"))
            && self
                .ready
                .iter()
                .any(|line| line.synthetic || parse_entry(&line.text).is_some())
    }

    fn finish(&mut self, state: &mut ParserState) {
        if self.exhausted {
            return;
        }
        self.exhausted = true;
        for frame in self.frames.drain(..) {
            state.diagnostics.warn(
                DiagnosticKind::UnterminatedConditional,
                &frame.line,
                format!("unterminated preprocessor conditional directive: {}", frame.line.text),
            );
        }
    }

    fn skipping(&self) -> bool {
        self.frames.iter().any(|frame| !frame.satisfied)
    }

    fn push_ready(&mut self, line: Line) {
        self.pushed += 1;
        self.ready.push_back(line);
    }

    fn record(&mut self, block: Block) {
        self.directives.push_back((self.pushed, block));
    }

    fn process(&mut self, line: Line, state: &mut ParserState) {
        if line.is_blank() {
            if !self.skipping() {
                self.push_ready(line);
            }
            return;
        }
        if line.text.starts_with('\\') && (is_directive_line(&line.text) || line.text.starts_with("\\include::")) {
            if !self.skipping() {
                let mut line = line;
                line.text.remove(0);
                self.push_ready(line);
            }
            return;
        }
        if is_directive_line(&line.text) {
            match parse_directive(&line.text) {
                Some(directive) => self.conditional(directive, line, state),
                None if self.skipping() => {}
                None => {
                    state.diagnostics.warn(
                        DiagnosticKind::InvalidConditional,
                        &line,
                        format!("malformed preprocessor directive: {}", line.text),
                    );
                    self.push_ready(line);
                }
            }
            return;
        }
        if self.skipping() {
            return;
        }
        if line.text.starts_with("include::") && line.text.ends_with(']') {
            if let Some(directive) = IncludeDirective::parse(&line.text) {
                self.include(&directive, line, state);
                return;
            }
        }
        self.push_ready(line);
    }

    fn conditional(&mut self, directive: Directive, line: Line, state: &mut ParserState) {
        match directive {
            Directive::Open(conditional) => {
                if self.skipping() {
                    self.frames.push(Frame {
                        conditional,
                        satisfied: false,
                        line,
                    });
                    return;
                }
                let satisfied = match conditional.evaluate(&mut state.attributes) {
                    Ok(satisfied) => satisfied,
                    Err(message) => {
                        state
                            .diagnostics
                            .warn(DiagnosticKind::InvalidConditional, &line, message);
                        false
                    }
                };
                self.record(Block::Conditional(model::Conditional {
                    kind: conditional.kind,
                    target: conditional.target.clone(),
                    satisfied,
                    location: line.location(),
                }));
                match &conditional.content {
                    Some(content) => {
                        if satisfied {
                            let mut spliced = line.clone();
                            spliced.text.clone_from(content);
                            self.pending.push_front(spliced);
                        }
                    }
                    None => self.frames.push(Frame {
                        conditional,
                        satisfied,
                        line,
                    }),
                }
            }
            Directive::Endif(endif) => {
                let Some(frame) = self.frames.last() else {
                    state.diagnostics.warn(
                        DiagnosticKind::MismatchedEndif,
                        &line,
                        format!("unmatched preprocessor directive: {}", line.text),
                    );
                    return;
                };
                if !endif.closes(&frame.conditional) {
                    state.diagnostics.warn(
                        DiagnosticKind::MismatchedEndif,
                        &line,
                        format!(
                            "mismatched preprocessor directive: {}, expected endif::{}[]",
                            line.text, frame.conditional.target
                        ),
                    );
                    return;
                }
                self.frames.pop();
                if !self.skipping() {
                    self.record(Block::Conditional(model::Conditional {
                        kind: ConditionalKind::Endif,
                        target: endif.target,
                        satisfied: true,
                        location: line.location(),
                    }));
                }
            }
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(target = %directive.target))]
    fn include(&mut self, directive: &IncludeDirective, line: Line, state: &mut ParserState) {
        let location = line.location();
        let record = |resolved| {
            Block::Include(model::Include {
                target: directive.target.clone(),
                attributes: directive.raw_attributes.clone(),
                resolved,
                location,
            })
        };
        let Some(target) = state.attributes.substitute(&directive.target).text else {
            state.diagnostics.warn(
                DiagnosticKind::UnresolvedAttribute,
                &line,
                format!("dropping include directive with missing attribute: {}", line.text),
            );
            self.record(record(false));
            return;
        };
        let is_uri = target.starts_with("http://") || target.starts_with("https://");
        if !state.safe_mode.allows_includes() || (is_uri && !state.attributes.is_set("allow-uri-read")) {
            self.record(record(false));
            let mut link = line;
            link.text = format!("link:{target}[role=include]");
            self.push_ready(link);
            return;
        }
        if line.depth >= state.max_include_depth {
            state.diagnostics.error(
                DiagnosticKind::IncludeDepthExceeded,
                &line,
                format!(
                    "maximum include depth of {} exceeded: {}",
                    state.max_include_depth, line.text
                ),
            );
            self.record(record(false));
            return;
        }
        let directory = line
            .file
            .as_deref()
            .and_then(Path::parent)
            .map_or_else(|| state.base_dir.clone(), Path::to_path_buf);
        let request = IncludeRequest {
            target: &target,
            directory: &directory,
            encoding: directive.encoding(),
            depth: line.depth,
        };
        let result = match self.resolver.as_deref_mut() {
            Some(resolver) => resolver.resolve(&request),
            None => Err(IncludeError::Disabled),
        };
        match result {
            Ok(resolved) => {
                self.record(record(true));
                let lines = select(directive, &resolved.path, &resolved.content, line.depth + 1);
                self.splice(directive, &line, lines, state);
            }
            Err(IncludeError::NotFound(_)) if directive.is_optional() => {
                state.diagnostics.info(
                    DiagnosticKind::IncludeUnresolved,
                    &line,
                    format!("optional include dropped because include file not found: {target}"),
                );
                self.record(record(false));
            }
            Err(error) => {
                state.diagnostics.error(
                    DiagnosticKind::IncludeUnresolved,
                    &line,
                    format!("include {target}: {error}"),
                );
                self.record(record(false));
                if !directive.is_optional() {
                    let file = line
                        .file
                        .as_deref()
                        .map_or_else(|| "<stdin>".to_string(), |path| path.display().to_string());
                    let mut placeholder = line;
                    placeholder.text = format!(
                        "Unresolved directive in {file} - include::{}[{}]",
                        directive.target, directive.raw_attributes
                    );
                    self.push_ready(placeholder);
                }
            }
        }
    }

    /// Queues included lines ahead of the rest of the input, wrapped in synthetic
    /// `leveloffset` entries when the directive sets one.
    fn splice(
        &mut self,
        directive: &IncludeDirective,
        line: &Line,
        lines: Vec<Line>,
        state: &ParserState,
    ) {
        let offset = directive.level_offset().map(|offset| {
            let restore = match state.attributes.get("leveloffset") {
                Some(previous) => format!(":leveloffset: {previous}"),
                None => ":leveloffset!:".to_string(),
            };
            (format!(":leveloffset: {offset}"), restore)
        });
        let synthetic = |text: String| {
            let mut synthetic = Line::new(text, line.number, line.file.clone());
            synthetic.synthetic = true;
            synthetic.depth = line.depth;
            synthetic
        };
        if let Some((_, restore)) = &offset {
            self.pending.push_front(synthetic(restore.clone()));
        }
        for included in lines.into_iter().rev() {
            self.pending.push_front(included);
        }
        if let Some((set, _)) = offset {
            self.pending.push_front(synthetic(set));
        }
    }
}

/// Normalizes included content and keeps the lines picked by `lines=` or, failing
/// that, by `tag=` / `tags=`.
fn select(directive: &IncludeDirective, path: &Path, content: &str, depth: usize) -> Vec<Line> {
    let file: Rc<Path> = Rc::from(path);
    let mut lines = normalizer::normalize(content, Some(file));
    for line in &mut lines {
        line.depth = depth;
    }
    if let Some(ranges) = directive.line_ranges() {
        lines.retain(|line| ranges.iter().any(|range: &LinesRange| range.contains(line.number)));
    } else if let Some(tags) = directive.tags() {
        lines = tag::select_tagged(lines, &tag::Filter::parse_list(&tags));
    }
    lines
}

/// A location spanning the given lines.
pub(crate) fn span(first: &Line, last: &Line) -> Location {
    first.location().to(last.location())
}

#[cfg(test)]
mod tests {
    use acdc_core::Backend;
    use pretty_assertions::assert_eq;
    use rustc_hash::FxHashMap;

    use super::*;
    use crate::Options;

    struct MemoryResolver(FxHashMap<&'static str, &'static str>);

    impl IncludeResolver for MemoryResolver {
        fn resolve(&mut self, request: &IncludeRequest<'_>) -> Result<ResolvedInclude, IncludeError> {
            self.0
                .get(request.target)
                .map(|content| ResolvedInclude {
                    path: request.directory.join(request.target),
                    content: (*content).to_string(),
                })
                .ok_or_else(|| IncludeError::NotFound(request.target.into()))
        }
    }

    fn read_all(input: &str, state: &mut ParserState, resolver: Option<&mut dyn IncludeResolver>) -> Vec<String> {
        let mut reader = Reader::new(normalizer::normalize(input, None), resolver);
        let mut out = Vec::new();
        while let Some(line) = reader.next_line(state) {
            out.push(line.text);
        }
        out
    }

    fn state() -> ParserState {
        ParserState::new(&Options::default(), Backend::default())
    }

    #[test]
    fn peeking_stops_at_a_directive_behind_an_entry() {
        let mut state = state();
        let mut reader = Reader::new(normalizer::normalize(":a:\nifdef::a[]\nshown\nendif::[]", None), None);
        assert_eq!(reader.peek(0, &mut state).map(|line| line.text.as_str()), Some(":a:"));
        assert!(reader.peek(1, &mut state).is_none());
        let _ = reader.next_line(&mut state);
        state.attributes.set("a", "");
        assert_eq!(reader.peek(0, &mut state).map(|line| line.text.as_str()), Some("shown"));
    }

    #[test]
    fn false_branches_are_skipped() {
        let mut state = state();
        state.attributes.set("backend-html5", "");
        let lines = read_all(
            "a\nifdef::backend-html5[]\nb\nifndef::backend-html5[]\nc\nendif::[]\nendif::[]\nifdef::nope[]\nd\nendif::nope[]\ne",
            &mut state,
            None,
        );
        assert_eq!(lines, vec!["a", "b", "e"]);
        assert!(state.diagnostics.entries().is_empty());
    }

    #[test]
    fn single_line_form_and_escapes() {
        let mut state = state();
        state.attributes.set("flag", "");
        let lines = read_all(
            "ifdef::flag[Flag is set]\nifdef::nope[Hidden]\n\\ifdef::flag[]\n\\include::x.adoc[]",
            &mut state,
            None,
        );
        assert_eq!(lines, vec!["Flag is set", "ifdef::flag[]", "include::x.adoc[]"]);
    }

    #[test]
    #[tracing_test::traced_test]
    fn mismatched_and_unterminated_conditionals() {
        let mut state = state();
        let lines = read_all("ifdef::a[]\nx\nendif::b[]\nendif::a[]\nendif::[]\nifndef::a[]\ny", &mut state, None);
        assert_eq!(lines, vec!["y"]);
        let kinds: Vec<DiagnosticKind> = state.diagnostics.entries().iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DiagnosticKind::MismatchedEndif,
                DiagnosticKind::MismatchedEndif,
                DiagnosticKind::UnterminatedConditional,
            ]
        );
        assert!(logs_contain("unterminated preprocessor conditional directive"));
    }

    #[test]
    fn includes_splice_lines_with_offsets() {
        let mut state = state();
        let mut resolver = MemoryResolver(FxHashMap::from_iter([
            ("chapter.adoc", "== Chapter\n// tag::body[]\ntext\n// end::body[]\nfooter"),
        ]));
        let lines = read_all(
            "before\ninclude::chapter.adoc[leveloffset=+1]\ninclude::chapter.adoc[tag=body]\ninclude::chapter.adoc[lines=1;5]\nafter",
            &mut state,
            Some(&mut resolver),
        );
        assert_eq!(
            lines,
            vec![
                "before",
                ":leveloffset: +1",
                "== Chapter",
                "// tag::body[]",
                "text",
                "// end::body[]",
                "footer",
                ":leveloffset!:",
                "text",
                "== Chapter",
                "footer",
                "after",
            ]
        );
    }

    #[test]
    fn unresolved_include_leaves_a_placeholder() {
        let mut state = state();
        let mut resolver = MemoryResolver(FxHashMap::default());
        let lines = read_all(
            "include::missing.adoc[]\ninclude::gone.adoc[opts=optional]",
            &mut state,
            Some(&mut resolver),
        );
        assert_eq!(lines, vec!["Unresolved directive in <stdin> - include::missing.adoc[]"]);
        assert_eq!(state.diagnostics.entries().len(), 2);
    }

    #[test]
    fn directives_are_recorded_in_order() {
        let mut state = state();
        let mut reader = Reader::new(
            normalizer::normalize("a\nifdef::x[]\nb\nendif::[]\nc", None),
            None,
        );
        assert_eq!(reader.next_line(&mut state).map(|l| l.text), Some("a".to_string()));
        assert!(reader.take_directives().is_empty());
        assert_eq!(reader.next_line(&mut state).map(|l| l.text), Some("c".to_string()));
        assert_eq!(reader.take_directives().len(), 2);
    }
}
