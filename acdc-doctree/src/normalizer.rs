//! Line normalizer: raw text in, numbered logical lines out.
//!
//! Tabs expand to the next multiple-of-8 column, trailing whitespace is dropped and
//! each line is tagged blank or content up front. No other decision is made here.
use std::{path::Path, rc::Rc};

use crate::model::Location;

const TAB_WIDTH: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LineKind {
    Blank,
    Content,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Line {
    pub(crate) text: String,
    /// 1-based line number within `file` (or the main input).
    pub(crate) number: usize,
    pub(crate) kind: LineKind,
    pub(crate) file: Option<Rc<Path>>,
    /// Lines spliced in by the reader itself, such as `leveloffset` bookkeeping
    /// around an include. They are applied but never produce nodes.
    pub(crate) synthetic: bool,
    /// Include nesting depth, 0 for the main input.
    pub(crate) depth: usize,
}

impl Line {
    pub(crate) fn new(text: impl Into<String>, number: usize, file: Option<Rc<Path>>) -> Self {
        let text = text.into();
        let kind = if text.is_empty() {
            LineKind::Blank
        } else {
            LineKind::Content
        };
        Self {
            text,
            number,
            kind,
            file,
            synthetic: false,
            depth: 0,
        }
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.kind == LineKind::Blank
    }

    /// Number of leading spaces.
    pub(crate) fn indent(&self) -> usize {
        self.text.len() - self.text.trim_start_matches(' ').len()
    }

    pub(crate) fn location(&self) -> Location {
        Location::line(self.number, self.text.chars().count())
    }
}

impl AsRef<str> for Line {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Splits `input` into normalized lines, numbering from 1.
pub(crate) fn normalize(input: &str, file: Option<Rc<Path>>) -> Vec<Line> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    input
        .lines()
        .enumerate()
        .map(|(index, raw)| Line::new(normalize_line(raw), index + 1, file.clone()))
        .collect()
}

/// Expands tabs and strips trailing whitespace from one physical line.
pub(crate) fn normalize_line(raw: &str) -> String {
    if !raw.contains('\t') {
        return raw.trim_end().to_string();
    }
    let mut out = String::with_capacity(raw.len() + TAB_WIDTH);
    let mut column = 0;
    for ch in raw.chars() {
        if ch == '\t' {
            let spaces = TAB_WIDTH - (column % TAB_WIDTH);
            out.extend(std::iter::repeat_n(' ', spaces));
            column += spaces;
        } else {
            out.push(ch);
            column += 1;
        }
    }
    out.truncate(out.trim_end().len());
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn tabs_expand_to_next_multiple_of_eight() {
        assert_eq!(normalize_line("\tx"), "        x");
        assert_eq!(normalize_line("abc\tx"), "abc     x");
        assert_eq!(normalize_line("12345678\tx"), "12345678        x");
    }

    #[test]
    fn blank_lines_are_tagged() {
        let lines = normalize("\u{feff}= Title\r\n   \r\ntext\t\n", None);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines.first().map(|l| l.text.as_str()), Some("= Title"));
        assert_eq!(lines.get(1).map(Line::is_blank), Some(true));
        assert_eq!(lines.get(2).map(|l| (l.text.as_str(), l.number)), Some(("text", 3)));
    }

    #[test]
    fn indent_counts_leading_spaces() {
        assert_eq!(Line::new("   * item", 1, None).indent(), 3);
        assert_eq!(Line::new("* item", 1, None).indent(), 0);
    }
}
