//! Callout engine: finds `<N>` markers at the end of verbatim lines and correlates
//! them with the callout list that explains them.
use serde::Serialize;

use crate::model::{CalloutTarget, Location};

/// Which comment prefix may stand in front of the callout markers of a line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum CommentPrefix {
    /// Any of `-#`, `//`, `#`, `--`, `;;`.
    Any,
    Exact(String),
    /// Markers only; nothing is stripped in front of them.
    Disabled,
}

const KNOWN_PREFIXES: [&str; 5] = ["-#", "//", "#", "--", ";;"];

impl CommentPrefix {
    /// The prefix for a block, from its `line-comment` attribute or its language.
    pub(crate) fn for_block(line_comment: Option<&str>, language: Option<&str>) -> Self {
        if let Some(line_comment) = line_comment {
            return if line_comment.trim().is_empty() {
                CommentPrefix::Disabled
            } else {
                CommentPrefix::Exact(line_comment.trim().to_string())
            };
        }
        let prefix = match language.map(str::to_lowercase).as_deref() {
            Some(
                "ruby" | "python" | "py" | "shell" | "sh" | "bash" | "zsh" | "console" | "yaml"
                | "yml" | "perl" | "r" | "toml" | "make" | "makefile" | "dockerfile"
                | "powershell" | "coffeescript" | "elixir" | "nim",
            ) => "#",
            Some(
                "c" | "cpp" | "c++" | "java" | "javascript" | "js" | "typescript" | "ts"
                | "rust" | "go" | "csharp" | "c#" | "kotlin" | "scala" | "swift" | "groovy"
                | "php" | "dart" | "json5" | "zig",
            ) => "//",
            Some("sql" | "haskell" | "lua" | "ada" | "elm" | "vhdl") => "--",
            Some("lisp" | "clojure" | "scheme" | "elisp" | "emacs-lisp" | "racket") => ";;",
            Some("haml") => "-#",
            Some(_) | None => return CommentPrefix::Any,
        };
        CommentPrefix::Exact(prefix.to_string())
    }

    fn strip<'a>(&self, code: &'a str) -> &'a str {
        let stripped = match self {
            CommentPrefix::Disabled => None,
            CommentPrefix::Exact(prefix) => code.strip_suffix(prefix.as_str()),
            CommentPrefix::Any => KNOWN_PREFIXES
                .iter()
                .find_map(|prefix| code.strip_suffix(prefix)),
        };
        stripped.map_or(code, str::trim_end)
    }
}

/// A callout marker as written: `<3>` or the auto-numbered `<.>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mark {
    Number(usize),
    Auto,
}

fn parse_mark(inner: &str) -> Option<Mark> {
    if inner == "." {
        return Some(Mark::Auto);
    }
    if inner.is_empty() || !inner.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    inner.parse().ok().map(Mark::Number)
}

/// Splits the last marker off `text`: `<N>`, `<.>` or `<!--N-->`.
fn strip_marker(text: &str) -> Option<(&str, Mark)> {
    if let Some(body) = text.strip_suffix("-->") {
        let open = body.rfind("<!--")?;
        let mark = parse_mark(body.get(open + 4..)?)?;
        return Some((body.get(..open)?, mark));
    }
    let body = text.strip_suffix('>')?;
    let open = body.rfind('<')?;
    let mark = parse_mark(body.get(open + 1..)?)?;
    Some((body.get(..open)?, mark))
}

/// The callout markers found at the end of one verbatim line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct LineCallouts {
    pub(crate) marks: Vec<Mark>,
    /// Byte offset where the annotation starts, comment prefix included.
    pub(crate) column: usize,
}

/// Finds trailing callout markers. Markers are only recognized at the end of the
/// line; an escaped marker (`\<1>`) and anything in front of it is code.
pub(crate) fn scan_line(line: &str, prefix: &CommentPrefix) -> Option<LineCallouts> {
    let mut rest = line.trim_end();
    let mut marks = Vec::new();
    while let Some((before, mark)) = strip_marker(rest) {
        if before.ends_with('\\') {
            break;
        }
        marks.push(mark);
        rest = before.trim_end();
    }
    if marks.is_empty() {
        return None;
    }
    marks.reverse();
    Some(LineCallouts {
        marks,
        column: prefix.strip(rest).len(),
    })
}

/// Parses a callout list item line, `<1> text` or `<.> text`.
pub(crate) fn parse_list_item(line: &str) -> Option<(Mark, &str)> {
    let body = line.strip_prefix('<')?;
    let close = body.find('>')?;
    let mark = parse_mark(body.get(..close)?)?;
    let text = body.get(close + 1..)?;
    if !text.starts_with(' ') || text.trim().is_empty() {
        return None;
    }
    Some((mark, text.trim()))
}

/// One callout inside a verbatim block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CalloutMark {
    /// 1-based line inside the block.
    pub line: usize,
    pub number: usize,
    /// Byte offset in the line where the annotation starts.
    pub column: usize,
}

/// The callouts of one verbatim block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ListingCallouts {
    pub location: Location,
    pub marks: Vec<CalloutMark>,
}

/// What a callout list item resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ResolvedItem {
    pub(crate) number: usize,
    pub(crate) expected: usize,
    pub(crate) targets: Vec<CalloutTarget>,
}

/// Every verbatim block with its callout marks, by listing index.
///
/// Listings recorded since the last callout list are the ones the next callout list
/// explains.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CalloutTable {
    listings: Vec<ListingCallouts>,
    #[serde(skip)]
    unexplained: Vec<usize>,
    #[serde(skip)]
    last_item: usize,
}

impl CalloutTable {
    /// Records the callouts of a verbatim block and returns its listing index.
    pub(crate) fn record(&mut self, location: Location, lines: &[String], prefix: &CommentPrefix) -> usize {
        let mut auto = 0;
        let marks = lines
            .iter()
            .enumerate()
            .filter_map(|(index, line)| Some((index, scan_line(line, prefix)?)))
            .flat_map(|(index, found)| {
                let column = found.column;
                found.marks.into_iter().map(move |mark| (index, column, mark))
            })
            .map(|(index, column, mark)| {
                let number = match mark {
                    Mark::Number(number) => number,
                    Mark::Auto => {
                        auto += 1;
                        auto
                    }
                };
                CalloutMark {
                    line: index + 1,
                    number,
                    column,
                }
            })
            .collect::<Vec<_>>();
        let listing = self.listings.len();
        if !marks.is_empty() {
            self.unexplained.push(listing);
        }
        self.listings.push(ListingCallouts { location, marks });
        listing
    }

    /// Resolves the next item of the callout list being read.
    pub(crate) fn resolve_item(&mut self, mark: Mark) -> ResolvedItem {
        let expected = self.last_item + 1;
        let number = match mark {
            Mark::Number(number) => number,
            Mark::Auto => expected,
        };
        self.last_item = number;
        let targets = self
            .unexplained
            .iter()
            .filter_map(|&listing| Some((listing, self.listings.get(listing)?)))
            .flat_map(|(listing, callouts)| {
                callouts
                    .marks
                    .iter()
                    .filter(move |m| m.number == number)
                    .map(move |m| CalloutTarget {
                        listing,
                        line: m.line,
                    })
            })
            .collect();
        ResolvedItem {
            number,
            expected,
            targets,
        }
    }

    /// Ends the callout list being read; the listings it explained are done.
    pub(crate) fn finish_list(&mut self) {
        self.unexplained.clear();
        self.last_item = 0;
    }

    #[must_use]
    pub fn get(&self, listing: usize) -> Option<&ListingCallouts> {
        self.listings.get(listing)
    }

    /// Listings in document order; the position is the listing index.
    pub fn iter(&self) -> impl Iterator<Item = &ListingCallouts> {
        self.listings.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}
