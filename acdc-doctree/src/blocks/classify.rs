//! Line shapes the block engine dispatches on. Each function looks at one line (or a
//! line and its successor) and never consumes anything.
use crate::model::{DelimitedKind, ListKind, Numbering, TableFormat};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum FenceKind {
    Delimited(DelimitedKind),
    /// A markdown-style code fence, with the language after the backticks.
    Fenced(Option<String>),
    Comment,
    Table(TableFormat, char),
}

/// An opening fence. The closing fence is the same text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Fence {
    pub(crate) kind: FenceKind,
    pub(crate) text: String,
}

impl Fence {
    pub(crate) fn closes(&self, line: &str) -> bool {
        match &self.kind {
            FenceKind::Fenced(_) => line.trim_end() == self.text.trim_end_matches(|c| c != '`'),
            FenceKind::Delimited(_) | FenceKind::Comment | FenceKind::Table(..) => line == self.text,
        }
    }

    pub(crate) fn length(&self) -> usize {
        match &self.kind {
            FenceKind::Fenced(_) => self.text.chars().take_while(|&c| c == '`').count(),
            FenceKind::Delimited(_) | FenceKind::Comment | FenceKind::Table(..) => {
                self.text.chars().count()
            }
        }
    }
}

pub(crate) fn fence(line: &str) -> Option<Fence> {
    let fence = |kind| {
        Some(Fence {
            kind,
            text: line.to_string(),
        })
    };
    if line == "--" {
        return fence(FenceKind::Delimited(DelimitedKind::Open));
    }
    if let Some(rest) = line.strip_prefix("```") {
        let language = rest.trim_start_matches('`');
        if language.contains(char::is_whitespace) {
            return None;
        }
        return fence(FenceKind::Fenced(
            (!language.is_empty()).then(|| language.to_string()),
        ));
    }
    let mut chars = line.chars();
    let first = chars.next()?;
    if matches!(first, '|' | ',' | ':' | '!') {
        let rest = chars.as_str();
        if rest.len() >= 3 && rest.chars().all(|c| c == '=') {
            let format = match first {
                ',' => TableFormat::Csv,
                ':' => TableFormat::Dsv,
                _ => TableFormat::Psv,
            };
            return fence(FenceKind::Table(format, first));
        }
        return None;
    }
    if line.chars().count() < 4 || !line.chars().all(|c| c == first) {
        return None;
    }
    let kind = match first {
        '-' => FenceKind::Delimited(DelimitedKind::Listing),
        '.' => FenceKind::Delimited(DelimitedKind::Literal),
        '=' => FenceKind::Delimited(DelimitedKind::Example),
        '*' => FenceKind::Delimited(DelimitedKind::Sidebar),
        '_' => FenceKind::Delimited(DelimitedKind::Quote),
        '+' => FenceKind::Delimited(DelimitedKind::Pass),
        '/' => FenceKind::Comment,
        _ => return None,
    };
    fence(kind)
}

/// A line comment, `// text`. Four or more slashes open a comment block instead.
pub(crate) fn line_comment(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("//")?;
    if rest.starts_with('/') {
        return None;
    }
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/// `== Title` (or `## Title`): the number of marks and the title text.
pub(crate) fn heading(line: &str) -> Option<(usize, &str)> {
    let mark = line.chars().next().filter(|&c| c == '=' || c == '#')?;
    let marks = line.chars().take_while(|&c| c == mark).count();
    if marks > 6 {
        return None;
    }
    let title = line.get(marks..)?.strip_prefix(' ')?.trim();
    if title.is_empty() {
        return None;
    }
    // Symmetric form: `== Title ==`.
    let title = title
        .strip_suffix(&mark.to_string().repeat(marks))
        .map_or(title, str::trim_end);
    (!title.is_empty()).then_some((marks, title))
}

/// The level of a two-line title when `underline` matches `title` in length.
pub(crate) fn setext_level(title: &str, underline: &str) -> Option<usize> {
    let mark = underline.chars().next()?;
    let level = match mark {
        '=' => 0,
        '-' => 1,
        '~' => 2,
        '^' => 3,
        '+' => 4,
        _ => return None,
    };
    let length = underline.chars().count();
    if length < 2 || !underline.chars().all(|c| c == mark) {
        return None;
    }
    if !title.chars().next().is_some_and(|c| c.is_alphanumeric() || c == '_')
        || title.chars().count() != length
        || list_marker(title).is_some()
    {
        return None;
    }
    Some(level)
}

pub(crate) fn is_thematic_break(line: &str) -> bool {
    matches!(
        line,
        "'''" | "---" | "- - -" | "***" | "* * *" | "___" | "_ _ _"
    )
}

pub(crate) fn is_page_break(line: &str) -> bool {
    line == "<<<"
}

pub(crate) fn is_continuation(line: &str) -> bool {
    line == "+"
}

/// A block title line, `.Title`.
pub(crate) fn block_title(line: &str) -> Option<&str> {
    let title = line.strip_prefix('.')?;
    let first = title.chars().next()?;
    if first == '.' || first.is_whitespace() {
        return None;
    }
    Some(title)
}

/// `name::target[attributes]`: name, target and the text between the brackets.
pub(crate) fn block_macro(line: &str) -> Option<(&str, &str, &str)> {
    let (name, rest) = line.split_once("::")?;
    if name.is_empty()
        || !name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return None;
    }
    let open = rest.find('[')?;
    let target = rest.get(..open)?;
    if target.contains(char::is_whitespace) {
        return None;
    }
    let attributes = rest.get(open + 1..)?.strip_suffix(']')?;
    Some((name, target, attributes))
}

/// Which marker family an item belongs to. Items of the same family at the same
/// nesting are siblings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MarkerKey {
    /// `*` repeated, the count being the depth.
    Star(usize),
    Dash,
    /// `.` repeated.
    Dot(usize),
    Explicit(Numbering),
    /// `::`, `:::` or `::::`.
    Colons(usize),
    Semicolons,
    Callout,
}

impl MarkerKey {
    /// Depth is only expressed by indent for these families.
    pub(crate) fn nests_by_indent(self) -> bool {
        matches!(self, MarkerKey::Dash | MarkerKey::Explicit(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ListMarker {
    pub(crate) kind: ListKind,
    pub(crate) key: MarkerKey,
    pub(crate) marker: String,
    pub(crate) indent: usize,
    /// Item text, or for description items the text after the marker.
    pub(crate) text: String,
    /// Description items only.
    pub(crate) term: Option<String>,
    pub(crate) ordinal: Option<u32>,
}

pub(crate) fn list_marker(line: &str) -> Option<ListMarker> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    let body = line.trim_start_matches(' ');
    unordered(body, indent)
        .or_else(|| ordered(body, indent))
        .or_else(|| callout(body, indent))
        .or_else(|| description(body, indent))
}

fn item(kind: ListKind, key: MarkerKey, marker: &str, indent: usize, text: &str) -> ListMarker {
    ListMarker {
        kind,
        key,
        marker: marker.to_string(),
        indent,
        text: text.trim().to_string(),
        term: None,
        ordinal: None,
    }
}

fn split_marker(body: &str, marker_len: usize) -> Option<(&str, &str)> {
    let marker = body.get(..marker_len)?;
    let text = body.get(marker_len..)?.strip_prefix(' ')?;
    (!text.trim().is_empty()).then_some((marker, text))
}

fn unordered(body: &str, indent: usize) -> Option<ListMarker> {
    let stars = body.chars().take_while(|&c| c == '*').count();
    if (1..=5).contains(&stars) {
        let (marker, text) = split_marker(body, stars)?;
        return Some(item(ListKind::Unordered, MarkerKey::Star(stars), marker, indent, text));
    }
    if body.starts_with('-') {
        let (marker, text) = split_marker(body, 1)?;
        return Some(item(ListKind::Unordered, MarkerKey::Dash, marker, indent, text));
    }
    None
}

fn ordered(body: &str, indent: usize) -> Option<ListMarker> {
    let dots = body.chars().take_while(|&c| c == '.').count();
    if (1..=5).contains(&dots) {
        let (marker, text) = split_marker(body, dots)?;
        return Some(item(ListKind::Ordered, MarkerKey::Dot(dots), marker, indent, text));
    }
    let (marker, _) = body.split_once(' ')?;
    let (numbering, ordinal) = explicit_ordinal(marker)?;
    let (marker, text) = split_marker(body, marker.len())?;
    let mut found = item(
        ListKind::Ordered,
        MarkerKey::Explicit(numbering),
        marker,
        indent,
        text,
    );
    found.ordinal = Some(ordinal);
    Some(found)
}

/// Parses `1.`, `a.`, `A.`, `iv)` or `IV)` into its numbering style and ordinal.
pub(crate) fn explicit_ordinal(marker: &str) -> Option<(Numbering, u32)> {
    if let Some(number) = marker.strip_suffix('.') {
        if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) {
            return Some((Numbering::Arabic, number.parse().ok()?));
        }
        let mut chars = number.chars();
        let letter = chars.next()?;
        if chars.next().is_none() && letter.is_ascii_alphabetic() {
            let numbering = if letter.is_ascii_lowercase() {
                Numbering::LowerAlpha
            } else {
                Numbering::UpperAlpha
            };
            let ordinal = u32::from(letter.to_ascii_lowercase()) - u32::from('a') + 1;
            return Some((numbering, ordinal));
        }
        return None;
    }
    let roman = marker.strip_suffix(')')?;
    let numbering = if roman.chars().all(|c| "ivx".contains(c)) {
        Numbering::LowerRoman
    } else if roman.chars().all(|c| "IVX".contains(c)) {
        Numbering::UpperRoman
    } else {
        return None;
    };
    Some((numbering, roman_value(roman)?))
}

fn roman_value(numeral: &str) -> Option<u32> {
    let digit = |c: char| match c.to_ascii_lowercase() {
        'i' => Some(1),
        'v' => Some(5),
        'x' => Some(10),
        _ => None,
    };
    let values = numeral.chars().map(digit).collect::<Option<Vec<i64>>>()?;
    if values.is_empty() {
        return None;
    }
    let mut total: i64 = 0;
    for (i, &value) in values.iter().enumerate() {
        if values.get(i + 1).is_some_and(|&next| next > value) {
            total -= value;
        } else {
            total += value;
        }
    }
    u32::try_from(total).ok().filter(|&total| total > 0)
}

fn callout(body: &str, indent: usize) -> Option<ListMarker> {
    if indent > 0 {
        return None;
    }
    let (_, text) = crate::callouts::parse_list_item(body)?;
    let marker_end = body.find('>')? + 1;
    let marker = body.get(..marker_end)?;
    Some(item(ListKind::Callout, MarkerKey::Callout, marker, indent, text))
}

fn description(body: &str, indent: usize) -> Option<ListMarker> {
    if body.starts_with(':') || body.starts_with(';') {
        return None;
    }
    let mut search = 0;
    while let Some(found) = body.get(search..)?.find([':', ';']) {
        let start = search + found;
        let rest = body.get(start..)?;
        let mark = rest.chars().next()?;
        let run = rest.chars().take_while(|&c| c == mark).count();
        let end = start + run;
        let after = body.get(end..)?;
        let followed = after.is_empty() || after.starts_with(' ');
        let key = match (mark, run) {
            (':', 2..=4) => Some(MarkerKey::Colons(run - 1)),
            (';', 2) => Some(MarkerKey::Semicolons),
            _ => None,
        };
        if let Some(key) = key.filter(|_| followed) {
            let term = body.get(..start)?.trim_end();
            if term.is_empty() {
                return None;
            }
            let marker = body.get(start..end)?;
            let mut found = item(ListKind::Description, key, marker, indent, after);
            found.term = Some(term.to_string());
            return Some(found);
        }
        search = end;
    }
    None
}

/// A checklist box at the start of unordered item text: `[ ]`, `[x]` or `[*]`.
pub(crate) fn checkbox(text: &str) -> Option<(bool, &str)> {
    let (checked, rest) = if let Some(rest) = text.strip_prefix("[ ]") {
        (false, rest)
    } else if let Some(rest) = text
        .strip_prefix("[x]")
        .or_else(|| text.strip_prefix("[X]"))
        .or_else(|| text.strip_prefix("[*]"))
    {
        (true, rest)
    } else {
        return None;
    };
    let rest = rest.strip_prefix(' ')?;
    Some((checked, rest))
}
