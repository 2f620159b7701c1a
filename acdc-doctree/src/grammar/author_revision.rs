//! Author and revision lines of the document header.
use crate::model::{Author, Revision};

peg::parser! {
    grammar author_parser() for str {
        /// One `;`-separated author: `First Middle Last <email>`.
        pub rule author() -> (&'input str, Option<&'input str>)
            = name:$((!(ws() "<") [_])+) email:(ws() "<" e:$([^'>']+) ">" { e })? ws() ![_] {
                (name.trim(), email)
            }

        /// `[prefix]number, date: remark` with every part optional. A lone token is
        /// the number only when shaped like `v1.2`; anything else is the date.
        pub rule revision() -> Option<Revision>
            = version_prefix() number:$([^',']*) "," date:revision_date() remark:revision_remark()? ![_] {
                assemble_revision(Some(number), date, remark)
            }
            / "v" number:$(digits() ++ ".") ws() remark:revision_remark()? ![_] {
                assemble_revision(Some(number), "", remark)
            }
            / !":" date:revision_date() remark:revision_remark()? ![_] {
                assemble_revision(None, date, remark)
            }

        rule version_prefix() = (!['0'..='9' | '{' | ','] [_])*

        rule revision_date() -> &'input str
            = $([^':']*)

        rule revision_remark() -> &'input str
            = ":" remark:$([_]*) { remark }

        rule digits() = ['0'..='9']+

        rule ws() = [' ']*
    }
}

fn assemble_revision(number: Option<&str>, date: &str, remark: Option<&str>) -> Option<Revision> {
    let non_empty = |text: &str| (!text.is_empty()).then(|| text.to_string());
    let revision = Revision {
        number: number.map(str::trim).and_then(non_empty),
        date: non_empty(date.trim()),
        remark: remark.map(str::trim).and_then(non_empty),
    };
    (revision != Revision::default()).then_some(revision)
}

pub(crate) fn generate_initials(first: &str, middle: Option<&str>, last: Option<&str>) -> String {
    [Some(first), middle, last]
        .into_iter()
        .flatten()
        .filter_map(|part| part.chars().next())
        .collect()
}

/// Parses a header author line into its authors. Names split on whitespace into
/// first, middle and last, extra words joining the last name. Underscores stand for
/// spaces inside a name part.
pub(crate) fn parse_authors(line: &str) -> Vec<Author> {
    line.split(';')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(parse_author)
        .collect()
}

pub(crate) fn parse_author(segment: &str) -> Author {
    let (name, email) = author_parser::author(segment).unwrap_or((segment.trim(), None));
    let mut parts = name.split_whitespace().map(|part| part.replace('_', " "));
    let first_name = parts.next().unwrap_or_default();
    let middle = parts.next();
    let rest: Vec<String> = parts.collect();
    let (middle_name, last_name) = match (middle, rest.is_empty()) {
        (None, _) => (None, None),
        (Some(last), true) => (None, Some(last)),
        (Some(middle), false) => (Some(middle), Some(rest.join(" "))),
    };
    Author {
        initials: generate_initials(&first_name, middle_name.as_deref(), last_name.as_deref()),
        first_name,
        middle_name,
        last_name,
        email: email.map(ToString::to_string),
    }
}

/// Parses a revision line, `None` when it carries nothing.
pub(crate) fn parse_revision(line: &str) -> Option<Revision> {
    author_parser::revision(line).ok().flatten()
}
