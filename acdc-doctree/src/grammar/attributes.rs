//! Attribute entry lines (`:name: value`) and block attribute lists (`[...]`).
use crate::model::{AttributeList, AttributeListEntry, Shorthand};

/// A parsed `:name: value` line. `value` is `None` for `:name!:` / `:!name:`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct EntryLine<'a> {
    pub(crate) name: &'a str,
    pub(crate) value: Option<&'a str>,
}

enum ShorthandPart<'a> {
    Id(&'a str),
    Role(&'a str),
    Option(&'a str),
}

peg::parser! {
    grammar attribute_parser() for str {
        pub(crate) rule entry() -> EntryLine<'input>
            = ":" "!" name:name() ":" ![_] { EntryLine { name, value: None } }
            / ":" name:name() "!" ":" ![_] { EntryLine { name, value: None } }
            / ":" name:name() ":" value:(whitespace() v:$([_]*) { v })? ![_] {
                EntryLine { name, value: Some(value.unwrap_or_default()) }
            }

        rule name() -> &'input str
            = $(['a'..='z' | 'A'..='Z' | '0'..='9' | '_'] ['a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_']*)

        rule whitespace() = quiet!{[' ']+}

        pub(crate) rule entries() -> Vec<AttributeListEntry>
            = first:first_entry() rest:("," e:list_entry() { e })* {
                std::iter::once(first).chain(rest).collect()
            }

        rule first_entry() -> AttributeListEntry
            = named() / shorthand() / positional()

        rule list_entry() -> AttributeListEntry
            = named() / positional()

        rule named() -> AttributeListEntry
            = sp() name:$(['a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-']+) sp() "=" value:value() {
                AttributeListEntry::Named { name: name.to_string(), value }
            }

        rule positional() -> AttributeListEntry
            = value:value() { AttributeListEntry::Positional { value } }

        rule shorthand() -> AttributeListEntry
            = sp() style:$((!['#' | '.' | '%' | ',' | ' ' | '"' | '\''] [_])*) parts:shorthand_part()+ sp() &("," / ![_]) {
                let mut shorthand = Shorthand {
                    style: (!style.is_empty()).then(|| style.to_string()),
                    ..Shorthand::default()
                };
                for part in parts {
                    match part {
                        ShorthandPart::Id(id) => shorthand.id = Some(id.to_string()),
                        ShorthandPart::Role(role) => shorthand.roles.push(role.to_string()),
                        ShorthandPart::Option(option) => shorthand.options.push(option.to_string()),
                    }
                }
                AttributeListEntry::Shorthand(shorthand)
            }

        rule shorthand_part() -> ShorthandPart<'input>
            = "#" id:shorthand_value() { ShorthandPart::Id(id) }
            / "." role:shorthand_value() { ShorthandPart::Role(role) }
            / "%" option:shorthand_value() { ShorthandPart::Option(option) }

        rule shorthand_value() -> &'input str
            = $((!['#' | '.' | '%' | ',' | ' '] [_])+)

        rule value() -> String
            = sp() "\"" v:$(("\\\"" / [^'"'])*) "\"" sp() &("," / ![_]) { v.replace("\\\"", "\"") }
            / sp() "'" v:$(("\\'" / [^'\''])*) "'" sp() &("," / ![_]) { v.replace("\\'", "'") }
            / v:$([^',']*) { v.trim().to_string() }

        rule sp() = quiet!{[' ']*}
    }
}

pub(crate) fn parse_entry(line: &str) -> Option<EntryLine<'_>> {
    attribute_parser::entry(line).ok()
}

/// Whether a line has the shape of a block attribute list.
pub(crate) fn is_attribute_list_line(line: &str) -> bool {
    let Some(inner) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) else {
        return false;
    };
    match inner.chars().next() {
        None => true,
        Some(c) => {
            (c.is_alphanumeric() || matches!(c, '_' | '.' | '#' | '%' | '{' | ',' | '"' | '\''))
                && !inner.starts_with('[')
        }
    }
}

/// Parses the text between the brackets of an attribute list.
pub(crate) fn parse_attribute_list(inner: &str) -> AttributeList {
    if inner.trim().is_empty() {
        return AttributeList::default();
    }
    match attribute_parser::entries(inner) {
        Ok(entries) => AttributeList { entries },
        Err(error) => {
            tracing::debug!(%error, inner, "attribute list did not parse, keeping it positional");
            AttributeList {
                entries: vec![AttributeListEntry::Positional {
                    value: inner.trim().to_string(),
                }],
            }
        }
    }
}
