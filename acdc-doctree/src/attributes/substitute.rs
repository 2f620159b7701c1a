//! `{name}` reference substitution.
use super::{AttributeMissing, AttributeTable};

/// A parsed `{...}` reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Reference<'a> {
    Name(&'a str),
    /// `{counter:name[:start]}`, `{counter2:name[:start]}`. `emit` is false for the
    /// `counter2` form, which increments without printing.
    Counter {
        name: &'a str,
        start: Option<&'a str>,
        emit: bool,
    },
    /// `{set:name}`, `{set:name:value}`, `{set:name!}`.
    Set {
        name: &'a str,
        value: Option<&'a str>,
        unset: bool,
    },
}

impl Reference<'_> {
    pub(crate) fn name(&self) -> &str {
        match self {
            Reference::Name(name)
            | Reference::Counter { name, .. }
            | Reference::Set { name, .. } => name,
        }
    }
}

/// Result of substituting a line of text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Substituted {
    /// `None` when the line must be dropped.
    pub text: Option<String>,
    /// Names of references that could not be resolved, in order.
    pub missing: Vec<String>,
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

pub(crate) fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_name_start) && chars.all(is_name_char)
}

/// Parses the reference at the start of `text`, which must begin with `{`. Returns the
/// reference and the number of bytes it spans, braces included.
pub(crate) fn parse_reference(text: &str) -> Option<(Reference<'_>, usize)> {
    let body = text.strip_prefix('{')?;
    let close = body.find('}')?;
    let inner = body.get(..close)?;
    let consumed = close + 2;
    if let Some(rest) = inner
        .strip_prefix("counter:")
        .map(|rest| (rest, true))
        .or_else(|| inner.strip_prefix("counter2:").map(|rest| (rest, false)))
    {
        let (rest, emit) = rest;
        let (name, start) = match rest.split_once(':') {
            Some((name, start)) => (name, Some(start)),
            None => (rest, None),
        };
        return is_valid_name(name).then_some((Reference::Counter { name, start, emit }, consumed));
    }
    if let Some(rest) = inner.strip_prefix("set:") {
        let (name, value) = match rest.split_once(':') {
            Some((name, value)) => (name, Some(value)),
            None => (rest, None),
        };
        let (name, unset) = match name.strip_suffix('!') {
            Some(name) => (name, true),
            None => (name, false),
        };
        return is_valid_name(name).then_some((Reference::Set { name, value, unset }, consumed));
    }
    is_valid_name(inner).then_some((Reference::Name(inner), consumed))
}

impl AttributeTable {
    /// Resolves one reference, applying the side effects of counters and `set`.
    /// Returns `None` only for a plain reference to a missing attribute.
    pub(crate) fn resolve(&mut self, reference: &Reference<'_>) -> Option<String> {
        match *reference {
            Reference::Name(name) => self.get(name).map(ToString::to_string),
            Reference::Counter { name, start, emit } => {
                let value = self.increment_counter(name, start);
                Some(if emit { value } else { String::new() })
            }
            Reference::Set { name, value, unset } => {
                if unset {
                    self.unset(name);
                } else {
                    self.set(name, value.unwrap_or_default());
                }
                Some(String::new())
            }
        }
    }

    fn increment_counter(&mut self, name: &str, start: Option<&str>) -> String {
        let next = match self.get(name) {
            Some(current) => next_counter_value(current),
            None => start.unwrap_or("1").to_string(),
        };
        self.set(name, next.clone());
        next
    }

    /// Replaces every `{name}` reference in `text` according to the policy in force.
    pub fn substitute(&mut self, text: &str) -> Substituted {
        let policy = self.attribute_missing();
        let mut missing = Vec::new();
        if !text.contains('{') {
            return Substituted {
                text: Some(text.to_string()),
                missing,
            };
        }
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(open) = rest.find('{') {
            let (before, from_brace) = rest.split_at(open);
            let Some((reference, consumed)) = parse_reference(from_brace) else {
                out.push_str(before);
                out.push('{');
                rest = from_brace.get(1..).unwrap_or_default();
                continue;
            };
            let raw = from_brace.get(..consumed).unwrap_or_default();
            rest = from_brace.get(consumed..).unwrap_or_default();
            if let Some(escaped) = before.strip_suffix('\\') {
                out.push_str(escaped);
                out.push_str(raw);
                continue;
            }
            out.push_str(before);
            match self.resolve(&reference) {
                Some(value) => out.push_str(&value),
                None => {
                    missing.push(reference.name().to_string());
                    match policy {
                        AttributeMissing::Skip | AttributeMissing::Warn => out.push_str(raw),
                        AttributeMissing::Drop => {}
                        AttributeMissing::DropLine => {
                            return Substituted {
                                text: None,
                                missing,
                            };
                        }
                    }
                }
            }
        }
        out.push_str(rest);
        Substituted {
            text: Some(out),
            missing,
        }
    }
}

fn next_counter_value(current: &str) -> String {
    if let Ok(number) = current.parse::<i64>() {
        // past the largest counter the count restarts
        return number.checked_add(1).map_or_else(|| "1".to_string(), |next| next.to_string());
    }
    let mut chars = current.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() && c != 'z' && c != 'Z' => {
            char::from(u8::try_from(u32::from(c) + 1).unwrap_or(b'a')).to_string()
        }
        _ => "1".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn table() -> AttributeTable {
        let mut table = AttributeTable::default();
        table.set("weight", "heavy");
        table.set("mass", "big");
        table
    }

    #[test]
    fn resolves_known_references() {
        let mut table = table();
        let result = table.substitute("{weight} and {mass}");
        assert_eq!(result.text.as_deref(), Some("heavy and big"));
        assert!(result.missing.is_empty());
    }

    #[rstest::rstest]
    #[case("skip", Some("value {volume}"))]
    #[case("warn", Some("value {volume}"))]
    #[case("drop", Some("value "))]
    #[case("drop-line", None)]
    fn missing_reference_policies(#[case] policy: &str, #[case] expected: Option<&str>) {
        let mut table = table();
        table.set("attribute-missing", policy);
        let result = table.substitute("value {volume}");
        assert_eq!(result.text.as_deref(), expected);
        assert_eq!(result.missing, vec!["volume".to_string()]);
    }

    #[test]
    fn escaped_reference_is_literal() {
        let mut table = table();
        let result = table.substitute(r"\{weight} is {weight}");
        assert_eq!(result.text.as_deref(), Some("{weight} is heavy"));
    }

    #[test]
    fn braces_that_are_not_references_pass_through() {
        let mut table = table();
        let result = table.substitute("fn main() { {weight} }");
        assert_eq!(result.text.as_deref(), Some("fn main() { heavy }"));
    }

    #[test]
    fn counters_increment() {
        let mut table = AttributeTable::default();
        let result = table.substitute("{counter:n} {counter:n} {counter2:n}{n}");
        assert_eq!(result.text.as_deref(), Some("1 2 3"));
        let result = table.substitute("{counter:letter:a}{counter:letter}");
        assert_eq!(result.text.as_deref(), Some("ab"));
    }

    #[test]
    fn counter_at_largest_value_restarts() {
        let mut table = AttributeTable::default();
        table.set("n", i64::MAX.to_string());
        let result = table.substitute("{counter:n}");
        assert_eq!(result.text.as_deref(), Some("1"));
    }

    #[test]
    fn set_directive_changes_table() {
        let mut table = table();
        let result = table.substitute("{set:color:red}{color} {set:weight!}{weight}");
        assert_eq!(result.text.as_deref(), Some("red {weight}"));
        assert_eq!(table.get("weight"), None);
    }
}
