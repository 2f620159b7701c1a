//! Attribute entries, `:name: value`, in the header and the body.
use super::Parser;
use crate::{
    diagnostic::DiagnosticKind,
    grammar::attributes::parse_entry,
    model::{AttributeEntry, AttributeReset, Block},
    normalizer::Line,
};

/// An entry as read, before its value is substituted.
#[derive(Debug)]
pub(crate) struct RawEntry {
    pub(crate) name: String,
    /// `None` for `:name!:` and `:!name:`.
    pub(crate) value: Option<String>,
    pub(crate) first: Line,
    pub(crate) last: Line,
}

impl Parser<'_> {
    /// Reads an entry line and the lines its value wraps onto with a trailing ` \`.
    /// Hands the line back when it is not an entry.
    pub(crate) fn read_entry(&mut self, first: Line) -> Result<RawEntry, Line> {
        let Some(entry) = parse_entry(&first.text) else {
            return Err(first);
        };
        let name = entry.name.to_string();
        let mut value = entry.value.map(ToString::to_string);
        let mut last = first.clone();
        if let Some(value) = value.as_mut() {
            while let Some(stripped) = value.strip_suffix('\\').filter(|s| s.ends_with(' ')) {
                let stripped = stripped.trim_end().to_string();
                if !self.peek_is(0, |line| !line.is_blank()) {
                    *value = stripped;
                    break;
                }
                let Some(next) = self.next_line() else {
                    *value = stripped;
                    break;
                };
                let wrapped = next.text.trim();
                *value = if stripped.is_empty() {
                    wrapped.to_string()
                } else {
                    format!("{stripped} {wrapped}")
                };
                last = next;
            }
        }
        Ok(RawEntry {
            name,
            value,
            first,
            last,
        })
    }

    /// A body attribute entry: applied right away and kept as a node.
    pub(crate) fn attribute_entry(&mut self, line: Line) -> Block {
        match self.read_entry(line) {
            Ok(entry) => self.apply_entry(&entry, true),
            Err(line) => self.paragraph(line, false),
        }
    }

    /// Substitutes the value and writes it to the table. With `report` false nothing
    /// is diagnosed; the header uses that for its first, provisional pass.
    pub(crate) fn apply_entry(&mut self, entry: &RawEntry, report: bool) -> Block {
        let location = entry.first.location().to(entry.last.location());
        let Some(value) = &entry.value else {
            let applied = self.state.attributes.apply_entry(&entry.name, None);
            if !applied && report {
                self.report_locked(&entry.name, &entry.first);
            }
            return Block::AttributeReset(AttributeReset {
                name: entry.name.clone(),
                applied,
                location,
            });
        };
        let resolved = if report {
            self.substitute(value, &entry.first)
        } else {
            self.state.attributes.substitute(value).text
        };
        let applied = resolved
            .as_deref()
            .is_some_and(|resolved| self.state.attributes.apply_entry(&entry.name, Some(resolved)));
        if !applied && resolved.is_some() && report {
            self.report_locked(&entry.name, &entry.first);
        }
        tracing::trace!(name = %entry.name, ?resolved, applied, "attribute entry");
        Block::AttributeEntry(AttributeEntry {
            name: entry.name.clone(),
            value: value.clone(),
            resolved: resolved.filter(|resolved| resolved != value),
            applied,
            location,
        })
    }

    fn report_locked(&mut self, name: &str, line: &Line) {
        self.state.diagnostics.info(
            DiagnosticKind::LockedAttribute,
            line,
            format!("attribute {name} is locked by the caller, entry ignored"),
        );
    }

    /// Lines the reader spliced in itself are applied without a node.
    pub(crate) fn apply_synthetic(&mut self, line: &Line) {
        if let Some(entry) = parse_entry(&line.text) {
            let value = entry.value.map(|value| self.state.attributes.substitute(value).text);
            match value {
                Some(Some(value)) => {
                    self.state.attributes.apply_entry(entry.name, Some(&value));
                }
                Some(None) => {}
                None => {
                    self.state.attributes.apply_entry(entry.name, None);
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::super::test_support::{content, parse_body, parse_body_with};
    use crate::{Options, diagnostic::DiagnosticKind, model::Block};

    #[test]
    fn entries_apply_in_order() {
        let (blocks, state) = parse_body(":product: acdc\n:title: {product} guide\n:product!:");
        let blocks = content(&blocks);
        let Some(Block::AttributeEntry(entry)) = blocks.get(1) else {
            panic!("expected an attribute entry, got {blocks:?}");
        };
        assert_eq!(entry.value, "{product} guide");
        assert_eq!(entry.resolved.as_deref(), Some("acdc guide"));
        assert!(matches!(blocks.get(2), Some(Block::AttributeReset(r)) if r.applied));
        assert_eq!(state.attributes.get("title"), Some("acdc guide"));
        assert_eq!(state.attributes.get("product"), None);
    }

    #[test]
    fn wrapped_values_are_joined() {
        let (blocks, state) = parse_body(":description: A long \\\n  description \\\n  of things\n\ntext");
        assert_eq!(state.attributes.get("description"), Some("A long description of things"));
        assert!(matches!(content(&blocks).get(1), Some(Block::Paragraph(_))));
    }

    #[test]
    fn locked_entries_are_kept_but_not_applied() {
        let options = Options::builder().with_attribute("icons", "font").build();
        let (blocks, state) = parse_body_with(":icons: image", &options);
        assert!(matches!(blocks.first(), Some(Block::AttributeEntry(e)) if !e.applied));
        assert_eq!(state.attributes.get("icons"), Some("font"));
        let kinds: Vec<DiagnosticKind> = state.diagnostics.entries().iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::LockedAttribute]);
    }
}
