//! Inline nodes produced for paragraph text, titles, list item text and cells.
//!
//! Only recognition happens here: every markup construct becomes a node, nothing is
//! escaped or rendered.
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "name", rename_all = "snake_case")]
#[non_exhaustive]
pub enum InlineNode {
    Text(Text),
    /// A soft line boundary between two source lines of the same block.
    Newline,
    /// A hard line break, written as a trailing ` +`.
    LineBreak,
    Bold(Formatted),
    Italic(Formatted),
    Monospace(Formatted),
    Highlight(Formatted),
    Anchor(InlineAnchor),
    BibliographyAnchor(InlineAnchor),
    CrossReference(CrossReference),
    AttributeReference(AttributeReference),
    CharReplacement(CharReplacement),
    Email(Email),
    Link(Link),
}

impl InlineNode {
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        InlineNode::Text(Text {
            content: content.into(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Text {
    pub content: String,
}

/// Whether a formatting pair used the single (constrained) or doubled
/// (unconstrained) delimiter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Form {
    Constrained,
    Unconstrained,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Formatted {
    pub form: Form,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub content: Vec<InlineNode>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InlineAnchor {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reftext: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CrossReference {
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// A `{name}` reference. `value` holds what the reference resolved to at the point it
/// was parsed, `None` when the attribute was missing and the policy kept it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttributeReference {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CharReplacement {
    pub source: String,
    pub kind: Replacement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Replacement {
    Copyright,
    Registered,
    Trademark,
    EmDash,
    Ellipsis,
    RightArrow,
    LeftArrow,
    RightDoubleArrow,
    LeftDoubleArrow,
    /// A named or numeric character entity such as `&amp;` or `&#169;`.
    Entity,
}

impl Replacement {
    /// The character a renderer would emit, `None` for entities which pass through.
    #[must_use]
    pub fn replacement(self) -> Option<&'static str> {
        match self {
            Replacement::Copyright => Some("\u{a9}"),
            Replacement::Registered => Some("\u{ae}"),
            Replacement::Trademark => Some("\u{2122}"),
            Replacement::EmDash => Some("\u{2014}"),
            Replacement::Ellipsis => Some("\u{2026}"),
            Replacement::RightArrow => Some("\u{2192}"),
            Replacement::LeftArrow => Some("\u{2190}"),
            Replacement::RightDoubleArrow => Some("\u{21d2}"),
            Replacement::LeftDoubleArrow => Some("\u{21d0}"),
            Replacement::Entity => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Email {
    pub address: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Link {
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Flattens inline nodes back into plain text, used for ids and reftext.
#[must_use]
pub fn inlines_to_string(nodes: &[InlineNode]) -> String {
    let mut out = String::new();
    push_plain(nodes, &mut out);
    out
}

fn push_plain(nodes: &[InlineNode], out: &mut String) {
    for node in nodes {
        match node {
            InlineNode::Text(text) => out.push_str(&text.content),
            InlineNode::Newline | InlineNode::LineBreak => out.push(' '),
            InlineNode::Bold(inner)
            | InlineNode::Italic(inner)
            | InlineNode::Monospace(inner)
            | InlineNode::Highlight(inner) => push_plain(&inner.content, out),
            InlineNode::Anchor(_) | InlineNode::BibliographyAnchor(_) => {}
            InlineNode::CrossReference(xref) => {
                out.push_str(xref.text.as_deref().unwrap_or(&xref.target));
            }
            InlineNode::AttributeReference(reference) => match &reference.value {
                Some(value) => out.push_str(value),
                None => {
                    out.push('{');
                    out.push_str(&reference.name);
                    out.push('}');
                }
            },
            InlineNode::CharReplacement(replacement) => out.push_str(
                replacement
                    .kind
                    .replacement()
                    .unwrap_or(replacement.source.as_str()),
            ),
            InlineNode::Email(email) => out.push_str(&email.address),
            InlineNode::Link(link) => out.push_str(link.text.as_deref().unwrap_or(&link.target)),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn plain_text_flattens_formatting() {
        let nodes = vec![
            InlineNode::text("a "),
            InlineNode::Bold(Formatted {
                form: Form::Constrained,
                role: None,
                content: vec![InlineNode::text("bold")],
            }),
            InlineNode::Newline,
            InlineNode::CharReplacement(CharReplacement {
                source: "(C)".to_string(),
                kind: Replacement::Copyright,
            }),
        ];
        assert_eq!(inlines_to_string(&nodes), "a bold \u{a9}");
    }
}
