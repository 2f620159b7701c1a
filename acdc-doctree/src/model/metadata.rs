//! Block metadata: everything collected from attribute list, anchor and title lines
//! that precede a block.
use serde::Serialize;

use super::title::Title;

/// One bracketed attribute list, e.g. `[source#hello.ruby%linenums,ruby,indent=0]`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AttributeList {
    pub entries: Vec<AttributeListEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeListEntry {
    Positional { value: String },
    Named { name: String, value: String },
    Shorthand(Shorthand),
}

/// The first positional slot when it bundles style, id, roles and options.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Shorthand {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl AttributeList {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The positional value at `index` (0-based), counting a shorthand entry by its
    /// style.
    #[must_use]
    pub fn positional(&self, index: usize) -> Option<&str> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                AttributeListEntry::Positional { value } => Some(Some(value.as_str())),
                AttributeListEntry::Shorthand(shorthand) => Some(shorthand.style.as_deref()),
                AttributeListEntry::Named { .. } => None,
            })
            .nth(index)
            .flatten()
    }

    #[must_use]
    pub fn named(&self, name: &str) -> Option<&str> {
        self.entries.iter().rev().find_map(|entry| match entry {
            AttributeListEntry::Named { name: n, value } if n == name => Some(value.as_str()),
            AttributeListEntry::Named { .. }
            | AttributeListEntry::Positional { .. }
            | AttributeListEntry::Shorthand(_) => None,
        })
    }
}

/// A `BlockMetadata` is the merged view of all metadata lines attached to a block.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BlockMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reftext: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attribute_lists: Vec<AttributeList>,
}

impl BlockMetadata {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.style.is_none()
            && self.id.is_none()
            && self.reftext.is_none()
            && self.roles.is_empty()
            && self.options.is_empty()
            && self.title.is_none()
            && self.attribute_lists.is_empty()
    }

    /// Folds an attribute list into the merged view. Later lists win for style and id,
    /// roles and options accumulate.
    pub fn merge(&mut self, list: AttributeList) {
        let mut positional_index = 0;
        for entry in &list.entries {
            match entry {
                AttributeListEntry::Shorthand(shorthand) => {
                    if positional_index == 0 && shorthand.style.is_some() {
                        self.style.clone_from(&shorthand.style);
                    }
                    if shorthand.id.is_some() {
                        self.id.clone_from(&shorthand.id);
                    }
                    self.roles.extend(shorthand.roles.iter().cloned());
                    self.options.extend(shorthand.options.iter().cloned());
                    positional_index += 1;
                }
                AttributeListEntry::Positional { value } => {
                    if positional_index == 0 && !value.is_empty() {
                        self.style = Some(value.clone());
                    }
                    positional_index += 1;
                }
                AttributeListEntry::Named { name, value } => match name.as_str() {
                    "id" => self.id = Some(value.clone()),
                    "reftext" => self.reftext = Some(value.clone()),
                    "role" => self
                        .roles
                        .extend(value.split_whitespace().map(ToString::to_string)),
                    "opts" | "options" => self.options.extend(
                        value
                            .split(',')
                            .map(str::trim)
                            .filter(|option| !option.is_empty())
                            .map(ToString::to_string),
                    ),
                    _ => {}
                },
            }
        }
        self.attribute_lists.push(list);
    }

    /// The last value given for a named attribute across all attached lists.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attribute_lists
            .iter()
            .rev()
            .find_map(|list| list.named(name))
    }

    /// A positional attribute (0-based, the style being index 0) from the last list
    /// that carries one at that index.
    #[must_use]
    pub fn positional(&self, index: usize) -> Option<&str> {
        self.attribute_lists
            .iter()
            .rev()
            .find_map(|list| list.positional(index))
    }

    #[must_use]
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
            || self.attribute(&format!("{option}-option")).is_some()
    }

    #[must_use]
    pub fn style_is(&self, style: &str) -> bool {
        self.style.as_deref() == Some(style)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn merge_accumulates_roles_and_options() {
        let mut metadata = BlockMetadata::default();
        metadata.merge(AttributeList {
            entries: vec![AttributeListEntry::Shorthand(Shorthand {
                style: Some("source".to_string()),
                id: Some("hello".to_string()),
                roles: vec!["ruby".to_string()],
                options: vec!["linenums".to_string()],
            })],
        });
        metadata.merge(AttributeList {
            entries: vec![
                AttributeListEntry::Positional {
                    value: "listing".to_string(),
                },
                AttributeListEntry::Named {
                    name: "role".to_string(),
                    value: "a b".to_string(),
                },
            ],
        });
        assert_eq!(metadata.style.as_deref(), Some("listing"));
        assert_eq!(metadata.id.as_deref(), Some("hello"));
        assert_eq!(metadata.roles, vec!["ruby", "a", "b"]);
        assert!(metadata.has_option("linenums"));
    }

    #[test]
    fn positional_prefers_latest_list() {
        let mut metadata = BlockMetadata::default();
        metadata.merge(AttributeList {
            entries: vec![
                AttributeListEntry::Positional {
                    value: "source".to_string(),
                },
                AttributeListEntry::Positional {
                    value: "ruby".to_string(),
                },
            ],
        });
        assert_eq!(metadata.positional(1), Some("ruby"));
        assert_eq!(metadata.positional(2), None);
    }
}
