//! The document attribute table.
//!
//! An ordered map from attribute name to value with a per-entry lock flag. Locked
//! entries come from the caller and win over anything the document says; an attribute
//! entry in the document for a locked name is still parsed into a node but leaves the
//! value alone.
use std::str::FromStr;

use rustc_hash::FxHashMap;
use serde::{
    Serialize,
    ser::{SerializeMap, SerializeStruct, Serializer},
};

mod substitute;

pub use substitute::Substituted;
pub(crate) use substitute::{Reference, parse_reference};

/// An `AttributeName` is always stored lowercase.
pub type AttributeName = String;

/// An `AttributeValue` is a string, or a boolean for attributes that are set without a
/// value (`true`) or explicitly unset (`false`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Bool(bool),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// What to do with a `{name}` reference whose attribute is not set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttributeMissing {
    /// Leave the reference in the text as written.
    #[default]
    Skip,
    /// Drop just the reference.
    Drop,
    /// Drop the whole line containing the reference.
    DropLine,
    /// Leave the reference and report a warning.
    Warn,
}

impl FromStr for AttributeMissing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "skip" => Ok(AttributeMissing::Skip),
            "drop" => Ok(AttributeMissing::Drop),
            "drop-line" => Ok(AttributeMissing::DropLine),
            "warn" => Ok(AttributeMissing::Warn),
            other => Err(format!(
                "invalid attribute-missing value: '{other}', expected: skip, drop, drop-line, warn"
            )),
        }
    }
}

impl std::fmt::Display for AttributeMissing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeMissing::Skip => write!(f, "skip"),
            AttributeMissing::Drop => write!(f, "drop"),
            AttributeMissing::DropLine => write!(f, "drop-line"),
            AttributeMissing::Warn => write!(f, "warn"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: AttributeName,
    pub value: AttributeValue,
    pub locked: bool,
}

impl Serialize for Attribute {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Attribute", 2)?;
        state.serialize_field("value", &self.value)?;
        state.serialize_field("locked", &self.locked)?;
        state.end()
    }
}

/// Character reference attributes every document starts with.
const INTRINSICS: &[(&str, &str)] = &[
    ("empty", ""),
    ("sp", " "),
    ("nbsp", "&#160;"),
    ("zwsp", "&#8203;"),
    ("wj", "&#8288;"),
    ("apos", "&#39;"),
    ("quot", "&#34;"),
    ("lsquo", "&#8216;"),
    ("rsquo", "&#8217;"),
    ("ldquo", "&#8220;"),
    ("rdquo", "&#8221;"),
    ("deg", "&#176;"),
    ("plus", "&#43;"),
    ("brvbar", "&#166;"),
    ("vbar", "|"),
    ("amp", "&"),
    ("lt", "<"),
    ("gt", ">"),
    ("startsb", "["),
    ("endsb", "]"),
    ("caret", "^"),
    ("asterisk", "*"),
    ("tilde", "~"),
    ("backslash", "\\"),
    ("backtick", "`"),
    ("two-colons", "::"),
    ("two-semicolons", ";;"),
    ("cpp", "C++"),
    ("pp", "&#43;&#43;"),
    ("doctype", "article"),
    ("idprefix", "_"),
    ("idseparator", "_"),
];

/// An ordered attribute table. Unset entries keep their slot so the snapshot shows
/// what was explicitly turned off.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeTable {
    entries: Vec<Attribute>,
    index: FxHashMap<AttributeName, usize>,
}

impl Serialize for AttributeTable {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_map(Some(self.entries.len()))?;
        for attribute in &self.entries {
            state.serialize_entry(&attribute.name, attribute)?;
        }
        state.end()
    }
}

impl AttributeTable {
    /// A table seeded with the intrinsic attributes every document sees.
    #[must_use]
    pub fn with_intrinsics() -> Self {
        let mut table = Self::default();
        for (name, value) in INTRINSICS {
            table.set(name, *value);
        }
        table.set_value("sectids", AttributeValue::Bool(true));
        table
    }

    fn slot(&mut self, name: &str) -> Option<&mut Attribute> {
        let name = name.to_lowercase();
        let entries = &mut self.entries;
        let position = *self.index.entry(name.clone()).or_insert_with(|| {
            entries.push(Attribute {
                name,
                value: AttributeValue::Bool(false),
                locked: false,
            });
            entries.len() - 1
        });
        self.entries.get_mut(position)
    }

    /// Sets `name` to a string value. Returns `false`, leaving the table untouched,
    /// when the name is locked.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> bool {
        self.set_value(name, AttributeValue::String(value.into()))
    }

    pub fn set_value(&mut self, name: &str, value: AttributeValue) -> bool {
        if self.is_locked(name) {
            return false;
        }
        if let Some(slot) = self.slot(name) {
            slot.value = value;
        }
        true
    }

    /// Unsets `name`. Returns `false` when the name is locked.
    pub fn unset(&mut self, name: &str) -> bool {
        self.set_value(name, AttributeValue::Bool(false))
    }

    /// Sets and locks `name` regardless of any previous lock.
    pub fn set_locked(&mut self, name: &str, value: AttributeValue) {
        if let Some(slot) = self.slot(name) {
            slot.value = value;
            slot.locked = true;
        }
    }

    pub fn lock(&mut self, name: &str) {
        if let Some(slot) = self.slot(name) {
            slot.locked = true;
        }
    }

    #[must_use]
    pub fn is_locked(&self, name: &str) -> bool {
        self.attribute(name).is_some_and(|a| a.locked)
    }

    /// The attribute's text, `Some("")` for attributes set without a value, `None`
    /// when missing or unset.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        match self.value(name)? {
            AttributeValue::String(value) => Some(value.as_str()),
            AttributeValue::Bool(true) => Some(""),
            AttributeValue::Bool(false) => None,
        }
    }

    #[must_use]
    pub fn value(&self, name: &str) -> Option<&AttributeValue> {
        self.attribute(name).map(|a| &a.value)
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        let position = match self.index.get(name) {
            Some(position) => *position,
            None => *self.index.get(&name.to_lowercase())?,
        };
        self.entries.get(position)
    }

    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.entries.iter()
    }

    /// The policy for missing references currently in force.
    #[must_use]
    pub fn attribute_missing(&self) -> AttributeMissing {
        self.get("attribute-missing")
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }

    /// Applies a document attribute entry; `None` unsets. A signed `leveloffset` is
    /// relative to the offset in force. Returns `false` when the name is locked.
    pub(crate) fn apply_entry(&mut self, name: &str, value: Option<&str>) -> bool {
        match value {
            None => self.unset(name),
            Some(value)
                if name.eq_ignore_ascii_case("leveloffset") && value.starts_with(['+', '-']) =>
            {
                let current = self
                    .get("leveloffset")
                    .and_then(|offset| offset.parse::<i32>().ok())
                    .unwrap_or(0);
                let delta = value.parse::<i32>().unwrap_or(0);
                self.set(name, (current + delta).to_string())
            }
            Some(value) => self.set(name, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn locked_entries_ignore_document_changes() {
        let mut table = AttributeTable::default();
        table.set_locked("icons", AttributeValue::String("font".to_string()));
        assert!(!table.set("icons", "image"));
        assert!(!table.unset("icons"));
        assert_eq!(table.get("icons"), Some("font"));
    }

    #[test]
    fn unset_keeps_order_and_hides_value() {
        let mut table = AttributeTable::default();
        table.set("a", "1");
        table.set("b", "2");
        table.unset("a");
        assert_eq!(table.get("a"), None);
        assert!(!table.is_set("a"));
        let names: Vec<_> = table.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn names_are_case_insensitive() {
        let mut table = AttributeTable::default();
        table.set("Product-Name", "acdc");
        assert_eq!(table.get("product-name"), Some("acdc"));
        assert_eq!(table.get("PRODUCT-NAME"), Some("acdc"));
    }

    #[test]
    fn intrinsics_are_seeded() {
        let table = AttributeTable::with_intrinsics();
        assert_eq!(table.get("startsb"), Some("["));
        assert_eq!(table.get("sectids"), Some(""));
        assert_eq!(table.get("doctype"), Some("article"));
        assert_eq!(table.attribute_missing(), AttributeMissing::Skip);
    }

    #[test]
    fn relative_leveloffset_entries() {
        let mut table = AttributeTable::default();
        assert!(table.apply_entry("leveloffset", Some("+1")));
        assert!(table.apply_entry("leveloffset", Some("+1")));
        assert_eq!(table.get("leveloffset"), Some("2"));
        table.apply_entry("leveloffset", Some("-3"));
        assert_eq!(table.get("leveloffset"), Some("-1"));
        table.apply_entry("leveloffset", None);
        assert_eq!(table.get("leveloffset"), None);
    }

    #[test]
    fn snapshot_serializes_in_insertion_order() -> Result<(), serde_json::Error> {
        let mut table = AttributeTable::default();
        table.set("z", "last");
        table.set_locked("a", AttributeValue::Bool(true));
        assert_eq!(
            serde_json::to_string(&table)?,
            r#"{"z":{"value":"last","locked":false},"a":{"value":true,"locked":true}}"#
        );
        Ok(())
    }
}
