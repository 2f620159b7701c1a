//! Registry of every anchor id declared in the document and every cross reference
//! pointing at one.
use rustc_hash::FxHashMap;
use serde::{
    Serialize,
    ser::{SerializeMap, Serializer},
};

use crate::model::Location;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorKind {
    /// `[[id]]` or `[#id]` on a block.
    Block,
    /// `[[id]]` or `anchor:id[]` inside text.
    Inline,
    /// An explicit or generated section id.
    Section,
    /// `[[[id]]]` at the start of a bibliography entry.
    Bibliography,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Anchor {
    pub id: String,
    pub kind: AnchorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reftext: Option<String>,
    pub location: Location,
}

/// Where a cross reference, `<<target,text>>` or `xref:target[text]`, points from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct XrefSite {
    pub target: String,
    pub location: Location,
}

/// The outcome of registering an anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Registration {
    New,
    /// The id was already registered. The first registration is kept.
    Duplicate,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnchorRegistry {
    anchors: Vec<Anchor>,
    index: FxHashMap<String, usize>,
    references: Vec<XrefSite>,
}

impl Serialize for AnchorRegistry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_map(Some(self.anchors.len()))?;
        for anchor in &self.anchors {
            state.serialize_entry(&anchor.id, anchor)?;
        }
        state.end()
    }
}

impl AnchorRegistry {
    pub(crate) fn register(
        &mut self,
        id: &str,
        kind: AnchorKind,
        reftext: Option<String>,
        location: Location,
    ) -> Registration {
        if self.index.contains_key(id) {
            return Registration::Duplicate;
        }
        self.index.insert(id.to_string(), self.anchors.len());
        self.anchors.push(Anchor {
            id: id.to_string(),
            kind,
            reftext,
            location,
        });
        Registration::New
    }

    /// Fills in the reftext of an anchor registered without one.
    pub(crate) fn set_reftext(&mut self, id: &str, reftext: String) {
        if let Some(anchor) = self
            .index
            .get(id)
            .and_then(|&position| self.anchors.get_mut(position))
            .filter(|anchor| anchor.reftext.is_none())
        {
            anchor.reftext = Some(reftext);
        }
    }

    pub(crate) fn reference(&mut self, target: &str, location: Location) {
        self.references.push(XrefSite {
            target: target.to_string(),
            location,
        });
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Anchor> {
        self.index
            .get(id)
            .and_then(|&position| self.anchors.get(position))
    }

    /// Anchors in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Anchor> {
        self.anchors.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Every cross reference, in source order.
    #[must_use]
    pub fn references(&self) -> &[XrefSite] {
        &self.references
    }

    /// Cross references whose target is not a registered id. A target naming
    /// another document (`other.adoc#id`) is not checked.
    pub fn unresolved_xrefs(&self) -> impl Iterator<Item = &XrefSite> {
        self.references.iter().filter(|reference| {
            let target = reference.target.as_str();
            !target.contains(".adoc") && !target.contains('#') && !self.contains(target)
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn first_registration_wins() {
        let mut registry = AnchorRegistry::default();
        let location = Location::line(1, 5);
        assert_eq!(
            registry.register("intro", AnchorKind::Section, None, location),
            Registration::New
        );
        assert_eq!(
            registry.register("intro", AnchorKind::Block, Some("Other".to_string()), location),
            Registration::Duplicate
        );
        registry.set_reftext("intro", "Introduction".to_string());
        let anchor = registry.get("intro");
        assert_eq!(anchor.map(|a| a.kind), Some(AnchorKind::Section));
        assert_eq!(anchor.and_then(|a| a.reftext.as_deref()), Some("Introduction"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unresolved_cross_references() {
        let mut registry = AnchorRegistry::default();
        let location = Location::line(3, 10);
        registry.register("known", AnchorKind::Inline, None, location);
        registry.reference("known", location);
        registry.reference("unknown", location);
        registry.reference("other.adoc#part", location);
        let unresolved: Vec<&str> = registry
            .unresolved_xrefs()
            .map(|reference| reference.target.as_str())
            .collect();
        assert_eq!(unresolved, vec!["unknown"]);
    }
}
