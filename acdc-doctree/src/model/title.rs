use std::ops::Deref;

use serde::Serialize;

use super::inlines::{InlineNode, inlines_to_string};

/// A `Title` is the inline content of a section, block or document title.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Title(Vec<InlineNode>);

impl Title {
    #[must_use]
    pub fn new(inlines: Vec<InlineNode>) -> Self {
        Self(inlines)
    }

    /// The title with all markup flattened away.
    #[must_use]
    pub fn plain_text(&self) -> String {
        inlines_to_string(&self.0)
    }
}

impl Deref for Title {
    type Target = [InlineNode];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<InlineNode>> for Title {
    fn from(inlines: Vec<InlineNode>) -> Self {
        Self(inlines)
    }
}
