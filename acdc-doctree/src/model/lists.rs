//! List nodes.
//!
//! A list is a flat, source-ordered run of item nodes. Nesting is not represented by
//! parent/child links: an item with a greater `level` directly following another item
//! is its nested child. Blank line sentinels, interstitial comments and continuation
//! nodes live in the same sequence.
use serde::Serialize;

use super::{Block, inlines::InlineNode, location::Location, metadata::BlockMetadata};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Unordered,
    Ordered,
    Description,
    Callout,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct List {
    pub kind: ListKind,
    #[serde(skip_serializing_if = "BlockMetadata::is_empty")]
    pub metadata: BlockMetadata,
    /// First ordinal of an ordered list when it does not start at one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<u32>,
    pub items: Vec<Block>,
    pub location: Location,
}

impl List {
    /// Item nodes only, skipping sentinels and attached blocks.
    pub fn list_items(&self) -> impl Iterator<Item = &Block> {
        self.items.iter().filter(|block| block.is_list_item())
    }

    #[must_use]
    pub fn is_checklist(&self) -> bool {
        self.items.iter().any(|block| {
            matches!(block, Block::UnorderedListItem(item) if item.checked.is_some())
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Checked,
    Unchecked,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UnorderedListItem {
    pub marker: String,
    pub indent: usize,
    pub level: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked: Option<CheckState>,
    pub principal: Vec<InlineNode>,
    pub location: Location,
}

/// How an ordered marker spells its ordinal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Numbering {
    /// `.`, `..`: implicit, depth given by the run length.
    Implicit,
    Arabic,
    LowerAlpha,
    UpperAlpha,
    LowerRoman,
    UpperRoman,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderedListItem {
    pub marker: String,
    pub indent: usize,
    pub level: usize,
    pub numbering: Numbering,
    /// The explicit ordinal the marker spells, if it spells one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordinal: Option<u32>,
    pub principal: Vec<InlineNode>,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DescriptionListItem {
    pub term: Vec<InlineNode>,
    pub marker: String,
    pub level: usize,
    /// Text given on the term line after the marker.
    pub principal: Vec<InlineNode>,
    /// Blocks absorbed as the description when the term line has no text.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<Block>,
    pub location: Location,
}

/// A line of a listing that a callout list item explains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CalloutTarget {
    /// Index of the verbatim block in document order.
    pub listing: usize,
    /// 1-based line inside the verbatim block.
    pub line: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CalloutListItem {
    pub number: usize,
    pub marker: String,
    pub principal: Vec<InlineNode>,
    pub targets: Vec<CalloutTarget>,
    pub location: Location,
}

/// A block attached to a list item with a `+` line.
///
/// `depth` is the level of the item the block belongs to: the innermost open item,
/// or an ancestor when the `+` was preceded by blank lines or repeated.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ListContinuation {
    pub depth: usize,
    pub block: Box<Block>,
    pub location: Location,
}
