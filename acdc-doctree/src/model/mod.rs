//! The data model of a parsed `AsciiDoc` document.
use std::{fmt::Display, str::FromStr};

use serde::Serialize;

use crate::{
    anchor::AnchorRegistry, attributes::AttributeTable, callouts::CalloutTable,
    diagnostic::Diagnostic,
};

mod inlines;
mod lists;
mod location;
mod metadata;
mod tables;
mod title;

pub use inlines::*;
pub use lists::*;
pub use location::*;
pub use metadata::*;
pub use tables::*;
pub use title::*;

/// A `Document` is the root of the tree together with everything the parse built on
/// the side: the final attribute table, the anchors, the callout correlations and the
/// diagnostics.
#[derive(Debug, PartialEq, Serialize)]
pub struct Document {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<Header>,
    pub blocks: Vec<Block>,
    pub attributes: AttributeTable,
    pub anchors: AnchorRegistry,
    pub callouts: CalloutTable,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Where the document title came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleSource {
    /// The `title` attribute entry.
    TitleAttribute,
    /// The `doctitle` attribute entry.
    DoctitleAttribute,
    /// A level-0 `= Title` line or an `=` underlined title.
    Implicit,
}

/// The document header: title, authors, revision and header attribute entries.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Header {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<Title>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_source: Option<TitleSource>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Author>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<Revision>,
    /// Attribute entry and comment nodes found in the header, in source order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<Block>,
    pub location: Location,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Author {
    #[serde(rename = "firstname")]
    pub first_name: String,
    #[serde(rename = "middlename", skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(rename = "lastname", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub initials: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Author {
    /// The display name, first middle last joined by spaces.
    #[must_use]
    pub fn full_name(&self) -> String {
        [
            Some(self.first_name.as_str()),
            self.middle_name.as_deref(),
            self.last_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Revision {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

/// Every kind of node that can appear in a block sequence.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "name", rename_all = "snake_case")]
#[non_exhaustive]
pub enum Block {
    Section(Section),
    DiscreteHeading(DiscreteHeading),
    Paragraph(Paragraph),
    Delimited(DelimitedBlock),
    List(List),
    UnorderedListItem(UnorderedListItem),
    OrderedListItem(OrderedListItem),
    DescriptionListItem(DescriptionListItem),
    CalloutListItem(CalloutListItem),
    ListContinuation(ListContinuation),
    Table(Table),
    Image(Image),
    BlockMacro(BlockMacro),
    Comment(Comment),
    ThematicBreak(Break),
    PageBreak(Break),
    AttributeEntry(AttributeEntry),
    AttributeReset(AttributeReset),
    Conditional(Conditional),
    Include(Include),
    /// One blank source line.
    Blank(Blank),
}

impl Block {
    #[must_use]
    pub fn is_blank(&self) -> bool {
        matches!(self, Block::Blank(_))
    }

    #[must_use]
    pub fn is_list_item(&self) -> bool {
        matches!(
            self,
            Block::UnorderedListItem(_)
                | Block::OrderedListItem(_)
                | Block::DescriptionListItem(_)
                | Block::CalloutListItem(_)
        )
    }

    /// The source span of the node, `None` for nodes that are not tied to lines of
    /// their own.
    #[must_use]
    pub fn location(&self) -> Option<Location> {
        match self {
            Block::Section(b) => Some(b.location),
            Block::DiscreteHeading(b) => Some(b.location),
            Block::Paragraph(b) => Some(b.location),
            Block::Delimited(b) => Some(b.location),
            Block::List(b) => Some(b.location),
            Block::UnorderedListItem(b) => Some(b.location),
            Block::OrderedListItem(b) => Some(b.location),
            Block::DescriptionListItem(b) => Some(b.location),
            Block::CalloutListItem(b) => Some(b.location),
            Block::ListContinuation(b) => Some(b.location),
            Block::Table(b) => Some(b.location),
            Block::Image(b) => Some(b.location),
            Block::BlockMacro(b) => Some(b.location),
            Block::Comment(b) => Some(b.location),
            Block::ThematicBreak(b) | Block::PageBreak(b) => Some(b.location),
            Block::AttributeEntry(b) => Some(b.location),
            Block::AttributeReset(b) => Some(b.location),
            Block::Conditional(b) => Some(b.location),
            Block::Include(b) => Some(b.location),
            Block::Blank(b) => Some(Location::line(b.line, 1)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Section {
    pub title: Title,
    pub level: usize,
    pub id: Option<String>,
    #[serde(skip_serializing_if = "BlockMetadata::is_empty")]
    pub metadata: BlockMetadata,
    pub blocks: Vec<Block>,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiscreteHeading {
    pub title: Title,
    pub level: usize,
    pub id: Option<String>,
    #[serde(skip_serializing_if = "BlockMetadata::is_empty")]
    pub metadata: BlockMetadata,
    pub location: Location,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdmonitionVariant {
    Note,
    Tip,
    Important,
    Caution,
    Warning,
}

impl Display for AdmonitionVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdmonitionVariant::Note => write!(f, "NOTE"),
            AdmonitionVariant::Tip => write!(f, "TIP"),
            AdmonitionVariant::Important => write!(f, "IMPORTANT"),
            AdmonitionVariant::Caution => write!(f, "CAUTION"),
            AdmonitionVariant::Warning => write!(f, "WARNING"),
        }
    }
}

impl FromStr for AdmonitionVariant {
    type Err = ();

    fn from_str(variant: &str) -> Result<Self, Self::Err> {
        match variant {
            "NOTE" => Ok(AdmonitionVariant::Note),
            "TIP" => Ok(AdmonitionVariant::Tip),
            "IMPORTANT" => Ok(AdmonitionVariant::Important),
            "CAUTION" => Ok(AdmonitionVariant::Caution),
            "WARNING" => Ok(AdmonitionVariant::Warning),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Paragraph {
    #[serde(skip_serializing_if = "BlockMetadata::is_empty")]
    pub metadata: BlockMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admonition: Option<AdmonitionVariant>,
    pub content: Vec<InlineNode>,
    pub location: Location,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DelimitedKind {
    Listing,
    Literal,
    Example,
    Sidebar,
    Quote,
    Open,
    Pass,
}

impl DelimitedKind {
    /// Verbatim kinds keep their lines and are scanned for callouts.
    #[must_use]
    pub fn is_verbatim(self) -> bool {
        matches!(self, DelimitedKind::Listing | DelimitedKind::Literal)
    }
}

/// The fence that opened a delimited block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Delimiter {
    pub text: String,
    pub length: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum BlockContent {
    Raw(Vec<String>),
    Blocks(Vec<Block>),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DelimitedBlock {
    pub kind: DelimitedKind,
    /// `None` for indented literal paragraphs and styled paragraphs, which have no
    /// fence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<Delimiter>,
    #[serde(skip_serializing_if = "BlockMetadata::is_empty")]
    pub metadata: BlockMetadata,
    pub content: BlockContent,
    /// Index of this block in the callout table when it is verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing: Option<usize>,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Image {
    pub target: String,
    #[serde(skip_serializing_if = "BlockMetadata::is_empty")]
    pub metadata: BlockMetadata,
    pub attributes: AttributeList,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BlockMacro {
    pub name: String,
    pub target: String,
    #[serde(skip_serializing_if = "BlockMetadata::is_empty")]
    pub metadata: BlockMetadata,
    pub attributes: AttributeList,
    pub location: Location,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentKind {
    Line,
    Block,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Comment {
    pub kind: CommentKind,
    pub lines: Vec<String>,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Break {
    pub location: Location,
}

/// `:name: value`. `applied` is false when the entry left the table untouched: the
/// name was locked by the caller, or the value was dropped for a missing reference.
/// `resolved` is only present when substitution changed the value.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttributeEntry {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<String>,
    pub applied: bool,
    pub location: Location,
}

/// `:name!:` or `:!name:`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttributeReset {
    pub name: String,
    pub applied: bool,
    pub location: Location,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionalKind {
    Ifdef,
    Ifndef,
    Ifeval,
    Endif,
}

/// A preprocessor conditional directive as it appeared in the source.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Conditional {
    pub kind: ConditionalKind,
    /// The attribute names (with `,` / `+` operators) or, for `ifeval`, the expression.
    pub target: String,
    /// Whether the guarded lines were kept. Always true for `endif`.
    pub satisfied: bool,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Include {
    pub target: String,
    pub attributes: String,
    pub resolved: bool,
    pub location: Location,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Blank {
    pub line: usize,
}
