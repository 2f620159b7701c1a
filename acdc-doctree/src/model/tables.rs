use serde::Serialize;

use super::{Block, inlines::InlineNode, location::Location, metadata::BlockMetadata};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    #[default]
    Psv,
    Csv,
    Dsv,
    Tsv,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAlignment {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlignment {
    #[default]
    Top,
    Middle,
    Bottom,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CellStyle {
    AsciiDoc,
    #[default]
    Default,
    Emphasis,
    Header,
    Literal,
    Monospace,
    Strong,
}

impl CellStyle {
    #[must_use]
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'a' => Some(CellStyle::AsciiDoc),
            'd' => Some(CellStyle::Default),
            'e' => Some(CellStyle::Emphasis),
            'h' => Some(CellStyle::Header),
            'l' => Some(CellStyle::Literal),
            'm' => Some(CellStyle::Monospace),
            's' => Some(CellStyle::Strong),
            // verse is rendered like literal text with normal substitutions
            'v' => Some(CellStyle::Literal),
            _ => None,
        }
    }
}

/// A column specification from the `cols` attribute.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ColumnSpec {
    pub width: u32,
    pub halign: HorizontalAlignment,
    pub valign: VerticalAlignment,
    pub style: CellStyle,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellContent {
    Inline(Vec<InlineNode>),
    Literal(String),
    Blocks(Vec<Block>),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Cell {
    pub colspan: usize,
    pub rowspan: usize,
    pub halign: HorizontalAlignment,
    pub valign: VerticalAlignment,
    pub style: CellStyle,
    pub content: CellContent,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row {
    pub cells: Vec<Cell>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Table {
    pub format: TableFormat,
    pub delimiter: char,
    #[serde(skip_serializing_if = "BlockMetadata::is_empty")]
    pub metadata: BlockMetadata,
    pub columns: Vec<ColumnSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<Row>,
    pub rows: Vec<Row>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<Row>,
    pub location: Location,
}
