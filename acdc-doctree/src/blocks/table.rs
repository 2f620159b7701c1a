//! Tables: `|===` and `!===` (prefix separated), `,===` (csv) and `:===` (dsv).
use super::{Parser, Scope, classify::Fence};
use crate::{
    inlines,
    model::{
        Block, Cell, CellContent, CellStyle, ColumnSpec, HorizontalAlignment, Row,
        Table, TableFormat, VerticalAlignment,
    },
    normalizer::Line,
    preprocessor::span,
};

/// What a cell spec such as `2.3+^.>s` asks for.
#[derive(Clone, Debug, PartialEq, Eq)]
struct CellSpec {
    duplicate: usize,
    colspan: usize,
    rowspan: usize,
    halign: Option<HorizontalAlignment>,
    valign: Option<VerticalAlignment>,
    style: Option<CellStyle>,
}

impl Default for CellSpec {
    fn default() -> Self {
        Self {
            duplicate: 1,
            colspan: 1,
            rowspan: 1,
            halign: None,
            valign: None,
            style: None,
        }
    }
}

/// A cell as split out of the table text.
#[derive(Clone, Debug, PartialEq, Eq)]
struct RawCell {
    spec: CellSpec,
    text: String,
    /// Offset of the line the cell starts on, from the first content line.
    line: usize,
}

fn halign(c: char) -> Option<HorizontalAlignment> {
    match c {
        '<' => Some(HorizontalAlignment::Left),
        '^' => Some(HorizontalAlignment::Center),
        '>' => Some(HorizontalAlignment::Right),
        _ => None,
    }
}

fn valign(c: char) -> Option<VerticalAlignment> {
    match c {
        '<' => Some(VerticalAlignment::Top),
        '^' => Some(VerticalAlignment::Middle),
        '>' => Some(VerticalAlignment::Bottom),
        _ => None,
    }
}

fn leading_number(text: &str) -> (Option<usize>, &str) {
    let digits = text.chars().take_while(char::is_ascii_digit).count();
    let number = text.get(..digits).and_then(|digits| digits.parse().ok());
    (number, text.get(digits..).unwrap_or_default())
}

/// `halign`, `.valign` and a style letter, in that order, each optional.
fn alignment_and_style(mut rest: &str) -> Option<(Option<HorizontalAlignment>, Option<VerticalAlignment>, Option<CellStyle>, &str)> {
    let mut horizontal = None;
    let mut vertical = None;
    if let Some(found) = rest.chars().next().and_then(halign) {
        horizontal = Some(found);
        rest = rest.get(1..)?;
    }
    if let Some(after) = rest.strip_prefix('.')
        && let Some(found) = after.chars().next().and_then(valign)
    {
        vertical = Some(found);
        rest = after.get(1..)?;
    }
    let mut style = None;
    if let Some(letter) = rest.chars().next().filter(char::is_ascii_lowercase)
        && let Some(found) = CellStyle::from_letter(letter)
    {
        style = Some(found);
        rest = rest.get(1..)?;
    }
    Some((horizontal, vertical, style, rest))
}

/// Parses a cell spec: `3*`, `2+`, `.3+`, `2.3+`, then alignment and style.
fn parse_cell_spec(spec: &str) -> Option<CellSpec> {
    if spec.is_empty() {
        return None;
    }
    let mut parsed = CellSpec::default();
    let (number, mut rest) = leading_number(spec);
    if let Some(after) = rest.strip_prefix('*') {
        parsed.duplicate = number?;
        rest = after;
    } else {
        let (rows, after_rows) = match rest.strip_prefix('.') {
            Some(after) if after.starts_with(|c: char| c.is_ascii_digit()) => leading_number(after),
            Some(_) | None => (None, rest),
        };
        if let Some(after) = after_rows.strip_prefix('+') {
            if number.is_none() && rows.is_none() {
                return None;
            }
            parsed.colspan = number.unwrap_or(1);
            parsed.rowspan = rows.unwrap_or(1);
            rest = after;
        } else if number.is_some() || rows.is_some() {
            return None;
        }
    }
    let (horizontal, vertical, style, rest) = alignment_and_style(rest)?;
    if !rest.is_empty() {
        return None;
    }
    parsed.halign = horizontal;
    parsed.valign = vertical;
    parsed.style = style;
    Some(parsed)
}

/// Parses the `cols` attribute: a column count, or comma separated column specs
/// each of the form `[multiplier*][halign][.valign][width|~][style]`.
fn parse_cols(cols: &str) -> Vec<ColumnSpec> {
    let cols = cols.trim();
    if let Ok(count) = cols.parse::<usize>() {
        return vec![ColumnSpec::default(); count];
    }
    let mut columns = Vec::new();
    for spec in cols.split([',', ';']).map(str::trim) {
        let (number, rest) = leading_number(spec);
        let (repeat, rest) = match rest.strip_prefix('*') {
            Some(after) => (number.unwrap_or(1), after),
            None => (1, spec),
        };
        let mut column = ColumnSpec {
            width: 1,
            ..ColumnSpec::default()
        };
        let mut rest = rest;
        if let Some(found) = rest.chars().next().and_then(halign) {
            column.halign = found;
            rest = rest.get(1..).unwrap_or_default();
        }
        if let Some(after) = rest.strip_prefix('.')
            && let Some(found) = after.chars().next().and_then(valign)
        {
            column.valign = found;
            rest = after.get(1..).unwrap_or_default();
        }
        if let Some(after) = rest.strip_prefix('~') {
            column.width = 0;
            rest = after;
        } else {
            let digits = rest.chars().take_while(char::is_ascii_digit).count();
            if let Some(width) = rest.get(..digits).and_then(|digits| digits.parse().ok()) {
                column.width = width;
            }
            rest = rest.get(digits..).unwrap_or_default();
            rest = rest.strip_prefix('%').unwrap_or(rest);
        }
        if let Some(style) = rest.chars().next().and_then(CellStyle::from_letter) {
            column.style = style;
        }
        columns.extend(std::iter::repeat_n(column, repeat));
    }
    columns
}

/// Splits the cell spec off the end of the text before a separator. The spec is
/// the last word after some whitespace, and only counts when it parses as one.
fn trailing_spec(text: &str) -> (&str, Option<CellSpec>) {
    let Some(start) = text.rfind(char::is_whitespace).map(|index| index + 1) else {
        return (text, None);
    };
    let token = text.get(start..).unwrap_or_default();
    match parse_cell_spec(token) {
        Some(spec) => (text.get(..start).unwrap_or_default(), Some(spec)),
        None => (text, None),
    }
}

/// Splits prefix separated content into cells. An escaped separator is kept as
/// text.
fn split_cells(lines: &[String], separator: char) -> Vec<RawCell> {
    let mut segments: Vec<(String, usize)> = vec![(String::new(), 0)];
    for (index, line) in lines.iter().enumerate() {
        if index > 0
            && let Some((text, _)) = segments.last_mut()
        {
            text.push('\n');
        }
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\\' && chars.peek() == Some(&separator) {
                chars.next();
                if let Some((text, _)) = segments.last_mut() {
                    text.push(separator);
                }
            } else if c == separator {
                segments.push((String::new(), index));
            } else if let Some((text, _)) = segments.last_mut() {
                text.push(c);
            }
        }
    }

    let mut spec = segments
        .first()
        .and_then(|(text, _)| parse_cell_spec(text.trim()))
        .unwrap_or_default();
    let last = segments.len().saturating_sub(1);
    let mut cells = Vec::new();
    for (position, (text, line)) in segments.iter().enumerate().skip(1) {
        let (content, next) = if position == last {
            (text.as_str(), None)
        } else {
            trailing_spec(text)
        };
        cells.push(RawCell {
            spec: std::mem::take(&mut spec),
            text: content.trim().to_string(),
            line: *line,
        });
        spec = next.unwrap_or_default();
    }
    cells
}

/// Splits delimiter separated lines, one row per line.
fn split_dsv(lines: &[String], separator: char) -> Vec<Vec<RawCell>> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            let mut fields = vec![String::new()];
            let mut chars = line.chars().peekable();
            while let Some(c) = chars.next() {
                if c == '\\' && chars.peek() == Some(&separator) {
                    chars.next();
                    if let Some(field) = fields.last_mut() {
                        field.push(separator);
                    }
                } else if c == separator {
                    fields.push(String::new());
                } else if let Some(field) = fields.last_mut() {
                    field.push(c);
                }
            }
            fields
                .into_iter()
                .map(|text| RawCell {
                    spec: CellSpec::default(),
                    text: text.trim().to_string(),
                    line: index,
                })
                .collect()
        })
        .collect()
}

/// Reads comma or tab separated content with the `csv` crate, one row per record.
fn split_csv(lines: &[String], separator: char) -> Vec<Vec<RawCell>> {
    let (offsets, content): (Vec<usize>, Vec<&str>) = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| (index, line.as_str()))
        .unzip();
    let text = content.join("\n");
    let delimiter = u8::try_from(separator).unwrap_or(b',');
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());
    let mut rows = Vec::new();
    for record in reader.records() {
        match record {
            Ok(record) => {
                let line = record
                    .position()
                    .and_then(|position| usize::try_from(position.line()).ok())
                    .and_then(|line| offsets.get(line.saturating_sub(1)).copied())
                    .unwrap_or(0);
                rows.push(
                    record
                        .iter()
                        .map(|field| RawCell {
                            spec: CellSpec::default(),
                            text: field.trim().to_string(),
                            line,
                        })
                        .collect(),
                );
            }
            Err(error) => tracing::debug!(%error, "skipping malformed csv record"),
        }
    }
    rows
}

/// Lays cells out row by row, keeping track of columns still covered by a cell
/// spanning down from a row above.
#[derive(Debug)]
struct Grid {
    columns: usize,
    /// Rows each column is still covered for, in the current row.
    covered: Vec<usize>,
    /// Coverage started by cells of the current row.
    spanning: Vec<usize>,
    cursor: usize,
    cells: Vec<Cell>,
    rows: Vec<Row>,
}

impl Grid {
    fn new(columns: usize) -> Self {
        let columns = columns.max(1);
        Self {
            columns,
            covered: vec![0; columns],
            spanning: vec![0; columns],
            cursor: 0,
            cells: Vec::new(),
            rows: Vec::new(),
        }
    }

    fn skip_covered(&mut self) {
        while self.covered.get(self.cursor).is_some_and(|&rows| rows > 0) {
            self.cursor += 1;
        }
    }

    /// The column the next cell lands in, and the index of its row.
    fn next_slot(&mut self) -> (usize, usize) {
        self.skip_covered();
        if self.cursor >= self.columns {
            self.end_row();
            self.skip_covered();
        }
        (self.cursor, self.rows.len())
    }

    fn push(&mut self, cell: Cell) {
        let below = cell.rowspan.saturating_sub(1);
        for column in self.cursor..self.cursor + cell.colspan {
            if let Some(slot) = self.spanning.get_mut(column) {
                *slot = below;
            }
        }
        self.cursor += cell.colspan;
        self.cells.push(cell);
        self.skip_covered();
        if self.cursor >= self.columns {
            self.end_row();
        }
    }

    fn end_row(&mut self) {
        self.rows.push(Row {
            cells: std::mem::take(&mut self.cells),
        });
        for (covered, spanning) in self.covered.iter_mut().zip(self.spanning.iter_mut()) {
            *covered = if *covered > 0 { *covered - 1 } else { *spanning };
            *spanning = 0;
        }
        self.cursor = 0;
    }

    fn finish(mut self) -> Vec<Row> {
        if !self.cells.is_empty() {
            self.end_row();
        }
        self.rows
    }
}

fn format_named(name: &str) -> Option<TableFormat> {
    match name {
        "psv" => Some(TableFormat::Psv),
        "csv" => Some(TableFormat::Csv),
        "dsv" => Some(TableFormat::Dsv),
        "tsv" => Some(TableFormat::Tsv),
        _ => None,
    }
}

fn default_separator(format: TableFormat) -> char {
    match format {
        TableFormat::Psv => '|',
        TableFormat::Csv => ',',
        TableFormat::Dsv => ':',
        TableFormat::Tsv => '\t',
    }
}

impl Parser<'_> {
    #[tracing::instrument(level = "trace", skip_all, fields(line = open.number))]
    pub(super) fn table(&mut self, open: Line, fence: &Fence, format: TableFormat, separator: char) -> Block {
        let metadata = self.take_metadata();
        let (lines, close) = self.read_fenced(&open, fence, "table");
        let location = span(&open, close.as_ref().or(lines.last()).unwrap_or(&open));
        self.register_block_anchor(&metadata, &open);

        let (format, separator) = match metadata.attribute("format").and_then(format_named) {
            Some(named) if named != format => (named, default_separator(named)),
            Some(_) | None => (format, separator),
        };
        let separator = match metadata.attribute("separator") {
            Some("\\t") => '\t',
            Some(value) => value.chars().next().unwrap_or(separator),
            None => separator,
        };
        let texts: Vec<String> = lines.iter().map(|line| line.text.clone()).collect();
        let implicit_header = texts.first().is_some_and(|line| !line.trim().is_empty())
            && texts.get(1).is_some_and(|line| line.trim().is_empty());
        let has_header = !metadata.has_option("noheader")
            && (metadata.has_option("header") || implicit_header);
        let first_line = open.number + 1;

        let mut columns = metadata.attribute("cols").map(parse_cols).unwrap_or_default();
        let mut rows = match format {
            TableFormat::Psv => {
                if columns.is_empty() {
                    let first = texts
                        .iter()
                        .find(|line| !line.trim().is_empty())
                        .map(|line| split_cells(std::slice::from_ref(line), separator))
                        .unwrap_or_default();
                    let count = first.iter().map(|cell| cell.spec.colspan * cell.spec.duplicate).sum();
                    columns = vec![ColumnSpec::default(); count];
                }
                let mut grid = Grid::new(columns.len());
                for raw in split_cells(&texts, separator) {
                    for _ in 0..raw.spec.duplicate.max(1) {
                        let (column, row) = grid.next_slot();
                        let header = has_header && row == 0;
                        let cell = self.cell(&raw, columns.get(column), header, &open, first_line);
                        grid.push(cell);
                    }
                }
                grid.finish()
            }
            TableFormat::Csv | TableFormat::Tsv | TableFormat::Dsv => {
                let records = if format == TableFormat::Dsv {
                    split_dsv(&texts, separator)
                } else {
                    split_csv(&texts, separator)
                };
                if columns.is_empty() {
                    let count = records.first().map_or(0, Vec::len);
                    columns = vec![ColumnSpec::default(); count];
                }
                records
                    .into_iter()
                    .enumerate()
                    .map(|(row, record)| Row {
                        cells: record
                            .iter()
                            .enumerate()
                            .map(|(column, raw)| {
                                self.cell(raw, columns.get(column), has_header && row == 0, &open, first_line)
                            })
                            .collect(),
                    })
                    .collect()
            }
        };

        let header = (has_header && !rows.is_empty()).then(|| rows.remove(0));
        let footer = if metadata.has_option("footer") { rows.pop() } else { None };
        tracing::trace!(columns = columns.len(), rows = rows.len(), "table closed");
        Block::Table(Table {
            format,
            delimiter: separator,
            metadata,
            columns,
            header,
            rows,
            footer,
            location,
        })
    }

    /// Builds a cell, taking alignment and style from the column unless the cell
    /// spec overrides them. Header cells are always plain inline text.
    fn cell(
        &mut self,
        raw: &RawCell,
        column: Option<&ColumnSpec>,
        header: bool,
        open: &Line,
        first_line: usize,
    ) -> Cell {
        let column = column.cloned().unwrap_or_default();
        let style = raw.spec.style.unwrap_or(column.style);
        let origin = Line::new(raw.text.clone(), first_line + raw.line, open.file.clone());
        let style = if header { CellStyle::Default } else { style };
        let content = match style {
            CellStyle::AsciiDoc => {
                let lines = raw
                    .text
                    .lines()
                    .enumerate()
                    .map(|(offset, text)| Line::new(text, origin.number + offset, open.file.clone()))
                    .collect();
                CellContent::Blocks(self.parse_nested(lines, Scope::Document))
            }
            CellStyle::Literal => CellContent::Literal(raw.text.clone()),
            CellStyle::Default
            | CellStyle::Emphasis
            | CellStyle::Header
            | CellStyle::Monospace
            | CellStyle::Strong => {
                let lines: Vec<&str> = raw.text.lines().collect();
                CellContent::Inline(inlines::parse_lines(&lines, &origin, &mut self.state))
            }
        };
        Cell {
            colspan: raw.spec.colspan.max(1),
            rowspan: raw.spec.rowspan.max(1),
            halign: raw.spec.halign.unwrap_or(column.halign),
            valign: raw.spec.valign.unwrap_or(column.valign),
            style,
            content,
        }
    }
}
