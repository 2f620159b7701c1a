use serde::{
    Serialize,
    ser::{SerializeSeq, Serializer},
};

/// A `Location` is the span of source lines a node was built from.
///
/// Lines are 1-based and refer to the file the line came from, which for included
/// content is the included file.
#[derive(Debug, Default, Clone, Copy, Hash, Eq, PartialEq)]
pub struct Location {
    pub start: Position,
    pub end: Position,
}

impl Location {
    #[must_use]
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// A location covering a single whole line.
    #[must_use]
    pub fn line(line: usize, width: usize) -> Self {
        Self {
            start: Position { line, column: 1 },
            end: Position {
                line,
                column: width.max(1),
            },
        }
    }

    /// Extends this location so it ends where `other` ends.
    #[must_use]
    pub fn to(self, other: Location) -> Self {
        Self {
            start: self.start,
            end: other.end,
        }
    }
}

// Serialized as a two element sequence `[start, end]`.
impl Serialize for Location {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_seq(Some(2))?;
        state.serialize_element(&self.start)?;
        state.serialize_element(&self.end)?;
        state.end()
    }
}

/// A `Position` is a line and column pair, both 1-based.
#[derive(Debug, Default, Clone, Copy, Hash, Eq, PartialEq, Serialize)]
pub struct Position {
    pub line: usize,
    #[serde(rename = "col")]
    pub column: usize,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn serializes_as_pair() -> Result<(), serde_json::Error> {
        let location = Location::line(3, 10);
        assert_eq!(
            serde_json::to_string(&location)?,
            r#"[{"line":3,"col":1},{"line":3,"col":10}]"#
        );
        Ok(())
    }

    #[test]
    fn to_keeps_start() {
        let joined = Location::line(1, 4).to(Location::line(5, 2));
        assert_eq!(joined.start, Position { line: 1, column: 1 });
        assert_eq!(joined.end, Position { line: 5, column: 2 });
    }
}
