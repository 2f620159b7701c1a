//! Anchor syntax: `[[id]]`, `[[id, reftext]]` and the bibliography form `[[[id]]]`.
peg::parser! {
    grammar anchor_parser() for str {
        pub(crate) rule block_anchor() -> (&'input str, Option<&'input str>)
            = "[[" id:id() reftext:reftext()? "]]" ![_] { (id, reftext) }

        /// An inline anchor at the start of the input; returns its byte length.
        pub(crate) rule inline_anchor() -> (&'input str, Option<&'input str>, usize)
            = "[[" id:id() reftext:reftext()? "]]" end:position!() [_]* { (id, reftext, end) }

        pub(crate) rule bibliography_anchor() -> (&'input str, Option<&'input str>, usize)
            = "[[[" id:id() reftext:reftext()? "]]]" end:position!() [_]* { (id, reftext, end) }

        pub(crate) rule id() -> &'input str
            = $([c if c.is_alphabetic() || c == '_' || c == ':'] [c if c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '.')]*)

        rule reftext() -> &'input str
            = "," [' ']* r:$([^']']+) { r.trim() }
    }
}

pub(crate) fn parse_block_anchor(line: &str) -> Option<(&str, Option<&str>)> {
    anchor_parser::block_anchor(line).ok()
}

pub(crate) fn parse_inline_anchor(text: &str) -> Option<(&str, Option<&str>, usize)> {
    anchor_parser::inline_anchor(text).ok()
}

pub(crate) fn parse_bibliography_anchor(text: &str) -> Option<(&str, Option<&str>, usize)> {
    anchor_parser::bibliography_anchor(text).ok()
}

pub(crate) fn is_valid_id(id: &str) -> bool {
    anchor_parser::id(id).is_ok()
}
