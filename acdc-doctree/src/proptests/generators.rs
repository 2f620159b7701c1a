//! Input generators for the property tests.
#![allow(clippy::expect_used)]
use proptest::prelude::*;

/// Any string at all, control characters included.
pub fn any_document_string() -> impl Strategy<Value = String> {
    prop::string::string_regex("(?s).*").expect("Failed to create any string strategy")
}

/// Printable ASCII with newlines and tabs.
pub fn ascii_document() -> impl Strategy<Value = String> {
    prop::string::string_regex(r"[\x20-\x7E\n\t]*").expect("Failed to create ASCII string strategy")
}

/// Chunks of `AsciiDoc` structure glued together in random order, so fences go
/// unclosed, lists interleave with comments and continuations dangle.
pub fn structured_document() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("= Title\n".to_string()),
            Just("Author Name <a@example.com>\n".to_string()),
            Just("== Section\n".to_string()),
            Just("=== Subsection\n".to_string()),
            Just("\n".to_string()),
            Just("\n\n".to_string()),
            Just("* item\n".to_string()),
            Just("** nested item\n".to_string()),
            Just(". ordered\n".to_string()),
            Just("I) roman\n".to_string()),
            Just("- dash item\n".to_string()),
            Just("term:: description\n".to_string()),
            Just("term::\n".to_string()),
            Just("<1> callout\n".to_string()),
            Just("+\n".to_string()),
            Just("// comment\n".to_string()),
            Just(".Block title\n".to_string()),
            Just("[source,ruby]\n".to_string()),
            Just(":name: value\n".to_string()),
            Just("----\nputs 1 # <1>\n----\n".to_string()),
            Just("----\n".to_string()),
            Just("====\nExample\n\nmore\n====\n".to_string()),
            Just("|===\n|a |b\n\n|c |d\n|===\n".to_string()),
            Just("  indented literal\n".to_string()),
            Just("'''\n".to_string()),
            Just("NOTE: Admonition\n".to_string()),
            Just("Some *bold* and <<ref,text>> [[ref]].\n".to_string()),
            prop::string::string_regex(r"[a-zA-Z0-9 .,:*_`#\[\]<>+=-]{1,40}\n")
                .expect("Failed to create text chunk"),
        ],
        0..30,
    )
    .prop_map(|chunks| chunks.concat())
}
