//! `acdc-doctree` parses `AsciiDoc` source into a typed document tree.
//!
//! The parser is structural: it recognizes the header, sections, blocks, lists,
//! tables and inline markup, and hands back the tree together with the final
//! attribute table, the anchor registry, the callout correlations and any
//! diagnostics. Rendering is left to the consumer.
//!
//! ```
//! use acdc_doctree::{Block, Options, parse};
//!
//! let document = parse("= Title\n\n* one\n* two", &Options::default())?;
//! assert!(document.header.is_some());
//! assert!(matches!(document.blocks.last(), Some(Block::List(_))));
//! # Ok::<(), acdc_doctree::Error>(())
//! ```
use std::{
    path::{Path, PathBuf},
    rc::Rc,
};

use acdc_core::{Backend, SafeMode};

mod anchor;
mod attributes;
mod blocks;
mod callouts;
mod diagnostic;
mod error;
mod grammar;
mod inlines;
mod model;
mod normalizer;
mod options;
mod preprocessor;
#[cfg(test)]
mod proptests;
mod state;

pub use anchor::{Anchor, AnchorKind, AnchorRegistry, XrefSite};
pub use attributes::{
    Attribute, AttributeMissing, AttributeName, AttributeTable, AttributeValue, Substituted,
};
pub use callouts::{CalloutMark, CalloutTable, ListingCallouts};
pub use diagnostic::{Diagnostic, DiagnosticKind, Severity, SourceLocation};
pub use error::{Error, IncludeError};
pub use model::*;
pub use options::{CallerAttribute, Options, OptionsBuilder};
pub use preprocessor::{FileIncludeResolver, IncludeRequest, IncludeResolver, ResolvedInclude};

use blocks::{Parser, Scope};
use normalizer::Line;
use preprocessor::Reader;
use state::ParserState;

/// Parses a document held in memory. Includes resolve from the filesystem relative to
/// the base directory of `options`.
///
/// # Errors
///
/// [`Error::UnknownBackend`] when `options` asks for a backend that does not exist.
/// Problems with the document itself are diagnostics, never errors.
#[tracing::instrument(skip_all)]
pub fn parse(input: &str, options: &Options) -> Result<Document, Error> {
    let mut resolver = default_resolver(options);
    parse_with_resolver(input, options, &mut resolver)
}

/// Parses a document held in memory, fetching includes through `resolver`.
///
/// # Errors
///
/// [`Error::UnknownBackend`] when `options` asks for a backend that does not exist.
#[tracing::instrument(skip_all)]
pub fn parse_with_resolver(
    input: &str,
    options: &Options,
    resolver: &mut dyn IncludeResolver,
) -> Result<Document, Error> {
    let state = ParserState::new(options, resolve_backend(options)?);
    let lines = normalizer::normalize(input, None);
    Ok(parse_document(lines, state, Some(resolver)))
}

/// Parses lines the caller already split. Each line is normalized the same way
/// [`parse`] normalizes its input.
///
/// # Errors
///
/// [`Error::UnknownBackend`] when `options` asks for a backend that does not exist.
#[tracing::instrument(skip_all, fields(lines = lines.len()))]
pub fn parse_lines(lines: &[&str], options: &Options) -> Result<Document, Error> {
    let state = ParserState::new(options, resolve_backend(options)?);
    let lines = lines
        .iter()
        .enumerate()
        .map(|(index, raw)| Line::new(normalizer::normalize_line(raw), index + 1, None))
        .collect();
    let mut resolver = default_resolver(options);
    Ok(parse_document(lines, state, Some(&mut resolver)))
}

/// Reads and parses a file. Includes resolve relative to the file, and the base
/// directory defaults to the directory the file is in.
///
/// # Errors
///
/// - [`Error::Io`] when the file cannot be read.
/// - [`Error::UnknownEncoding`] when the caller's `encoding` attribute names no known
///   encoding.
/// - [`Error::UnrecognizedEncodingInFile`] when the file has no byte order mark and is
///   not valid UTF-8.
/// - [`Error::UnknownBackend`] as for [`parse`].
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn parse_file<P: AsRef<Path>>(path: P, options: &Options) -> Result<Document, Error> {
    let path = path.as_ref();
    let encoding = options
        .attributes
        .iter()
        .find(|attribute| attribute.name == "encoding")
        .and_then(|attribute| attribute.value.as_deref());
    let input = read_document(path, encoding)?;

    let mut options = options.clone();
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    if options.base_dir.is_none() {
        options.base_dir = Some(directory.clone());
    }
    let mut state = ParserState::new(&options, resolve_backend(&options)?);
    set_file_attributes(&mut state, path, &directory);

    let file: Rc<Path> = Rc::from(path);
    let lines = normalizer::normalize(&input, Some(file));
    let mut resolver = default_resolver(&options);
    Ok(parse_document(lines, state, Some(&mut resolver)))
}

fn resolve_backend(options: &Options) -> Result<Backend, Error> {
    match options.backend.as_deref() {
        Some(name) => name.parse().map_err(|_| {
            tracing::error!(backend = name, "unknown backend");
            Error::UnknownBackend(name.to_string())
        }),
        None => Ok(Backend::default()),
    }
}

fn default_resolver(options: &Options) -> FileIncludeResolver {
    let base_dir = options.base_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    FileIncludeResolver::new(base_dir, options.safe_mode)
}

/// Decodes a document: the caller's encoding wins, then a byte order mark, and
/// otherwise the bytes must be UTF-8.
fn read_document(path: &Path, label: Option<&str>) -> Result<String, Error> {
    let bytes = std::fs::read(path)?;
    let encoding = match label {
        Some(label) => Some(
            preprocessor::encoding_for_label(label).ok_or_else(|| Error::UnknownEncoding(label.to_string()))?,
        ),
        None => None,
    };
    preprocessor::decode(&bytes, encoding).ok_or_else(|| {
        tracing::error!(path = %path.display(), "document is not valid UTF-8 and has no byte order mark");
        Error::UnrecognizedEncodingInFile(path.display().to_string())
    })
}

/// `docfile`, `docdir`, `docname` and `docfilesuffix`. From server mode up the
/// directory is hidden and `docfile` is only the file name.
fn set_file_attributes(state: &mut ParserState, path: &Path, directory: &Path) {
    let hidden = state.safe_mode >= SafeMode::Server;
    let attributes = &mut state.attributes;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    if hidden {
        attributes.set("docfile", file_name);
        attributes.set("docdir", "");
    } else {
        attributes.set("docfile", path.display().to_string());
        attributes.set("docdir", directory.display().to_string());
    }
    if let Some(stem) = path.file_stem() {
        attributes.set("docname", stem.to_string_lossy().into_owned());
    }
    if let Some(extension) = path.extension() {
        attributes.set("docfilesuffix", format!(".{}", extension.to_string_lossy()));
    }
}

fn parse_document(
    lines: Vec<Line>,
    state: ParserState,
    resolver: Option<&mut dyn IncludeResolver>,
) -> Document {
    let mut parser = Parser::new(Reader::new(lines, resolver), state);
    let header = parser.parse_header();
    let blocks = parser.parse_body(Scope::Document);
    let state = parser.into_state();
    let diagnostics = state.diagnostics.into_vec();
    tracing::debug!(
        blocks = blocks.len(),
        anchors = state.anchors.len(),
        diagnostics = diagnostics.len(),
        "parsed document"
    );
    Document {
        header,
        blocks,
        attributes: state.attributes,
        anchors: state.anchors,
        callouts: state.callouts,
        diagnostics,
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing, clippy::wildcard_enum_match_arm)]
mod tests {
    use std::io::Write as _;

    use acdc_core::Doctype;
    use pretty_assertions::assert_eq;

    use super::*;

    fn content(blocks: &[Block]) -> Vec<&Block> {
        blocks.iter().filter(|block| !block.is_blank()).collect()
    }

    fn only_list(blocks: &[Block]) -> &List {
        let mut found = blocks.iter().filter(|block| !block.is_blank());
        match (found.next(), found.next()) {
            (Some(Block::List(list)), None) => list,
            other => panic!("expected a single list, got {other:?}"),
        }
    }

    #[test]
    fn unknown_backend_is_fatal() {
        let options = Options::builder().with_backend("pdf").build();
        let result = parse("text", &options);
        assert!(matches!(result, Err(Error::UnknownBackend(name)) if name == "pdf"));
    }

    #[test]
    fn known_backend_sets_attributes() -> Result<(), Error> {
        let options = Options::builder().with_backend("manpage").build();
        let document = parse("text", &options)?;
        assert_eq!(document.attributes.get("backend"), Some("manpage"));
        assert_eq!(document.attributes.get("outfilesuffix"), Some(".man"));
        Ok(())
    }

    #[test]
    fn blank_separated_items_stay_in_one_list() -> Result<(), Error> {
        let document = parse("List\n====\n\n- Foo\n\n- Boo\n\n\n- Blech\n", &Options::default())?;
        let title = document.header.as_ref().and_then(|header| header.title.as_ref());
        assert_eq!(title.map(Title::plain_text).as_deref(), Some("List"));
        let list = only_list(&document.blocks);
        let items: Vec<&Block> = list.items.iter().filter(|block| block.is_list_item()).collect();
        assert_eq!(items.len(), 3);
        let blanks = list.items.iter().filter(|block| block.is_blank()).count();
        assert_eq!(blanks, 3);
        Ok(())
    }

    #[rstest::rstest]
    #[case("* one\n\n// split\n\n* two")]
    #[case("* one\n\n'''\n\n* two")]
    #[case("* one\n\n.Second\n\n* two")]
    #[case("* one\n\n:attr: value\n\n* two")]
    fn sandwiched_lines_split_lists(#[case] input: &str) -> Result<(), Error> {
        let document = parse(input, &Options::default())?;
        let lists = document
            .blocks
            .iter()
            .filter(|block| matches!(block, Block::List(_)))
            .count();
        assert_eq!(lists, 2);
        Ok(())
    }

    #[test]
    fn roman_numerals_out_of_sequence_are_diagnosed() -> Result<(), Error> {
        let document = parse("I) first\nIII) third", &Options::default())?;
        let list = only_list(&document.blocks);
        assert_eq!(list.items.len(), 2);
        assert!(
            document
                .diagnostics
                .iter()
                .any(|diagnostic| diagnostic.kind == DiagnosticKind::OutOfSequenceListItem)
        );
        Ok(())
    }

    #[rstest::rstest]
    #[case("IV) four\nV) five")]
    #[case("ix) nine\nx) ten")]
    fn subtractive_roman_numerals(#[case] input: &str) -> Result<(), Error> {
        let document = parse(input, &Options::default())?;
        let list = only_list(&document.blocks);
        assert_eq!(list.list_items().count(), 2);
        assert!(document.diagnostics.is_empty());
        Ok(())
    }

    #[test]
    fn words_before_a_parenthesis_are_not_markers() -> Result<(), Error> {
        let document = parse("did) it\nmid) point", &Options::default())?;
        assert!(matches!(content(&document.blocks).as_slice(), [Block::Paragraph(_)]));
        Ok(())
    }

    #[test]
    fn conditionals_see_leading_entries() -> Result<(), Error> {
        let input = ":a:\nifdef::a[]\nshown\nendif::[]\nifndef::a[]\nhidden\nendif::[]";
        let document = parse(input, &Options::default())?;
        let paragraphs: Vec<String> = document
            .blocks
            .iter()
            .filter_map(|block| match block {
                Block::Paragraph(paragraph) => Some(inlines_to_string(&paragraph.content)),
                _ => None,
            })
            .collect();
        assert_eq!(paragraphs, vec!["shown".to_string()]);
        assert!(document.header.is_some());
        Ok(())
    }

    #[test]
    fn conditional_title_after_leading_entries() -> Result<(), Error> {
        let input = ":product: Widget\nifdef::product[]\n= {product} Guide\nendif::[]\n\nBody.";
        let document = parse(input, &Options::default())?;
        let title = document.header.as_ref().and_then(|header| header.title.as_ref());
        assert_eq!(title.map(Title::plain_text).as_deref(), Some("Widget Guide"));
        Ok(())
    }

    #[test]
    fn listing_callouts_correlate_with_list() -> Result<(), Error> {
        let input = "[source,ruby]\n----\nrequire 'sinatra' # <1>\nget '/hi' do # <2>\n  \"Hello\" # <3>\nend\n----\n<1> Library import\n<2> URL mapping\n<3> Response";
        let document = parse(input, &Options::default())?;
        let blocks = content(&document.blocks);
        let [Block::Delimited(listing), Block::List(callouts)] = blocks.as_slice() else {
            panic!("expected a listing and a callout list, got {blocks:?}");
        };
        assert_eq!(listing.listing, Some(0));
        assert_eq!(callouts.kind, ListKind::Callout);
        let targets: Vec<Vec<CalloutTarget>> = callouts
            .items
            .iter()
            .filter_map(|block| match block {
                Block::CalloutListItem(item) => Some(item.targets.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(targets.len(), 3);
        for (index, targets) in targets.iter().enumerate() {
            assert_eq!(targets.len(), 1);
            assert_eq!(targets.first().map(|target| target.line), Some(index + 1));
        }
        assert!(document.diagnostics.is_empty());
        Ok(())
    }

    #[test]
    fn caller_attributes_are_locked() -> Result<(), Error> {
        let options = Options::builder()
            .with_attribute("icons", "font")
            .with_attribute("toc", "left@")
            .build();
        let document = parse(":icons: image\n:toc: right\n\n{icons} {toc}", &options)?;
        assert_eq!(document.attributes.get("icons"), Some("font"));
        assert_eq!(document.attributes.get("toc"), Some("right"));
        assert!(
            document
                .diagnostics
                .iter()
                .any(|diagnostic| diagnostic.kind == DiagnosticKind::LockedAttribute)
        );
        Ok(())
    }

    #[test]
    fn parsing_twice_gives_equal_documents() -> Result<(), Error> {
        let input = "= Title\nAuthor Name\n\n== Section\n\n* a\n** b\n\n|===\n|x |y\n|===\n";
        let options = Options::default();
        assert_eq!(parse(input, &options)?, parse(input, &options)?);
        Ok(())
    }

    #[test]
    fn parse_lines_matches_parse() -> Result<(), Error> {
        let options = Options::default();
        let from_lines = parse_lines(&["= Title", "", "Body\t text.  "], &options)?;
        let from_text = parse("= Title\n\nBody\t text.", &options)?;
        assert_eq!(from_lines, from_text);
        Ok(())
    }

    #[test]
    fn parse_file_sets_file_attributes_and_resolves_includes() -> Result<(), Box<dyn std::error::Error>> {
        let directory = std::env::temp_dir().join(format!("acdc-doctree-{}", std::process::id()));
        std::fs::create_dir_all(&directory)?;
        let main = directory.join("guide.adoc");
        std::fs::File::create(&main)?.write_all(b"\xEF\xBB\xBF= Guide\n\ninclude::part.adoc[]\n")?;
        std::fs::write(directory.join("part.adoc"), "Included {docname}.\n")?;
        let document = parse_file(&main, &Options::default())?;
        std::fs::remove_dir_all(&directory)?;

        assert_eq!(document.attributes.get("docname"), Some("guide"));
        assert_eq!(document.attributes.get("docfilesuffix"), Some(".adoc"));
        let title = document.header.as_ref().and_then(|header| header.title.as_ref());
        assert_eq!(title.map(Title::plain_text).as_deref(), Some("Guide"));
        let blocks = content(&document.blocks);
        assert!(matches!(blocks.first(), Some(Block::Include(include)) if include.resolved));
        let Some(Block::Paragraph(paragraph)) = blocks.get(1) else {
            panic!("expected the included paragraph, got {blocks:?}");
        };
        assert_eq!(inlines_to_string(&paragraph.content), "Included guide.");
        Ok(())
    }

    #[test]
    fn parse_file_rejects_invalid_utf8() -> Result<(), Box<dyn std::error::Error>> {
        let path = std::env::temp_dir().join(format!("acdc-doctree-latin1-{}.adoc", std::process::id()));
        std::fs::write(&path, b"caf\xE9\n")?;
        let result = parse_file(&path, &Options::default());
        let with_label = parse_file(&path, &Options::builder().with_attribute("encoding", "latin1").build());
        let unknown = parse_file(&path, &Options::builder().with_attribute("encoding", "klingon").build());
        std::fs::remove_file(&path)?;

        assert!(matches!(result, Err(Error::UnrecognizedEncodingInFile(_))));
        let document = with_label?;
        let Some(Block::Paragraph(paragraph)) = document.blocks.first() else {
            panic!("expected a paragraph");
        };
        assert_eq!(inlines_to_string(&paragraph.content), "café");
        assert!(matches!(unknown, Err(Error::UnknownEncoding(label)) if label == "klingon"));
        Ok(())
    }

    #[test]
    fn manpage_name_section_sets_attributes() -> Result<(), Error> {
        let options = Options::builder().with_doctype(Doctype::Manpage).build();
        let document = parse(
            "= git-commit(1)\n\n== NAME\n\ngit-commit - Record changes to the repository\n",
            &options,
        )?;
        assert_eq!(document.attributes.get("mantitle"), Some("git-commit"));
        assert_eq!(document.attributes.get("manname"), Some("git-commit"));
        assert_eq!(
            document.attributes.get("manpurpose"),
            Some("Record changes to the repository")
        );
        assert!(document.diagnostics.is_empty());
        Ok(())
    }

    #[test]
    fn secure_mode_turns_includes_into_links() -> Result<(), Error> {
        let options = Options::builder().with_safe_mode(SafeMode::Secure).build();
        let document = parse("include::other.adoc[]", &options)?;
        let blocks = content(&document.blocks);
        assert!(matches!(blocks.first(), Some(Block::Include(include)) if !include.resolved));
        let Some(Block::Paragraph(paragraph)) = blocks.get(1) else {
            panic!("expected the link paragraph, got {blocks:?}");
        };
        assert!(matches!(paragraph.content.first(), Some(InlineNode::Link(_))));
        Ok(())
    }

    #[test]
    fn document_serializes_to_json() -> Result<(), Box<dyn std::error::Error>> {
        let document = parse("= Title\n\n[[intro]]\nHello <<intro>>.", &Options::default())?;
        let json = serde_json::to_value(&document)?;
        assert_eq!(json["header"]["title_source"], "implicit");
        assert_eq!(json["blocks"][1]["name"], "paragraph");
        assert!(json["anchors"]["intro"].is_object());
        assert_eq!(document.anchors.unresolved_xrefs().count(), 0);
        Ok(())
    }
}
