use std::path::{Path, PathBuf};

use acdc_core::SafeMode;
use encoding_rs::{Encoding, UTF_8};

use crate::{error::IncludeError, grammar::attributes::parse_attribute_list, model::AttributeList};

/**
An include directive, `include::target[attributes]`.

Supported attributes are `lines=ranges`, `tag=name`, `tags=names`,
`leveloffset=offset`, `encoding=label` and `opts=optional`. Relative targets
resolve against the directory of the including file, or the base directory for
the main input.

A directive escaped with a backslash is passed through as text.
*/
#[derive(Debug)]
pub(crate) struct IncludeDirective {
    pub(crate) target: String,
    /// Text between the brackets, as written.
    pub(crate) raw_attributes: String,
    pub(crate) attributes: AttributeList,
}

peg::parser! {
    grammar include_parser() for str {
        pub(crate) rule include() -> (&'input str, &'input str)
            = "include::" target:$((!['[' | ' ' | '\t'] [_])+) "[" attributes:$([_]*) {?
                attributes.strip_suffix(']').map(|a| (target, a)).ok_or("closing bracket")
            }
    }
}

impl IncludeDirective {
    pub(crate) fn parse(line: &str) -> Option<Self> {
        let (target, raw_attributes) = include_parser::include(line)
            .map_err(|error| tracing::debug!(%error, line, "not an include directive"))
            .ok()?;
        Some(Self {
            target: target.to_string(),
            raw_attributes: raw_attributes.to_string(),
            attributes: parse_attribute_list(raw_attributes),
        })
    }

    pub(crate) fn is_optional(&self) -> bool {
        self.attributes
            .named("opts")
            .is_some_and(|opts| opts.split(',').any(|opt| opt.trim() == "optional"))
    }

    pub(crate) fn line_ranges(&self) -> Option<Vec<LinesRange>> {
        self.attributes.named("lines").map(LinesRange::parse_list)
    }

    pub(crate) fn tags(&self) -> Option<String> {
        self.attributes
            .named("tags")
            .or_else(|| self.attributes.named("tag"))
            .map(ToString::to_string)
    }

    pub(crate) fn level_offset(&self) -> Option<&str> {
        self.attributes.named("leveloffset")
    }

    pub(crate) fn encoding(&self) -> Option<&str> {
        self.attributes.named("encoding")
    }
}

/// A range of 1-based lines from a `lines=` attribute. A missing or negative end
/// reads to the end of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LinesRange {
    Single(usize),
    Range(usize, Option<usize>),
}

impl LinesRange {
    pub(crate) fn parse_list(value: &str) -> Vec<Self> {
        value
            .split([';', ','])
            .filter_map(|part| {
                let range = LinesRange::parse(part.trim());
                if range.is_none() {
                    tracing::warn!(part, "ignoring invalid line range in include directive");
                }
                range
            })
            .collect()
    }

    fn parse(part: &str) -> Option<Self> {
        match part.split_once("..") {
            Some((start, end)) => {
                let start = start.trim().parse::<usize>().ok().filter(|&s| s > 0)?;
                let end = end.trim();
                let end = if end.is_empty() {
                    None
                } else {
                    match end.parse::<isize>().ok()? {
                        e if e < 0 => None,
                        e => Some(usize::try_from(e).ok()?),
                    }
                };
                Some(LinesRange::Range(start, end))
            }
            None => part.parse::<usize>().ok().filter(|&n| n > 0).map(LinesRange::Single),
        }
    }

    pub(crate) fn contains(self, number: usize) -> bool {
        match self {
            LinesRange::Single(line) => line == number,
            LinesRange::Range(start, end) => number >= start && end.is_none_or(|end| number <= end),
        }
    }
}

/// What the reader asks a resolver for.
#[derive(Debug, Clone, Copy)]
pub struct IncludeRequest<'a> {
    /// The target after attribute substitution.
    pub target: &'a str,
    /// The directory relative targets resolve against.
    pub directory: &'a Path,
    /// The `encoding` attribute of the directive, if any.
    pub encoding: Option<&'a str>,
    /// Nesting depth of the directive, 0 for the main input.
    pub depth: usize,
}

/// The content of an included resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInclude {
    /// Where the content came from. Nested includes resolve relative to its parent.
    pub path: PathBuf,
    pub content: String,
}

/// Fetches the content of `include::` targets.
///
/// The parser calls this while reading, so attributes defined before the
/// directive are already applied to `request.target`.
pub trait IncludeResolver {
    /// Returns the raw text of the target.
    ///
    /// # Errors
    ///
    /// Any [`IncludeError`]; the parser reports it as a diagnostic and keeps going.
    fn resolve(&mut self, request: &IncludeRequest<'_>) -> Result<ResolvedInclude, IncludeError>;
}

/// Reads includes from the filesystem.
///
/// In [`SafeMode::Safe`] and stricter, targets must stay inside `base_dir`.
#[derive(Debug, Clone)]
pub struct FileIncludeResolver {
    base_dir: PathBuf,
    safe_mode: SafeMode,
}

impl FileIncludeResolver {
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>, safe_mode: SafeMode) -> Self {
        Self {
            base_dir: base_dir.into(),
            safe_mode,
        }
    }

    fn locate(&self, request: &IncludeRequest<'_>) -> Result<PathBuf, IncludeError> {
        let path = request.directory.join(request.target);
        if !path.exists() {
            return Err(IncludeError::NotFound(path));
        }
        if self.safe_mode.jails_includes() {
            let jail = self.base_dir.canonicalize()?;
            let canonical = path.canonicalize()?;
            if !canonical.starts_with(&jail) {
                return Err(IncludeError::OutsideBaseDir(path));
            }
        }
        Ok(path)
    }
}

impl IncludeResolver for FileIncludeResolver {
    #[tracing::instrument(level = "debug", skip(self))]
    fn resolve(&mut self, request: &IncludeRequest<'_>) -> Result<ResolvedInclude, IncludeError> {
        if !self.safe_mode.allows_includes() {
            return Err(IncludeError::Disabled);
        }
        let path = self.locate(request)?;
        let bytes = std::fs::read(&path)?;
        let encoding = match request.encoding {
            Some(label) => Some(
                encoding_for_label(label).ok_or_else(|| IncludeError::UnknownEncoding(label.to_string()))?,
            ),
            None => None,
        };
        let content = decode(&bytes, encoding).unwrap_or_else(|| {
            tracing::warn!(path = %path.display(), "include content is not valid UTF-8");
            String::from_utf8_lossy(&bytes).into_owned()
        });
        Ok(ResolvedInclude { path, content })
    }
}

/// Looks up an encoding by its WHATWG label (`latin1`, `utf-16le`, ...).
pub(crate) fn encoding_for_label(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}

/// Decodes `bytes` with `encoding`, else by byte order mark, else as UTF-8. `None`
/// when nothing named the encoding and the bytes are not valid UTF-8.
pub(crate) fn decode(bytes: &[u8], encoding: Option<&'static Encoding>) -> Option<String> {
    if let Some(encoding) = encoding {
        let (text, _, had_errors) = encoding.decode(bytes);
        if had_errors {
            tracing::warn!(encoding = encoding.name(), "malformed sequences replaced while decoding");
        }
        return Some(text.into_owned());
    }
    if let Some((encoding, bom_length)) = Encoding::for_bom(bytes) {
        let (text, had_errors) =
            encoding.decode_without_bom_handling(bytes.get(bom_length..).unwrap_or_default());
        if had_errors {
            tracing::warn!(encoding = encoding.name(), "malformed sequences replaced while decoding");
        }
        return Some(text.into_owned());
    }
    UTF_8
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(std::borrow::Cow::into_owned)
}
