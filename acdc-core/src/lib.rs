//! Shared vocabulary for the acdc document tree: how much the processor may touch the
//! host, what kind of document it is looking at, and which output the caller intends
//! to produce.
use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// Returned when a textual name does not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: '{value}', expected one of: {expected}")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Safe mode to use when processing the document. This follows what is described in
/// <https://docs.asciidoctor.org/asciidoctor/latest/safe-modes/>.
///
/// Variants are ordered from least to most restrictive so callers can write
/// `mode >= SafeMode::Safe`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafeMode {
    /// Disables all security measures.
    Unsafe = 0,

    /// Include directives are enabled, but paths must resolve inside the base
    /// directory of the document.
    #[default]
    Safe = 1,

    /// Like `Safe`, and additionally hides host details such as `docdir`.
    Server = 10,

    /// Include directives are disabled and replaced by links to their target.
    Secure = 20,
}

impl SafeMode {
    /// Whether include directives may read from the file system at all.
    #[must_use]
    pub fn allows_includes(self) -> bool {
        self < SafeMode::Secure
    }

    /// Whether included paths must stay inside the base directory.
    #[must_use]
    pub fn jails_includes(self) -> bool {
        self >= SafeMode::Safe
    }
}

impl FromStr for SafeMode {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unsafe" => Ok(Self::Unsafe),
            "safe" => Ok(Self::Safe),
            "server" => Ok(Self::Server),
            "secure" => Ok(Self::Secure),
            _ => Err(UnknownValue {
                kind: "safe mode",
                value: s.to_string(),
                expected: "unsafe, safe, server, secure",
            }),
        }
    }
}

impl Display for SafeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SafeMode::Unsafe => write!(f, "unsafe"),
            SafeMode::Safe => write!(f, "safe"),
            SafeMode::Server => write!(f, "server"),
            SafeMode::Secure => write!(f, "secure"),
        }
    }
}

/// Document type, as set by the `doctype` attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Doctype {
    #[default]
    Article,
    Book,
    Manpage,
    Inline,
}

impl FromStr for Doctype {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "article" => Ok(Self::Article),
            "book" => Ok(Self::Book),
            "manpage" => Ok(Self::Manpage),
            "inline" => Ok(Self::Inline),
            _ => Err(UnknownValue {
                kind: "doctype",
                value: s.to_string(),
                expected: "article, book, manpage, inline",
            }),
        }
    }
}

impl Display for Doctype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Doctype::Article => write!(f, "article"),
            Doctype::Book => write!(f, "book"),
            Doctype::Manpage => write!(f, "manpage"),
            Doctype::Inline => write!(f, "inline"),
        }
    }
}

/// Output backend a renderer intends to produce.
///
/// The structural parser never renders anything itself, but a requested backend
/// must resolve to one of these, and it seeds the `backend`, `basebackend`,
/// `outfilesuffix` and `filetype` attributes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Html5,
    Docbook5,
    Manpage,
}

impl Backend {
    /// The family the backend belongs to (`html`, `docbook`, `manpage`).
    #[must_use]
    pub fn basebackend(self) -> &'static str {
        match self {
            Backend::Html5 => "html",
            Backend::Docbook5 => "docbook",
            Backend::Manpage => "manpage",
        }
    }

    /// Suffix of the file a renderer would write, dot included.
    #[must_use]
    pub fn outfilesuffix(self) -> &'static str {
        match self {
            Backend::Html5 => ".html",
            Backend::Docbook5 => ".xml",
            Backend::Manpage => ".man",
        }
    }
}

impl FromStr for Backend {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "html" | "html5" | "xhtml" | "xhtml5" => Ok(Self::Html5),
            "docbook" | "docbook5" => Ok(Self::Docbook5),
            "manpage" => Ok(Self::Manpage),
            _ => Err(UnknownValue {
                kind: "backend",
                value: s.to_string(),
                expected: "html5, docbook5, manpage",
            }),
        }
    }
}

impl Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Html5 => write!(f, "html5"),
            Backend::Docbook5 => write!(f, "docbook5"),
            Backend::Manpage => write!(f, "manpage"),
        }
    }
}
