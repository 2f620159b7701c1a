//! Non-fatal problems found while parsing.
//!
//! A diagnostic never stops the parse. Each one is kept in the [`Document`] and also
//! emitted as a `tracing` event at the matching level.
//!
//! [`Document`]: crate::Document
use std::{fmt, path::Path, rc::Rc};

use serde::Serialize;

use crate::normalizer::Line;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum DiagnosticKind {
    UnresolvedAttribute,
    OutOfSequenceListItem,
    OutOfSequenceCallout,
    CalloutWithoutTarget,
    DuplicateAnchor,
    DuplicateBibliographyAnchor,
    UnterminatedDelimitedBlock,
    ManpageNameSection,
    ManpageTitle,
    DanglingBlockMetadata,
    DanglingContinuation,
    SectionLevelSkipped,
    LevelZeroSection,
    UnterminatedConditional,
    MismatchedEndif,
    InvalidConditional,
    IncludeUnresolved,
    IncludeDepthExceeded,
    LockedAttribute,
    RevisionOverridden,
}

/// Where in the input a diagnostic points.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub line: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{file}: line {}", self.line),
            None => write!(f, "line {}", self.line),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Collects diagnostics for one parse.
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub(crate) fn report(
        &mut self,
        severity: Severity,
        kind: DiagnosticKind,
        file: Option<&Rc<Path>>,
        line: usize,
        message: impl Into<String>,
    ) {
        let diagnostic = Diagnostic {
            severity,
            kind,
            message: message.into(),
            location: SourceLocation {
                file: file.map(|path| path.display().to_string()),
                line,
            },
        };
        match severity {
            Severity::Info => tracing::info!(?kind, "{diagnostic}"),
            Severity::Warning => tracing::warn!(?kind, "{diagnostic}"),
            Severity::Error => tracing::error!(?kind, "{diagnostic}"),
        }
        self.entries.push(diagnostic);
    }

    pub(crate) fn warn(&mut self, kind: DiagnosticKind, line: &Line, message: impl Into<String>) {
        self.report(Severity::Warning, kind, line.file.as_ref(), line.number, message);
    }

    pub(crate) fn info(&mut self, kind: DiagnosticKind, line: &Line, message: impl Into<String>) {
        self.report(Severity::Info, kind, line.file.as_ref(), line.number, message);
    }

    pub(crate) fn error(&mut self, kind: DiagnosticKind, line: &Line, message: impl Into<String>) {
        self.report(Severity::Error, kind, line.file.as_ref(), line.number, message);
    }

    pub(crate) fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }

    #[cfg(test)]
    pub(crate) fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    #[tracing_test::traced_test]
    fn reports_are_logged_and_kept() {
        let mut diagnostics = Diagnostics::default();
        diagnostics.report(
            Severity::Warning,
            DiagnosticKind::UnterminatedDelimitedBlock,
            None,
            7,
            "unterminated listing block",
        );
        assert!(logs_contain("line 7: unterminated listing block"));
        assert_eq!(diagnostics.entries().len(), 1);
        assert_eq!(
            diagnostics.into_vec().first().map(ToString::to_string),
            Some("line 7: unterminated listing block".to_string())
        );
    }
}
