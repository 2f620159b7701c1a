use std::path::PathBuf;

/// Fatal errors. Anything that is a problem with the document itself is a
/// [`Diagnostic`](crate::Diagnostic) instead and never aborts a parse.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unknown backend: {0}")]
    UnknownBackend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),

    #[error("Unrecognized encoding in file: {0}")]
    UnrecognizedEncodingInFile(String),
}

/// Failures an [`IncludeResolver`](crate::IncludeResolver) reports. The engine turns
/// them into diagnostics.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum IncludeError {
    #[error("include file not found: {0}")]
    NotFound(PathBuf),

    #[error("include path is outside of the base directory: {0}")]
    OutsideBaseDir(PathBuf),

    #[error("includes are disabled in secure mode")]
    Disabled,

    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),

    #[error("I/O error reading include: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            Error::UnknownBackend("pdf".to_string()).to_string(),
            "unknown backend: pdf"
        );
        assert_eq!(
            IncludeError::NotFound(PathBuf::from("missing.adoc")).to_string(),
            "include file not found: missing.adoc"
        );
    }
}
